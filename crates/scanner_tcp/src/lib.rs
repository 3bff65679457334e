//! TCP connect probing
//!
//! One bounded-duration connect attempt per target, classified as open,
//! closed (refused), timeout or error.

mod scanner;

pub use scanner::TcpProber;
