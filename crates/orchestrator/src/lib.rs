//! Orchestrator - request validation and bounded probe scheduling

mod orchestrator;
mod progress;
mod scheduler;

pub use orchestrator::ScanOrchestrator;
pub use progress::ProgressTracker;
pub use scheduler::{map_concurrent, BoundedScheduler};
