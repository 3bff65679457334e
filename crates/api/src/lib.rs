//! Portgate API - HTTP-shaped request handling
//!
//! Framework agnostic: a router or CLI builds an [`ApiRequest`] and renders
//! the returned [`ApiResponse`] (status code + JSON body). The API key gate
//! and the global rate limiter run before any handler.
//!
//! This crate does not bind a listener. Serving HTTP is left to whatever
//! transport embeds [`PortgateApi`]; in this workspace the `portgate` CLI is
//! the only caller.

mod gate;
mod handlers;
mod request;

pub use gate::{ApiKeyGate, RateGate};
pub use handlers::{PortgateApi, CHECK_PATH, SCAN_RANGE_PATH};
pub use request::{ApiRequest, ApiResponse, Method, API_KEY_HEADER};
