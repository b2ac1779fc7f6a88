//! HTTP front end for the federation tournament service.
//!
//! The binary in `main.rs` wires these modules together; they are exposed as a
//! library so integration tests can build the router directly.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
