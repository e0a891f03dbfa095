//! Configuration and logging glue for the witness binaries.
//!
//! The streaming core never reads ambient process state; everything it
//! needs is resolved here, once, at startup.

/// Environment-driven run configuration.
pub mod config;
/// Tracing subscriber setup.
pub mod logger;
