//! Frameforge Common Utilities
//!
//! Shared infrastructure for all Frameforge crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Configuration loading, including the fixed output encoding options

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
