//! objsync application library
//!
//! Configuration loading and report rendering for the `objsync` binary,
//! exposed for testing.

pub mod config;
pub mod error;
pub mod output;

pub use config::{AppConfig, ResolverKind};
pub use error::{AppError, Result};
