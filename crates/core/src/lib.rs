//! Colloquy Core Library
//!
//! This crate provides the foundational utilities shared by every Colloquy crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Deadlines for gateway calls
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod deadline;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use deadline::within;
pub use error::{AppError, AppResult};
