//! Shared Utilities
//!
//! Common utilities used across all layers.

pub mod error;
pub mod tokenizer;
pub mod validation;

pub use error::{FrameworkError, FrameworkResult, PlatformError};
