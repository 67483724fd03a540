//! Application Layer
//!
//! Services that hold the framework's shared state and drive each
//! invocation from intake to handler.

pub mod services;

pub use services::*;
