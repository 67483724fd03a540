//! Presentation Layer
//!
//! Platform bindings that feed events into the framework and deliver its
//! responses.

pub mod console;
