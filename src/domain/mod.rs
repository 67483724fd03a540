//! # Domain Layer
//!
//! Command definitions, events and the routing format language. Nothing in
//! here touches a runtime or holds shared mutable state.
//!
//! ## Structure
//!
//! - **entities**: commands, categories, events, responses, handler contracts
//! - **value_objects**: immutable value types (Permissions)
//! - **services**: routing format parsing and matching

pub mod entities;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
