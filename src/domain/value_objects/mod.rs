//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **Permissions**: 64-bit permission bitfield with superset checks and labels

mod permissions;

pub use permissions::*;
