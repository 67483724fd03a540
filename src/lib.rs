//! # Chat Commands Library
//!
//! A command dispatch framework for chat bots:
//! - Prefix, shortcut and mention based command resolution
//! - Routing formats with typed placeholders for text arguments
//! - Ordered restraints (scope, users, conditions, roles, permissions)
//! - Per-user cooldowns partitioned by server
//! - Named middlewares and afterwares, grouped by category
//!
//! ## Architecture
//!
//! - **Domain Layer**: Command definitions, events, responses, routing formats
//! - **Application Layer**: Registry, rate limiter, gate pipeline, dispatcher
//! - **Infrastructure Layer**: Worker pool, clock, metrics
//! - **Presentation Layer**: Platform bindings (console)
//!
//! ## Module Structure
//!
//! ```text
//! chat_commands/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, routing formats
//! +-- application/    Registry, rate limiter, gates, dispatcher
//! +-- infrastructure/ Worker pool, clock, metrics
//! +-- presentation/   Platform bindings
//! +-- shared/         Common utilities (errors, tokenizer, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core types
pub mod domain;

// Application layer - Stateful services
pub mod application;

// Infrastructure layer - Runtime resources
pub mod infrastructure;

// Presentation layer - Platform bindings
pub mod presentation;

// Shared utilities
pub mod shared;

// Framework assembly
pub mod startup;

// Telemetry and observability
pub mod telemetry;

pub use startup::{Framework, FrameworkBuilder};
