//! # Configuration Module
//!
//! Framework configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_commands::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Commands answer to {}", settings.framework.default_prefix);
//! ```

mod settings;

pub use settings::*;
