//! Framework settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use validator::Validate;

use crate::shared::validation::field_errors;

/// Root configuration structure containing all framework settings.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    /// Prefix and mention handling
    #[validate(nested)]
    pub framework: FrameworkSettings,

    /// Cooldown defaults
    #[validate(nested)]
    pub rate_limit: RateLimitSettings,

    /// Dispatch concurrency
    #[validate(nested)]
    pub worker_pool: WorkerPoolSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Command intake configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FrameworkSettings {
    /// Prefix used where no server-specific prefix is set (e.g., "v.")
    #[validate(length(min = 1, max = 16, message = "prefix must be 1 to 16 characters"))]
    pub default_prefix: String,

    /// Accept a mention of the bot in place of the prefix
    pub allow_mention_prefix: bool,

    /// The bot's own user id, needed to recognize mentions
    #[serde(default)]
    pub bot_user_id: Option<i64>,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RateLimitSettings {
    /// Cooldown for commands that do not set one, in milliseconds
    pub default_cooldown_ms: u64,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WorkerPoolSettings {
    /// Dispatches allowed to run at once
    #[validate(range(min = 1, max = 4096))]
    pub max_concurrency: usize,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let config = Self::defaults(&environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__FRAMEWORK__DEFAULT_PREFIX=! -> framework.default_prefix = "!"
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("framework.default_prefix", std::env::var("COMMAND_PREFIX").ok())?
            .set_override_option("framework.bot_user_id", std::env::var("BOT_USER_ID").ok())?
            .build()?;

        Self::from_config(config)
    }

    /// Builder preloaded with every default.
    pub fn defaults(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("framework.default_prefix", "v.")?
            .set_default("framework.allow_mention_prefix", true)?
            .set_default("rate_limit.default_cooldown_ms", 5000_i64)?
            .set_default("worker_pool.max_concurrency", 64_i64)
    }

    /// Deserialize and validate an assembled configuration.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Self = config.try_deserialize()?;

        settings.validate().map_err(|errors| {
            let details = field_errors(&errors)
                .into_iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            ConfigError::Message(format!("Invalid settings: {}", details))
        })?;

        Ok(settings)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl RateLimitSettings {
    pub fn default_cooldown(&self) -> Duration {
        Duration::from_millis(self.default_cooldown_ms)
    }
}
