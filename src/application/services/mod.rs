//! Application Services
//!
//! Stateful services that coordinate the domain.
//!
//! ## Available Services
//!
//! - **CommandRegistry**: Commands, categories, middlewares and afterwares
//! - **RateLimiter**: Per-user cooldowns partitioned by scope
//! - **GatePipeline**: Ordered restraint checks and middleware chain
//! - **Dispatcher**: Event intake, resolution and invocation
//! - **PrefixManager**: Per-server prefixes
//! - **Blacklist**: Ignored users

pub mod blacklist;
pub mod command_registry;
pub mod dispatcher;
pub mod gate_pipeline;
pub mod prefix_manager;
pub mod rate_limiter;

pub use blacklist::{Blacklist, BlacklistLoader};
pub use command_registry::CommandRegistry;
pub use dispatcher::{DispatchOutcome, Dispatcher, IgnoreReason};
pub use gate_pipeline::{Denial, DenialStage, GatePipeline, Verdict};
pub use prefix_manager::{PrefixLoader, PrefixManager, DEFAULT_PREFIX};
pub use rate_limiter::{
    Acquisition, CooldownRecord, Interceptor, InterceptorPosition, RateLimitEntity, RateLimitSnapshot,
    RateLimiter,
};
