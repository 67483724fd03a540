//! Framework Startup
//!
//! Assembles the registry, rate limiter, dispatcher and worker pool into a
//! running [`Framework`].

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::application::services::{
    Blacklist, BlacklistLoader, CommandRegistry, DispatchOutcome, Dispatcher, PrefixLoader,
    PrefixManager, RateLimiter, DEFAULT_PREFIX,
};
use crate::config::Settings;
use crate::domain::entities::{
    Afterware, Category, CommandBuilder, CommandDefinition, DenialMessages, InboundEvent, Middleware,
    Platform, DEFAULT_COOLDOWN,
};
use crate::infrastructure::clock::{Clock, SystemClock};
use crate::infrastructure::worker_pool::WorkerPool;
use crate::shared::error::{FrameworkError, FrameworkResult};

const DEFAULT_MAX_CONCURRENCY: usize = 64;

/// Framework configuration collected before assembly.
pub struct FrameworkBuilder {
    default_prefix: String,
    allow_mention_prefix: bool,
    bot_user_id: Option<i64>,
    default_cooldown: Duration,
    max_concurrency: usize,
    messages: DenialMessages,
    prefix_loader: Option<PrefixLoader>,
    blacklist_loader: Option<BlacklistLoader>,
    clock: Arc<dyn Clock>,
    runtime: Option<Handle>,
}

impl FrameworkBuilder {
    pub fn new() -> Self {
        Self {
            default_prefix: DEFAULT_PREFIX.to_string(),
            allow_mention_prefix: true,
            bot_user_id: None,
            default_cooldown: DEFAULT_COOLDOWN,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            messages: DenialMessages::default(),
            prefix_loader: None,
            blacklist_loader: None,
            clock: Arc::new(SystemClock),
            runtime: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .default_prefix(settings.framework.default_prefix.clone())
            .mention_prefix(settings.framework.allow_mention_prefix)
            .bot_user_id(settings.framework.bot_user_id)
            .default_cooldown(settings.rate_limit.default_cooldown())
            .max_concurrency(settings.worker_pool.max_concurrency)
    }

    pub fn default_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.default_prefix = prefix.into();
        self
    }

    pub fn mention_prefix(mut self, enabled: bool) -> Self {
        self.allow_mention_prefix = enabled;
        self
    }

    pub fn bot_user_id(mut self, bot_user_id: Option<i64>) -> Self {
        self.bot_user_id = bot_user_id;
        self
    }

    /// Cooldown for commands that do not set their own.
    pub fn default_cooldown(mut self, cooldown: Duration) -> Self {
        self.default_cooldown = cooldown;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn messages(mut self, messages: DenialMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn prefix_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(i64) -> Option<String> + Send + Sync + 'static,
    {
        self.prefix_loader = Some(Arc::new(loader));
        self
    }

    pub fn blacklist_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(i64) -> bool + Send + Sync + 'static,
    {
        self.blacklist_loader = Some(Arc::new(loader));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runtime the worker pool spawns on. Defaults to the caller's runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self, platform: Arc<dyn Platform>) -> FrameworkResult<Framework> {
        if self.default_prefix.trim().is_empty() {
            return Err(FrameworkError::Configuration("default prefix must not be empty".into()));
        }
        if self.allow_mention_prefix && self.bot_user_id.is_none() {
            tracing::warn!("Mention prefix enabled without a bot user id, mentions will not be recognized");
        }

        let pool = match self.runtime {
            Some(handle) => WorkerPool::new(handle, self.max_concurrency),
            None => WorkerPool::from_current(self.max_concurrency)?,
        };

        let rate_limiter = Arc::new(RateLimiter::with_default_cooldown(
            pool.clone(),
            self.clock,
            self.default_cooldown,
        ));
        let registry = Arc::new(CommandRegistry::new());

        let mut prefixes = PrefixManager::new(self.default_prefix);
        if let Some(loader) = self.prefix_loader {
            prefixes = prefixes.with_loader(move |server_id| loader(server_id));
        }
        let mut blacklist = Blacklist::new();
        if let Some(loader) = self.blacklist_loader {
            blacklist = blacklist.with_loader(move |user_id| loader(user_id));
        }

        let dispatcher = Dispatcher::new(registry.clone(), rate_limiter.clone(), platform, pool.clone())
            .with_prefixes(Arc::new(prefixes))
            .with_blacklist(Arc::new(blacklist))
            .with_messages(self.messages)
            .with_mention_prefix(self.allow_mention_prefix, self.bot_user_id);

        tracing::info!(
            default_prefix = %dispatcher.prefixes().default_prefix(),
            default_cooldown_ms = self.default_cooldown.as_millis() as u64,
            max_concurrency = pool.max_concurrency(),
            "Command framework assembled"
        );

        Ok(Framework {
            registry,
            rate_limiter,
            dispatcher: Arc::new(dispatcher),
            pool,
        })
    }
}

impl Default for FrameworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running command framework.
#[derive(Debug, Clone)]
pub struct Framework {
    registry: Arc<CommandRegistry>,
    rate_limiter: Arc<RateLimiter>,
    dispatcher: Arc<Dispatcher>,
    pool: WorkerPool,
}

impl Framework {
    pub fn builder() -> FrameworkBuilder {
        FrameworkBuilder::new()
    }

    /// Start a command that falls back to the framework's default cooldown.
    pub fn command(&self, name: impl Into<String>) -> CommandBuilder {
        CommandDefinition::builder(name).default_cooldown(self.rate_limiter.default_cooldown())
    }

    pub fn register(&self, builder: CommandBuilder) -> FrameworkResult<Arc<CommandDefinition>> {
        self.registry
            .register(builder.default_cooldown(self.rate_limiter.default_cooldown()))
    }

    pub fn add_middleware<M: Middleware + 'static>(&self, name: &str, middleware: M) {
        self.registry.add_middleware(name, middleware);
    }

    pub fn add_afterware<A: Afterware + 'static>(&self, name: &str, afterware: A) {
        self.registry.add_afterware(name, afterware);
    }

    pub fn add_category(&self, category: Category) -> FrameworkResult<Arc<Category>> {
        self.registry.add_category(category)
    }

    /// Queue an event on the worker pool.
    pub fn submit(&self, event: InboundEvent) -> FrameworkResult<JoinHandle<()>> {
        self.dispatcher.submit(event).ok_or(FrameworkError::PoolShutdown)
    }

    /// Dispatch an event on the current task and wait for its outcome.
    pub async fn process(&self, event: InboundEvent) -> FrameworkResult<DispatchOutcome> {
        if self.pool.is_shut_down() {
            return Err(FrameworkError::PoolShutdown);
        }
        self.dispatcher.process(event).await
    }

    /// Stop intake and wait for in-flight dispatches.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn prefixes(&self) -> &Arc<PrefixManager> {
        self.dispatcher.prefixes()
    }

    pub fn blacklist(&self) -> &Arc<Blacklist> {
        self.dispatcher.blacklist()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}
