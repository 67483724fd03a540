//! Dispatcher
//!
//! Turns one inbound event into at most one handler invocation:
//!
//! `receive -> resolve -> restraints -> rate limit -> middlewares -> invoke -> afterwares`
//!
//! Every step past resolution reports through [`DispatchOutcome`]. Denials are
//! data, not errors; the only error a dispatch returns is a platform event
//! that lacks the state every invocation needs.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::application::services::command_registry::CommandRegistry;
use crate::application::services::gate_pipeline::{Denial, DenialStage, GatePipeline, Verdict};
use crate::application::services::prefix_manager::PrefixManager;
use crate::application::services::blacklist::Blacklist;
use crate::application::services::rate_limiter::RateLimiter;
use crate::domain::entities::{
    format_roles, Arguments, CommandDefinition, CommandEvent, ConditionNotice, Delivery,
    DenialMessages, EventOrigin, InboundEvent, NoPermissionNotice, NoRoleNotice, Platform,
    RateLimitedNotice, Responder, Response,
};
use crate::domain::services::format_router::route;
use crate::infrastructure::metrics;
use crate::infrastructure::worker_pool::WorkerPool;
use crate::shared::error::FrameworkResult;
use crate::shared::tokenizer::{parse_named_arguments, split_content};

/// Why an event never reached a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BotAuthor,
    Blacklisted,
    /// The message does not start with the prefix or a bot mention.
    NoPrefix,
    UnknownCommand,
    /// The command has no handler for this origin.
    UnsupportedOrigin,
}

/// Terminal state of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    Denied {
        command: String,
        stage: DenialStage,
        /// Whether a notice reached the invoker.
        notified: bool,
    },
    Invoked {
        command: String,
    },
    /// The handler returned an error.
    Failed {
        command: String,
        error: String,
    },
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Ignored(_) => "ignored",
            DispatchOutcome::Denied { .. } => "denied",
            DispatchOutcome::Invoked { .. } => "invoked",
            DispatchOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_invoked(&self) -> bool {
        matches!(self, DispatchOutcome::Invoked { .. })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Keeps the in-flight gauge balanced while a handler runs.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        metrics::adjust_in_flight(1);
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        metrics::adjust_in_flight(-1);
    }
}

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    pipeline: GatePipeline,
    prefixes: Arc<PrefixManager>,
    blacklist: Arc<Blacklist>,
    messages: DenialMessages,
    platform: Arc<dyn Platform>,
    pool: WorkerPool,
    allow_mention_prefix: bool,
    bot_user_id: Option<i64>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        rate_limiter: Arc<RateLimiter>,
        platform: Arc<dyn Platform>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            registry,
            pipeline: GatePipeline::new(rate_limiter),
            prefixes: Arc::new(PrefixManager::default()),
            blacklist: Arc::new(Blacklist::new()),
            messages: DenialMessages::default(),
            platform,
            pool,
            allow_mention_prefix: true,
            bot_user_id: None,
        }
    }

    pub fn with_prefixes(mut self, prefixes: Arc<PrefixManager>) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn with_blacklist(mut self, blacklist: Arc<Blacklist>) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn with_messages(mut self, messages: DenialMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Accept `<@bot>` in place of the prefix. Needs the bot's own user id.
    pub fn with_mention_prefix(mut self, enabled: bool, bot_user_id: Option<i64>) -> Self {
        self.allow_mention_prefix = enabled;
        self.bot_user_id = bot_user_id;
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn pipeline(&self) -> &GatePipeline {
        &self.pipeline
    }

    pub fn prefixes(&self) -> &Arc<PrefixManager> {
        &self.prefixes
    }

    pub fn blacklist(&self) -> &Arc<Blacklist> {
        &self.blacklist
    }

    /// Hand an event to the worker pool. Returns `None` after shutdown.
    pub fn submit(self: &Arc<Self>, event: InboundEvent) -> Option<JoinHandle<()>> {
        let dispatcher = Arc::clone(self);
        self.pool.spawn(async move {
            let user_id = event.user_id;
            match dispatcher.process(event).await {
                Ok(outcome) => tracing::trace!(user_id, outcome = outcome.as_str(), "Dispatch finished"),
                Err(e) => tracing::error!(user_id, error = %e, "Dispatch aborted"),
            }
        })
    }

    /// Run one event to completion on the current task.
    pub async fn process(&self, event: InboundEvent) -> FrameworkResult<DispatchOutcome> {
        if event.author_is_bot {
            return Ok(DispatchOutcome::Ignored(IgnoreReason::BotAuthor));
        }
        if self.blacklist.is_blacklisted(event.user_id) {
            tracing::trace!(user_id = event.user_id, "Ignoring blacklisted user");
            return Ok(DispatchOutcome::Ignored(IgnoreReason::Blacklisted));
        }

        let (command, arguments) = match self.resolve(&event) {
            Ok(resolved) => resolved,
            Err(reason) => return Ok(DispatchOutcome::Ignored(reason)),
        };

        let Some(handler) = command.handlers().for_event(&event).cloned() else {
            return Ok(DispatchOutcome::Ignored(IgnoreReason::UnsupportedOrigin));
        };

        tracing::debug!(
            command = %command.name(),
            user_id = event.user_id,
            scope_id = event.scope_id(),
            "Intercepted trigger for command"
        );

        let responder = Responder::new(self.platform.clone(), Delivery::for_event(&event)?);
        let event = Arc::new(event);

        if let Verdict::Denied(denial) = self.pipeline.evaluate(&command, &event) {
            return Ok(self.deny(&command, &event, &responder, denial).await);
        }

        let command_event = CommandEvent {
            event,
            command: command.clone(),
            arguments: Arc::new(arguments),
            responder,
        };

        if let Err(denial) = self.pipeline.run_middlewares(&self.registry, &command_event).await {
            return Ok(self
                .deny(&command, &command_event.event, &command_event.responder, denial)
                .await);
        }

        let started = Instant::now();
        let result = {
            let _in_flight = InFlight::enter();
            AssertUnwindSafe(handler.handle(command_event.clone()))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(anyhow::anyhow!("handler panicked: {}", panic_message(&*panic))))
        };
        metrics::record_handler_duration(command.name(), started.elapsed().as_secs_f64());

        let outcome = match result {
            Ok(()) => {
                self.spawn_afterwares(&command_event);
                DispatchOutcome::Invoked {
                    command: command.name().to_string(),
                }
            }
            Err(e) => {
                tracing::error!(
                    command = %command.name(),
                    user_id = command_event.user_id(),
                    error = ?e,
                    "Command handler failed"
                );
                DispatchOutcome::Failed {
                    command: command.name().to_string(),
                    error: format!("{:#}", e),
                }
            }
        };

        metrics::record_dispatch(command.name(), outcome.as_str());
        Ok(outcome)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    fn resolve(&self, event: &InboundEvent) -> Result<(Arc<CommandDefinition>, Arguments), IgnoreReason> {
        match &event.origin {
            EventOrigin::Message { content, .. } => self.resolve_message(event, content),
            EventOrigin::Interaction {
                command_name, options, ..
            } => {
                let command = self
                    .registry
                    .get_ignore_case(command_name)
                    .ok_or(IgnoreReason::UnknownCommand)?;
                Ok((
                    command,
                    Arguments::Interaction {
                        options: options.clone(),
                    },
                ))
            }
        }
    }

    fn resolve_message(
        &self,
        event: &InboundEvent,
        content: &str,
    ) -> Result<(Arc<CommandDefinition>, Arguments), IgnoreReason> {
        let (tokens, command) = match self.strip_mention(content) {
            Some(rest) => {
                let tokens = split_content(rest);
                let command = tokens
                    .first()
                    .and_then(|name| self.registry.find_by_invocation(name));
                (tokens, command)
            }
            None => {
                let prefix = self.prefixes.prefix(event.server_id);
                let tokens = split_content(content);
                let first = tokens.first().ok_or(IgnoreReason::NoPrefix)?;
                let has_prefix = first
                    .get(..prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(&prefix));
                if !has_prefix {
                    return Err(IgnoreReason::NoPrefix);
                }
                let command = self.registry.resolve(&prefix, first);
                (tokens, command)
            }
        };

        let command = command.ok_or(IgnoreReason::UnknownCommand)?;
        let named = parse_named_arguments(tokens.get(1..).unwrap_or_default());
        let routed = route(tokens, command.formats());

        Ok((command, Arguments::Message { routed, named }))
    }

    /// Text after a leading bot mention, when mentions may stand in for the prefix.
    fn strip_mention<'a>(&self, content: &'a str) -> Option<&'a str> {
        if !self.allow_mention_prefix {
            return None;
        }
        let bot_user_id = self.bot_user_id?;
        let content = content.trim_start();

        [format!("<@{}>", bot_user_id), format!("<@!{}>", bot_user_id)]
            .iter()
            .find_map(|mention| content.strip_prefix(mention.as_str()))
    }

    // =========================================================================
    // Denials
    // =========================================================================

    async fn deny(
        &self,
        command: &CommandDefinition,
        event: &InboundEvent,
        responder: &Responder,
        denial: Denial,
    ) -> DispatchOutcome {
        let stage = denial.stage();
        tracing::debug!(
            command = %command.name(),
            user_id = event.user_id,
            stage = %stage,
            "Invocation denied"
        );
        metrics::record_denial(command.name(), stage.as_str());
        metrics::record_dispatch(command.name(), "denied");

        let sent = match self.render_denial(command, event, &denial) {
            Some(mut response) => {
                response.ephemeral = true;
                if let Delivery::ChannelMessage { reply_to, .. } = responder.delivery() {
                    response.reply_to = reply_to;
                }
                match responder.send(response).await {
                    Ok(sent) => Some(sent),
                    Err(e) => {
                        tracing::warn!(
                            command = %command.name(),
                            user_id = event.user_id,
                            error = %e,
                            "Failed to deliver denial notice"
                        );
                        None
                    }
                }
            }
            None => None,
        };
        let notified = sent.is_some();

        if let Denial::RateLimited {
            remaining_seconds,
            window_started_millis,
            notify: true,
        } = denial
        {
            self.schedule_release(
                command,
                event,
                responder,
                remaining_seconds,
                window_started_millis,
                sent.flatten(),
            );
        }

        DispatchOutcome::Denied {
            command: command.name().to_string(),
            stage,
            notified,
        }
    }

    fn render_denial(&self, command: &CommandDefinition, event: &InboundEvent, denial: &Denial) -> Option<Response> {
        let user_id = event.user_id;
        let channel_id = event.channel_id;
        let name = command.name().to_string();

        match denial {
            Denial::OutOfScope | Denial::UserNotAllowed => None,
            Denial::ConditionFailed => command
                .condition_message()
                .or(self.messages.condition.as_ref())
                .map(|message| {
                    message.render(&ConditionNotice {
                        user_id,
                        channel_id,
                        command: name,
                    })
                }),
            Denial::MissingRole { required } => {
                let mut response = self.messages.no_role.render(&NoRoleNotice {
                    roles: required.clone(),
                    formatted_roles: format_roles(required),
                    user_id,
                    channel_id,
                    command: name,
                });
                response.suppress_mentions = true;
                Some(response)
            }
            Denial::MissingPermission { required, missing } => {
                Some(self.messages.no_permission.render(&NoPermissionNotice {
                    required: *required,
                    missing: *missing,
                    user_id,
                    channel_id,
                    command: name,
                }))
            }
            Denial::RateLimited {
                remaining_seconds,
                notify,
                ..
            } => notify.then(|| {
                self.messages.rate_limited.render(&RateLimitedNotice {
                    remaining_seconds: *remaining_seconds,
                    user_id,
                    channel_id,
                    command: name,
                })
            }),
            Denial::Middleware { reason, .. } => reason.as_ref().map(Response::text),
        }
    }

    /// Free the cooldown once it runs out and take the warning down with it.
    ///
    /// The release is armed even when the warning could not be delivered. It
    /// only clears the window that produced the warning; a window opened since
    /// then keeps running.
    fn schedule_release(
        &self,
        command: &CommandDefinition,
        event: &InboundEvent,
        responder: &Responder,
        remaining_seconds: i64,
        window_started_millis: i64,
        warning: Option<crate::domain::entities::SentMessage>,
    ) {
        let rate_limiter = self.pipeline.rate_limiter().clone();
        let responder = responder.clone();
        let signature = command.signature().to_string();
        let user_id = event.user_id;
        let scope_id = event.scope_id();
        let delay = Duration::from_secs(u64::try_from(remaining_seconds).unwrap_or(0));

        self.pool.schedule(delay, async move {
            rate_limiter.release_window(user_id, scope_id, &signature, window_started_millis);

            let Some(warning) = warning else { return };
            if !matches!(responder.delivery(), Delivery::ChannelMessage { .. }) {
                return;
            }
            if let Err(e) = responder.delete(warning).await {
                tracing::warn!(user_id, error = %e, "Failed to delete rate limit notice");
            }
        });
    }

    // =========================================================================
    // Afterwares
    // =========================================================================

    fn spawn_afterwares(&self, event: &CommandEvent) {
        let command = &event.command;
        let category_names = self
            .registry
            .find_category(command.category())
            .map(|category| category.afterwares().to_vec())
            .unwrap_or_default();

        for name in category_names.iter().chain(command.afterwares()) {
            let Some(afterware) = self.registry.afterware(name) else {
                tracing::warn!(command = %command.name(), afterware = %name, "Afterware not found, skipping");
                continue;
            };

            let event = event.clone();
            self.pool.spawn(async move {
                afterware.after(event).await;
            });
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("prefixes", &self.prefixes)
            .field("allow_mention_prefix", &self.allow_mention_prefix)
            .field("bot_user_id", &self.bot_user_id)
            .finish()
    }
}
