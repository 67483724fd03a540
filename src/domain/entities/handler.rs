//! Handler, middleware and afterware contracts.
//!
//! Plain closures implement every trait here, so small commands can be
//! declared inline while larger ones get their own types.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::event::{CommandEvent, InboundEvent};

/// Command body.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, event: CommandEvent) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(CommandEvent) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, event: CommandEvent) -> anyhow::Result<()> {
        self(event).await
    }
}

/// Outcome of a single gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    Allow,
    /// Deny, optionally telling the invoker why.
    Deny(Option<String>),
}

impl GateResult {
    pub fn allow() -> Self {
        GateResult::Allow
    }

    pub fn deny() -> Self {
        GateResult::Deny(None)
    }

    pub fn deny_with(reason: impl Into<String>) -> Self {
        GateResult::Deny(Some(reason.into()))
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, GateResult::Allow)
    }
}

/// Gate run before the handler, after the built-in restraints.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn check(&self, event: &CommandEvent) -> GateResult;
}

#[async_trait]
impl<F> Middleware for F
where
    F: Fn(&CommandEvent) -> GateResult + Send + Sync,
{
    async fn check(&self, event: &CommandEvent) -> GateResult {
        self(event)
    }
}

/// Fire-and-forget hook run after a successful handler.
#[async_trait]
pub trait Afterware: Send + Sync {
    async fn after(&self, event: CommandEvent);
}

#[async_trait]
impl<F, Fut> Afterware for F
where
    F: Fn(CommandEvent) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn after(&self, event: CommandEvent) {
        self(event).await
    }
}

/// Custom predicate; every condition on a command must hold.
pub type Condition = Arc<dyn Fn(&InboundEvent) -> bool + Send + Sync>;

/// Handlers attached to a command.
#[derive(Clone)]
pub enum HandlerSet {
    /// One handler per origin; either may be absent.
    Split {
        message: Option<Arc<dyn CommandHandler>>,
        interaction: Option<Arc<dyn CommandHandler>>,
    },
    /// One handler shared by both origins.
    Hybrid(Arc<dyn CommandHandler>),
}

impl HandlerSet {
    /// Handler for the event's origin.
    pub fn for_event(&self, event: &InboundEvent) -> Option<&Arc<dyn CommandHandler>> {
        match self {
            HandlerSet::Hybrid(handler) => Some(handler),
            HandlerSet::Split { message, .. } if event.is_message() => message.as_ref(),
            HandlerSet::Split { interaction, .. } => interaction.as_ref(),
        }
    }

    pub fn supports_message(&self) -> bool {
        matches!(self, HandlerSet::Hybrid(_) | HandlerSet::Split { message: Some(_), .. })
    }

    pub fn supports_interaction(&self) -> bool {
        matches!(self, HandlerSet::Hybrid(_) | HandlerSet::Split { interaction: Some(_), .. })
    }

    pub fn is_hybrid(&self) -> bool {
        matches!(self, HandlerSet::Hybrid(_))
    }
}

impl std::fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerSet::Hybrid(_) => f.write_str("Hybrid"),
            HandlerSet::Split { message, interaction } => f
                .debug_struct("Split")
                .field("message", &message.is_some())
                .field("interaction", &interaction.is_some())
                .finish(),
        }
    }
}
