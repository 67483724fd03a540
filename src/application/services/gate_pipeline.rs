//! Gate Pipeline
//!
//! Runs the restraints of one invocation in a fixed order and reports the
//! first denial:
//!
//! 1. scope (silent)
//! 2. required users (silent)
//! 3. custom conditions, all must hold
//! 4. required roles, any one is enough
//! 5. required permissions, all must be held
//! 6. rate limit, only for commands with a cooldown
//!
//! Named middlewares run separately once the restraints admitted the
//! invocation, category middlewares before command middlewares.

use std::sync::Arc;

use crate::application::services::command_registry::CommandRegistry;
use crate::application::services::rate_limiter::{Acquisition, RateLimiter};
use crate::domain::entities::{CommandDefinition, CommandEvent, GateResult, InboundEvent};
use crate::domain::value_objects::Permissions;

/// Stage that stopped an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialStage {
    Scope,
    RequiredUser,
    Condition,
    Role,
    Permission,
    RateLimit,
    Middleware,
}

impl DenialStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialStage::Scope => "scope",
            DenialStage::RequiredUser => "required_user",
            DenialStage::Condition => "condition",
            DenialStage::Role => "role",
            DenialStage::Permission => "permission",
            DenialStage::RateLimit => "rate_limit",
            DenialStage::Middleware => "middleware",
        }
    }

    /// Silent stages never answer the invoker, so they do not reveal that
    /// the command exists.
    pub fn is_silent(&self) -> bool {
        matches!(self, DenialStage::Scope | DenialStage::RequiredUser)
    }
}

impl std::fmt::Display for DenialStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an invocation was denied, with what a notice needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    OutOfScope,
    UserNotAllowed,
    ConditionFailed,
    MissingRole {
        required: Vec<i64>,
    },
    MissingPermission {
        required: Permissions,
        missing: Permissions,
    },
    /// `notify` is false when the invoker was already told about this window.
    /// `window_started_millis` identifies the cooldown window that denied.
    RateLimited {
        remaining_seconds: i64,
        window_started_millis: i64,
        notify: bool,
    },
    Middleware {
        name: String,
        reason: Option<String>,
    },
}

impl Denial {
    pub fn stage(&self) -> DenialStage {
        match self {
            Denial::OutOfScope => DenialStage::Scope,
            Denial::UserNotAllowed => DenialStage::RequiredUser,
            Denial::ConditionFailed => DenialStage::Condition,
            Denial::MissingRole { .. } => DenialStage::Role,
            Denial::MissingPermission { .. } => DenialStage::Permission,
            Denial::RateLimited { .. } => DenialStage::RateLimit,
            Denial::Middleware { .. } => DenialStage::Middleware,
        }
    }
}

/// Result of running the restraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Admitted,
    Denied(Denial),
}

impl Verdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Verdict::Admitted)
    }
}

// =============================================================================
// Stage checks
// =============================================================================

pub fn check_scope(command: &CommandDefinition, event: &InboundEvent) -> Result<(), Denial> {
    if command.scope().admits(event) {
        Ok(())
    } else {
        Err(Denial::OutOfScope)
    }
}

pub fn check_required_users(command: &CommandDefinition, event: &InboundEvent) -> Result<(), Denial> {
    let users = command.required_users();
    if users.is_empty() || users.contains(&event.user_id) {
        Ok(())
    } else {
        Err(Denial::UserNotAllowed)
    }
}

pub fn check_conditions(command: &CommandDefinition, event: &InboundEvent) -> Result<(), Denial> {
    if command.conditions().iter().all(|condition| condition(event)) {
        Ok(())
    } else {
        Err(Denial::ConditionFailed)
    }
}

/// Any required role is enough. Outside a server there are no roles to
/// check, so the stage passes.
pub fn check_roles(required: &[i64], event: &InboundEvent) -> Result<(), Denial> {
    if required.is_empty() || event.server_id.is_none() {
        return Ok(());
    }

    let held = event.member_roles();
    if required.iter().any(|role| held.contains(role)) {
        Ok(())
    } else {
        Err(Denial::MissingRole {
            required: required.to_vec(),
        })
    }
}

/// The caller's effective permissions must cover every required flag.
/// Outside a server the stage passes.
pub fn check_permissions(required: Permissions, event: &InboundEvent) -> Result<(), Denial> {
    if required.is_empty() || event.server_id.is_none() {
        return Ok(());
    }

    let held = event.permissions();
    if held.contains_all(required) {
        Ok(())
    } else {
        Err(Denial::MissingPermission {
            required,
            missing: held.missing(required),
        })
    }
}

// =============================================================================
// Pipeline
// =============================================================================

#[derive(Debug, Clone)]
pub struct GatePipeline {
    rate_limiter: Arc<RateLimiter>,
}

impl GatePipeline {
    pub fn new(rate_limiter: Arc<RateLimiter>) -> Self {
        Self { rate_limiter }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Stages 1 to 5. Pure: nothing is recorded.
    pub fn check_restraints(&self, command: &CommandDefinition, event: &InboundEvent) -> Result<(), Denial> {
        check_scope(command, event)?;
        check_required_users(command, event)?;
        check_conditions(command, event)?;
        check_roles(command.required_roles(), event)?;
        check_permissions(command.required_permissions(), event)?;
        Ok(())
    }

    /// Every stage in order. An admitted invocation with a cooldown opens a
    /// new cooldown window.
    pub fn evaluate(&self, command: &CommandDefinition, event: &InboundEvent) -> Verdict {
        if let Err(denial) = self.check_restraints(command, event) {
            return Verdict::Denied(denial);
        }

        if command.cooldown().is_zero() {
            return Verdict::Admitted;
        }

        match self.rate_limiter.try_acquire(
            event.user_id,
            event.scope_id(),
            command.signature(),
            command.cooldown(),
        ) {
            Acquisition::Admitted => Verdict::Admitted,
            Acquisition::Limited {
                remaining_seconds,
                window_started_millis,
            } => Verdict::Denied(Denial::RateLimited {
                remaining_seconds,
                window_started_millis,
                notify: true,
            }),
            Acquisition::Suppressed {
                remaining_seconds,
                window_started_millis,
            } => Verdict::Denied(Denial::RateLimited {
                remaining_seconds,
                window_started_millis,
                notify: false,
            }),
        }
    }

    /// Run category then command middlewares, stopping at the first deny.
    ///
    /// Names that no longer resolve are skipped with a warning; references
    /// are checked when commands and categories are registered.
    pub async fn run_middlewares(&self, registry: &CommandRegistry, event: &CommandEvent) -> Result<(), Denial> {
        let command = &event.command;
        let category_names = registry
            .find_category(command.category())
            .map(|category| category.middlewares().to_vec())
            .unwrap_or_default();

        for name in category_names.iter().chain(command.middlewares()) {
            let Some(middleware) = registry.middleware(name) else {
                tracing::warn!(command = %command.name(), middleware = %name, "Middleware not found, skipping");
                continue;
            };

            if let GateResult::Deny(reason) = middleware.check(event).await {
                return Err(Denial::Middleware {
                    name: name.clone(),
                    reason,
                });
            }
        }

        Ok(())
    }
}
