//! Denial notices shown to invokers.
//!
//! Each notice kind can be rendered as plain text or as an embed; which one
//! is decided by the variant registered, not at render time.

use std::fmt;
use std::sync::Arc;

use super::response::{Embed, Response};
use crate::domain::value_objects::Permissions;

/// Context for a rate-limit notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitedNotice {
    pub remaining_seconds: i64,
    pub user_id: i64,
    pub channel_id: Option<i64>,
    pub command: String,
}

/// Context for a missing-permission notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoPermissionNotice {
    pub required: Permissions,
    pub missing: Permissions,
    pub user_id: i64,
    pub channel_id: Option<i64>,
    pub command: String,
}

/// Context for a missing-role notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoRoleNotice {
    pub roles: Vec<i64>,
    /// Role mentions joined with `", "`.
    pub formatted_roles: String,
    pub user_id: i64,
    pub channel_id: Option<i64>,
    pub command: String,
}

/// Context for a failed custom condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionNotice {
    pub user_id: i64,
    pub channel_id: Option<i64>,
    pub command: String,
}

type TextRenderer<C> = Arc<dyn Fn(&C) -> String + Send + Sync>;
type EmbedRenderer<C> = Arc<dyn Fn(&C) -> Embed + Send + Sync>;

/// A notice renderer: plain text or embed.
pub enum DenialMessage<C> {
    Text(TextRenderer<C>),
    Embed(EmbedRenderer<C>),
}

impl<C> DenialMessage<C> {
    pub fn text<F>(render: F) -> Self
    where
        F: Fn(&C) -> String + Send + Sync + 'static,
    {
        DenialMessage::Text(Arc::new(render))
    }

    pub fn embed<F>(render: F) -> Self
    where
        F: Fn(&C) -> Embed + Send + Sync + 'static,
    {
        DenialMessage::Embed(Arc::new(render))
    }

    pub fn render(&self, context: &C) -> Response {
        match self {
            DenialMessage::Text(render) => Response::text(render(context)),
            DenialMessage::Embed(render) => Response::embed(render(context)),
        }
    }
}

impl<C> Clone for DenialMessage<C> {
    fn clone(&self) -> Self {
        match self {
            DenialMessage::Text(render) => DenialMessage::Text(render.clone()),
            DenialMessage::Embed(render) => DenialMessage::Embed(render.clone()),
        }
    }
}

impl<C> fmt::Debug for DenialMessage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialMessage::Text(_) => f.write_str("DenialMessage::Text"),
            DenialMessage::Embed(_) => f.write_str("DenialMessage::Embed"),
        }
    }
}

/// Format role ids as role mentions joined with `", "`.
pub fn format_roles(roles: &[i64]) -> String {
    roles
        .iter()
        .map(|id| format!("<@&{}>", id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The notices used by a dispatcher.
#[derive(Debug, Clone)]
pub struct DenialMessages {
    pub rate_limited: DenialMessage<RateLimitedNotice>,
    pub no_permission: DenialMessage<NoPermissionNotice>,
    pub no_role: DenialMessage<NoRoleNotice>,
    /// Fallback for commands without their own condition notice. Silent when unset.
    pub condition: Option<DenialMessage<ConditionNotice>>,
}

impl Default for DenialMessages {
    fn default() -> Self {
        Self {
            rate_limited: DenialMessage::text(|n: &RateLimitedNotice| {
                format!(
                    "You can use this command in **{} seconds**, during this period, the bot will not respond \
                     to any invocation of the command: **{}** for the user. This message will delete itself \
                     when cooldown is over.",
                    n.remaining_seconds, n.command
                )
            }),
            no_permission: DenialMessage::text(|n: &NoPermissionNotice| {
                format!("You need these permission(s): {} to run this command!", n.required.describe())
            }),
            no_role: DenialMessage::text(|n: &NoRoleNotice| {
                format!(
                    "You need to have any of the role(s): {} to run this command!",
                    n.formatted_roles
                )
            }),
            condition: None,
        }
    }
}
