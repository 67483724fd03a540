//! Inbound events and the per-invocation command event.
//!
//! An [`InboundEvent`] is what the platform binding hands to the dispatcher.
//! Once a command is resolved it is wrapped into a [`CommandEvent`], the one
//! shape every handler, middleware and afterware sees regardless of whether
//! the invocation came from a text message or an interaction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::command::CommandDefinition;
use super::response::{Responder, ResponseBuilder};
use crate::domain::services::format_router::RoutedArguments;
use crate::domain::value_objects::Permissions;
use crate::shared::tokenizer::NamedArguments;

/// Roles and effective permissions of the invoking member in a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberContext {
    pub roles: Vec<i64>,
    pub permissions: Permissions,
}

/// A structured option supplied with an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    pub value: String,
}

/// Where an event came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventOrigin {
    Message {
        message_id: i64,
        content: String,
    },
    Interaction {
        interaction_id: i64,
        command_name: String,
        options: Vec<InteractionOption>,
    },
}

/// Platform-neutral inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub origin: EventOrigin,
    pub user_id: i64,
    /// Set for bots, webhooks and system authors; such events are ignored.
    #[serde(default)]
    pub author_is_bot: bool,
    pub server_id: Option<i64>,
    pub channel_id: Option<i64>,
    pub member: Option<MemberContext>,
}

impl InboundEvent {
    /// A text message in a channel, outside any server.
    pub fn message(user_id: i64, channel_id: i64, content: impl Into<String>) -> Self {
        Self {
            origin: EventOrigin::Message {
                message_id: 0,
                content: content.into(),
            },
            user_id,
            author_is_bot: false,
            server_id: None,
            channel_id: Some(channel_id),
            member: None,
        }
    }

    /// An interaction invocation, outside any server.
    pub fn interaction(user_id: i64, interaction_id: i64, command_name: impl Into<String>) -> Self {
        Self {
            origin: EventOrigin::Interaction {
                interaction_id,
                command_name: command_name.into(),
                options: Vec::new(),
            },
            user_id,
            author_is_bot: false,
            server_id: None,
            channel_id: None,
            member: None,
        }
    }

    pub fn with_message_id(mut self, id: i64) -> Self {
        if let EventOrigin::Message { message_id, .. } = &mut self.origin {
            *message_id = id;
        }
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let EventOrigin::Interaction { options, .. } = &mut self.origin {
            options.push(InteractionOption {
                name: name.into(),
                value: value.into(),
            });
        }
        self
    }

    pub fn in_server(mut self, server_id: i64) -> Self {
        self.server_id = Some(server_id);
        self
    }

    pub fn in_channel(mut self, channel_id: i64) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    pub fn with_member(mut self, roles: Vec<i64>, permissions: Permissions) -> Self {
        self.member = Some(MemberContext { roles, permissions });
        self
    }

    pub fn from_bot(mut self) -> Self {
        self.author_is_bot = true;
        self
    }

    /// Server id, or the user id itself outside a server.
    pub fn scope_id(&self) -> i64 {
        self.server_id.unwrap_or(self.user_id)
    }

    pub fn is_message(&self) -> bool {
        matches!(self.origin, EventOrigin::Message { .. })
    }

    pub fn is_interaction(&self) -> bool {
        matches!(self.origin, EventOrigin::Interaction { .. })
    }

    /// Raw text of a message event.
    pub fn content(&self) -> Option<&str> {
        match &self.origin {
            EventOrigin::Message { content, .. } => Some(content),
            EventOrigin::Interaction { .. } => None,
        }
    }

    pub fn member_roles(&self) -> &[i64] {
        self.member.as_ref().map(|m| m.roles.as_slice()).unwrap_or(&[])
    }

    /// Effective permissions supplied by the binding, empty when unknown.
    pub fn permissions(&self) -> Permissions {
        self.member.as_ref().map(|m| m.permissions).unwrap_or_default()
    }
}

/// Arguments of an invocation, shaped by its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arguments {
    Message {
        routed: RoutedArguments,
        named: NamedArguments,
    },
    Interaction {
        options: Vec<InteractionOption>,
    },
}

impl Arguments {
    /// Look up an argument by name on either origin.
    ///
    /// Message arguments check routed placeholders first, then `--named`
    /// arguments. Interaction options are matched ignoring case.
    pub fn get(&self, name: &str) -> Option<String> {
        match self {
            Arguments::Message { routed, named } => routed
                .with_name(name)
                .or_else(|| named.get(name).map(str::to_string)),
            Arguments::Interaction { options } => options
                .iter()
                .find(|o| o.name.eq_ignore_ascii_case(name))
                .map(|o| o.value.clone()),
        }
    }

    /// Positional access. Index 0 of a message is the invocation token.
    pub fn get_index(&self, index: usize) -> Option<&str> {
        match self {
            Arguments::Message { routed, .. } => routed.with_index(index),
            Arguments::Interaction { options } => options.get(index).map(|o| o.value.as_str()),
        }
    }

    pub fn routed(&self) -> Option<&RoutedArguments> {
        match self {
            Arguments::Message { routed, .. } => Some(routed),
            Arguments::Interaction { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Arguments::Message { routed, .. } => routed.len(),
            Arguments::Interaction { options } => options.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a handler needs for one invocation.
#[derive(Clone)]
pub struct CommandEvent {
    pub event: Arc<InboundEvent>,
    pub command: Arc<CommandDefinition>,
    pub arguments: Arc<Arguments>,
    pub responder: Responder,
}

impl CommandEvent {
    pub fn user_id(&self) -> i64 {
        self.event.user_id
    }

    pub fn server_id(&self) -> Option<i64> {
        self.event.server_id
    }

    pub fn channel_id(&self) -> Option<i64> {
        self.event.channel_id
    }

    pub fn is_message(&self) -> bool {
        self.event.is_message()
    }

    /// Start a reply through the delivery strategy of this invocation.
    pub fn respond(&self) -> ResponseBuilder {
        self.responder.builder()
    }
}

impl std::fmt::Debug for CommandEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEvent")
            .field("command", &self.command.name())
            .field("user_id", &self.event.user_id)
            .field("server_id", &self.event.server_id)
            .field("arguments", &self.arguments)
            .finish()
    }
}
