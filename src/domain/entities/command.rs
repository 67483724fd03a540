//! Command definitions and their builder.
//!
//! A [`CommandDefinition`] is immutable once built. The registry owns it
//! behind an `Arc`; the dispatcher and rate limiter only ever reference it,
//! the latter through [`CommandDefinition::signature`].

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::Validate;

use super::event::InboundEvent;
use super::handler::{CommandHandler, Condition, HandlerSet};
use super::notice::{ConditionNotice, DenialMessage};
use crate::domain::services::argument_format::{ArgumentFormat, FormatError};
use crate::domain::value_objects::Permissions;
use crate::shared::error::{FrameworkError, FrameworkResult};
use crate::shared::validation::validation_error;

/// Cooldown applied when neither the command nor the framework sets one.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Description used when none is given.
pub const DEFAULT_DESCRIPTION: &str = "No description";

static NO_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+$").expect("valid command name pattern"));

#[derive(Debug, Validate)]
struct CommandMetadata {
    #[validate(
        length(min = 1, max = 32, message = "must be between 1 and 32 characters"),
        regex(path = *NO_WHITESPACE, message = "must not contain whitespace")
    )]
    name: String,

    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    description: String,
}

/// Where a command may be invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandScope {
    #[default]
    Anywhere,
    ServerOnly,
    PrivateOnly,
    /// Only inside one specific server.
    Server(i64),
}

impl CommandScope {
    pub fn admits(&self, event: &InboundEvent) -> bool {
        match self {
            CommandScope::Anywhere => true,
            CommandScope::ServerOnly => event.server_id.is_some(),
            CommandScope::PrivateOnly => event.server_id.is_none(),
            CommandScope::Server(id) => event.server_id == Some(*id),
        }
    }
}

/// Immutable command definition.
pub struct CommandDefinition {
    name: String,
    description: String,
    category: String,
    cooldown: Duration,
    required_roles: Vec<i64>,
    required_users: Vec<i64>,
    required_permissions: Permissions,
    shortcuts: Vec<String>,
    formats: Vec<ArgumentFormat>,
    middlewares: Vec<String>,
    afterwares: Vec<String>,
    scope: CommandScope,
    conditions: Vec<Condition>,
    condition_message: Option<DenialMessage<ConditionNotice>>,
    handlers: HandlerSet,
    signature: String,
}

impl CommandDefinition {
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Zero disables rate limiting for the command.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn required_roles(&self) -> &[i64] {
        &self.required_roles
    }

    pub fn required_users(&self) -> &[i64] {
        &self.required_users
    }

    pub fn required_permissions(&self) -> Permissions {
        self.required_permissions
    }

    pub fn shortcuts(&self) -> &[String] {
        &self.shortcuts
    }

    pub fn formats(&self) -> &[ArgumentFormat] {
        &self.formats
    }

    pub fn middlewares(&self) -> &[String] {
        &self.middlewares
    }

    pub fn afterwares(&self) -> &[String] {
        &self.afterwares
    }

    pub fn scope(&self) -> CommandScope {
        self.scope
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn condition_message(&self) -> Option<&DenialMessage<ConditionNotice>> {
        self.condition_message.as_ref()
    }

    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    /// Rate-limiter partition key derived from the identifying fields.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Whether `name` is the command name or one of its shortcuts, ignoring case.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.shortcuts.iter().any(|s| s.eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.signature)
    }
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("cooldown", &self.cooldown)
            .field("scope", &self.scope)
            .field("shortcuts", &self.shortcuts)
            .field("middlewares", &self.middlewares)
            .field("conditions", &self.conditions.len())
            .field("handlers", &self.handlers)
            .finish()
    }
}

/// Builder for [`CommandDefinition`].
///
/// Formats are parsed as they are added; problems are reported by
/// [`build`](CommandBuilder::build) together with the cross-field checks.
pub struct CommandBuilder {
    name: String,
    description: Option<String>,
    category: String,
    cooldown: Option<Duration>,
    fallback_cooldown: Duration,
    required_roles: Vec<i64>,
    required_users: Vec<i64>,
    required_permissions: Permissions,
    shortcuts: Vec<String>,
    formats: Vec<(String, Result<ArgumentFormat, FormatError>)>,
    middlewares: Vec<String>,
    afterwares: Vec<String>,
    scope: CommandScope,
    conditions: Vec<Condition>,
    condition_message: Option<DenialMessage<ConditionNotice>>,
    message_handler: Option<Arc<dyn CommandHandler>>,
    interaction_handler: Option<Arc<dyn CommandHandler>>,
    hybrid_handler: Option<Arc<dyn CommandHandler>>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            category: String::new(),
            cooldown: None,
            fallback_cooldown: DEFAULT_COOLDOWN,
            required_roles: Vec::new(),
            required_users: Vec::new(),
            required_permissions: Permissions::empty(),
            shortcuts: Vec::new(),
            formats: Vec::new(),
            middlewares: Vec::new(),
            afterwares: Vec::new(),
            scope: CommandScope::Anywhere,
            conditions: Vec::new(),
            condition_message: None,
            message_handler: None,
            interaction_handler: None,
            hybrid_handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn no_cooldown(self) -> Self {
        self.cooldown(Duration::ZERO)
    }

    /// Cooldown used when [`cooldown`](Self::cooldown) is never called.
    pub fn default_cooldown(mut self, cooldown: Duration) -> Self {
        self.fallback_cooldown = cooldown;
        self
    }

    pub fn required_role(mut self, role_id: i64) -> Self {
        self.required_roles.push(role_id);
        self
    }

    pub fn required_roles(mut self, role_ids: impl IntoIterator<Item = i64>) -> Self {
        self.required_roles.extend(role_ids);
        self
    }

    pub fn required_user(mut self, user_id: i64) -> Self {
        self.required_users.push(user_id);
        self
    }

    pub fn required_users(mut self, user_ids: impl IntoIterator<Item = i64>) -> Self {
        self.required_users.extend(user_ids);
        self
    }

    /// Require a permission flag such as [`Permissions::MANAGE_CHANNELS`].
    pub fn required_permission(mut self, flag: i64) -> Self {
        self.required_permissions.add(flag);
        self
    }

    pub fn required_permissions(mut self, permissions: Permissions) -> Self {
        self.required_permissions = self.required_permissions.union(permissions);
        self
    }

    pub fn shortcut(mut self, shortcut: impl Into<String>) -> Self {
        let shortcut = shortcut.into();
        let shortcut = shortcut.trim();
        if !shortcut.is_empty() {
            self.shortcuts.push(shortcut.to_string());
        }
        self
    }

    pub fn shortcuts<S: Into<String>>(self, shortcuts: impl IntoIterator<Item = S>) -> Self {
        shortcuts.into_iter().fold(self, |builder, s| builder.shortcut(s))
    }

    /// Add a routing format. Candidates are tried in the order added.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        let source = format.into();
        let parsed = ArgumentFormat::parse(&source);
        self.formats.push((source, parsed));
        self
    }

    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middlewares.push(name.into());
        self
    }

    pub fn afterware(mut self, name: impl Into<String>) -> Self {
        self.afterwares.push(name.into());
        self
    }

    pub fn scope(mut self, scope: CommandScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn server_only(self) -> Self {
        self.scope(CommandScope::ServerOnly)
    }

    pub fn private_only(self) -> Self {
        self.scope(CommandScope::PrivateOnly)
    }

    pub fn server(self, server_id: i64) -> Self {
        self.scope(CommandScope::Server(server_id))
    }

    pub fn condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&InboundEvent) -> bool + Send + Sync + 'static,
    {
        self.conditions.push(Arc::new(condition));
        self
    }

    /// Notice sent when a condition fails.
    pub fn condition_message(mut self, message: DenialMessage<ConditionNotice>) -> Self {
        self.condition_message = Some(message);
        self
    }

    pub fn on_message<H: CommandHandler + 'static>(mut self, handler: H) -> Self {
        self.message_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_interaction<H: CommandHandler + 'static>(mut self, handler: H) -> Self {
        self.interaction_handler = Some(Arc::new(handler));
        self
    }

    /// One handler for both origins. Replaces any per-origin handlers.
    pub fn hybrid<H: CommandHandler + 'static>(mut self, handler: H) -> Self {
        self.hybrid_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> FrameworkResult<CommandDefinition> {
        let name = self.name.trim().to_string();
        let description = self
            .description
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        CommandMetadata {
            name: name.clone(),
            description: description.clone(),
        }
        .validate()
        .map_err(validation_error)?;

        let handlers = match (self.hybrid_handler, self.message_handler, self.interaction_handler) {
            (Some(hybrid), _, _) => HandlerSet::Hybrid(hybrid),
            (None, None, None) => return Err(FrameworkError::MissingHandler { command: name }),
            (None, message, interaction) => HandlerSet::Split { message, interaction },
        };

        let mut formats = Vec::with_capacity(self.formats.len());
        for (source, parsed) in self.formats {
            match parsed {
                Ok(format) => formats.push(format),
                Err(source_err) => {
                    return Err(FrameworkError::InvalidFormat {
                        command: name,
                        format: source,
                        source: source_err,
                    })
                }
            }
        }

        let cooldown = self.cooldown.unwrap_or(self.fallback_cooldown);
        let signature = format!(
            "{} (Description: {}, Cooldown: {}, Slash: {}, Hybrid: {})",
            name,
            description,
            cooldown.as_millis(),
            handlers.supports_interaction(),
            handlers.is_hybrid()
        );

        Ok(CommandDefinition {
            name,
            description,
            category: self.category,
            cooldown,
            required_roles: self.required_roles,
            required_users: self.required_users,
            required_permissions: self.required_permissions,
            shortcuts: self.shortcuts,
            formats,
            middlewares: self.middlewares,
            afterwares: self.afterwares,
            scope: self.scope,
            conditions: self.conditions,
            condition_message: self.condition_message,
            handlers,
            signature,
        })
    }
}
