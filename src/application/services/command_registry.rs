//! Command Registry
//!
//! In-memory store of command definitions plus the named middlewares,
//! afterwares and categories they refer to.
//!
//! Commands are kept in registration order. Duplicate names are accepted;
//! lookups scan newest first, so the most recently registered definition
//! wins.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::entities::{
    Afterware, Category, CommandBuilder, CommandDefinition, Middleware,
};
use crate::shared::error::{FrameworkError, FrameworkResult};

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Registry of commands and their named collaborators.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<Vec<Arc<CommandDefinition>>>,
    categories: DashMap<String, Arc<Category>>,
    middlewares: DashMap<String, Arc<dyn Middleware>>,
    afterwares: DashMap<String, Arc<dyn Afterware>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Append a command.
    pub fn add(&self, command: CommandDefinition) -> Arc<CommandDefinition> {
        let command = Arc::new(command);
        let mut commands = self.commands.write();

        if commands.iter().any(|c| c.name().eq_ignore_ascii_case(command.name())) {
            tracing::warn!(
                command = %command.name(),
                "Command registered twice, lookups will resolve to the newest definition"
            );
        }

        commands.push(command.clone());
        tracing::info!(command = %command.name(), category = %command.category(), "Command registered");
        command
    }

    /// Build a command and add it once every name it references is known.
    pub fn register(&self, builder: CommandBuilder) -> FrameworkResult<Arc<CommandDefinition>> {
        let command = builder.build()?;
        let owner = command.name().to_string();

        for name in command.middlewares() {
            if !self.middlewares.contains_key(&key(name)) {
                return Err(FrameworkError::UnknownMiddleware {
                    name: name.clone(),
                    owner,
                });
            }
        }
        for name in command.afterwares() {
            if !self.afterwares.contains_key(&key(name)) {
                return Err(FrameworkError::UnknownAfterware {
                    name: name.clone(),
                    owner,
                });
            }
        }

        Ok(self.add(command))
    }

    /// Remove one definition by identity.
    pub fn remove(&self, command: &Arc<CommandDefinition>) -> bool {
        let mut commands = self.commands.write();
        let before = commands.len();
        commands.retain(|c| !Arc::ptr_eq(c, command));
        let removed = commands.len() != before;

        if removed {
            tracing::info!(command = %command.name(), "Command removed");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandDefinition>> {
        self.commands
            .read()
            .iter()
            .rev()
            .find(|c| c.name() == name)
            .cloned()
    }

    pub fn get_ignore_case(&self, name: &str) -> Option<Arc<CommandDefinition>> {
        self.commands
            .read()
            .iter()
            .rev()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn by_category(&self, category: &str) -> Vec<Arc<CommandDefinition>> {
        self.commands
            .read()
            .iter()
            .filter(|c| c.category() == category)
            .cloned()
            .collect()
    }

    pub fn by_category_ignore_case(&self, category: &str) -> Vec<Arc<CommandDefinition>> {
        self.commands
            .read()
            .iter()
            .filter(|c| c.category().eq_ignore_ascii_case(category))
            .cloned()
            .collect()
    }

    /// Snapshot of every command in registration order.
    pub fn all(&self) -> Vec<Arc<CommandDefinition>> {
        self.commands.read().clone()
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Resolve the first token of a message: `prefix + name` or
    /// `prefix + shortcut`, ignoring case.
    pub fn resolve(&self, prefix: &str, token: &str) -> Option<Arc<CommandDefinition>> {
        let head = token.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        self.find_by_invocation(&token[prefix.len()..])
    }

    /// Look up a bare invocation name against names and shortcuts.
    pub fn find_by_invocation(&self, name: &str) -> Option<Arc<CommandDefinition>> {
        if name.is_empty() {
            return None;
        }
        let commands = self.commands.read();
        commands
            .iter()
            .rev()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .or_else(|| commands.iter().rev().find(|c| c.answers_to(name)))
            .cloned()
    }

    // =========================================================================
    // Middlewares & afterwares
    // =========================================================================

    pub fn add_middleware<M: Middleware + 'static>(&self, name: &str, middleware: M) {
        self.middlewares.insert(key(name), Arc::new(middleware));
        tracing::debug!(middleware = %name, "Middleware registered");
    }

    pub fn add_afterware<A: Afterware + 'static>(&self, name: &str, afterware: A) {
        self.afterwares.insert(key(name), Arc::new(afterware));
        tracing::debug!(afterware = %name, "Afterware registered");
    }

    pub fn middleware(&self, name: &str) -> Option<Arc<dyn Middleware>> {
        self.middlewares.get(&key(name)).map(|m| m.value().clone())
    }

    pub fn afterware(&self, name: &str) -> Option<Arc<dyn Afterware>> {
        self.afterwares.get(&key(name)).map(|a| a.value().clone())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Register a category once every name it references is known.
    pub fn add_category(&self, category: Category) -> FrameworkResult<Arc<Category>> {
        for name in category.middlewares() {
            if !self.middlewares.contains_key(&key(name)) {
                return Err(FrameworkError::UnknownMiddleware {
                    name: name.clone(),
                    owner: category.name().to_string(),
                });
            }
        }
        for name in category.afterwares() {
            if !self.afterwares.contains_key(&key(name)) {
                return Err(FrameworkError::UnknownAfterware {
                    name: name.clone(),
                    owner: category.name().to_string(),
                });
            }
        }

        let category = Arc::new(category);
        self.categories.insert(key(category.name()), category.clone());
        tracing::info!(category = %category.name(), "Category registered");
        Ok(category)
    }

    pub fn find_category(&self, name: &str) -> Option<Arc<Category>> {
        self.categories.get(&key(name)).map(|c| c.value().clone())
    }

    pub fn categories(&self) -> Vec<Arc<Category>> {
        let mut categories: Vec<_> = self.categories.iter().map(|c| c.value().clone()).collect();
        categories.sort_by(|a, b| a.name().cmp(b.name()));
        categories
    }

    /// Commands that belong to a category, derived on every call.
    pub fn commands_in(&self, category: &Category) -> Vec<Arc<CommandDefinition>> {
        self.by_category_ignore_case(category.name())
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.len())
            .field("categories", &self.categories.len())
            .field("middlewares", &self.middlewares.len())
            .field("afterwares", &self.afterwares.len())
            .finish()
    }
}
