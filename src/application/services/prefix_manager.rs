//! Prefix Manager
//!
//! Resolves the command prefix for a server. Custom prefixes are cached in
//! memory and can be populated lazily from a caller-supplied loader.

use std::sync::Arc;

use dashmap::DashMap;

/// Looks up a server's stored prefix. `None` means the default applies.
pub type PrefixLoader = Arc<dyn Fn(i64) -> Option<String> + Send + Sync>;

pub const DEFAULT_PREFIX: &str = "v.";

pub struct PrefixManager {
    default_prefix: String,
    cache: DashMap<i64, String>,
    loader: Option<PrefixLoader>,
}

impl PrefixManager {
    pub fn new(default_prefix: impl Into<String>) -> Self {
        Self {
            default_prefix: default_prefix.into(),
            cache: DashMap::new(),
            loader: None,
        }
    }

    pub fn with_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(i64) -> Option<String> + Send + Sync + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    /// Prefix in effect for an event's server.
    ///
    /// Private contexts always use the default. A cache miss consults the
    /// loader once and remembers a custom result.
    pub fn prefix(&self, server_id: Option<i64>) -> String {
        let Some(server_id) = server_id else {
            return self.default_prefix.clone();
        };

        if let Some(prefix) = self.cache.get(&server_id) {
            return prefix.value().clone();
        }

        match self.load(server_id) {
            Some(prefix) => {
                self.cache.insert(server_id, prefix.clone());
                prefix
            }
            None => self.default_prefix.clone(),
        }
    }

    pub fn set_prefix(&self, server_id: i64, prefix: impl Into<String>) {
        let prefix = prefix.into();
        tracing::info!(server_id, prefix = %prefix, "Server prefix changed");
        self.cache.insert(server_id, prefix);
    }

    /// Go back to the default prefix.
    pub fn reset_prefix(&self, server_id: i64) {
        self.set_prefix(server_id, self.default_prefix.clone());
    }

    /// Forget the cached prefix so the next lookup consults the loader.
    pub fn clear_prefix(&self, server_id: i64) -> Option<String> {
        self.cache.remove(&server_id).map(|(_, prefix)| prefix)
    }

    /// Re-read a server's prefix from the loader.
    pub fn reload_prefix(&self, server_id: i64) -> String {
        self.cache.remove(&server_id);
        self.prefix(Some(server_id))
    }

    pub fn prefixes(&self) -> Vec<(i64, String)> {
        let mut prefixes: Vec<_> = self
            .cache
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        prefixes.sort_unstable_by_key(|(server_id, _)| *server_id);
        prefixes
    }

    fn load(&self, server_id: i64) -> Option<String> {
        let loader = self.loader.as_ref()?;
        loader(server_id).filter(|prefix| !prefix.trim().is_empty())
    }
}

impl Default for PrefixManager {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl std::fmt::Debug for PrefixManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixManager")
            .field("default_prefix", &self.default_prefix)
            .field("cached", &self.cache.len())
            .field("loader", &self.loader.is_some())
            .finish()
    }
}
