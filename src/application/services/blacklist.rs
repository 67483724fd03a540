//! Blacklist
//!
//! Users whose events are dropped before command resolution. Entries come
//! from explicit additions or from an optional loader; only positive loader
//! answers are cached.

use std::sync::Arc;

use dashmap::DashSet;

pub type BlacklistLoader = Arc<dyn Fn(i64) -> bool + Send + Sync>;

#[derive(Default)]
pub struct Blacklist {
    users: DashSet<i64>,
    loader: Option<BlacklistLoader>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(i64) -> bool + Send + Sync + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn is_blacklisted(&self, user_id: i64) -> bool {
        if self.users.contains(&user_id) {
            return true;
        }

        let listed = self.loader.as_ref().is_some_and(|loader| loader(user_id));
        if listed {
            self.users.insert(user_id);
        }
        listed
    }

    pub fn add(&self, user_id: i64) -> bool {
        let added = self.users.insert(user_id);
        if added {
            tracing::info!(user_id, "User blacklisted");
        }
        added
    }

    pub fn remove(&self, user_id: i64) -> bool {
        let removed = self.users.remove(&user_id).is_some();
        if removed {
            tracing::info!(user_id, "User removed from blacklist");
        }
        removed
    }

    /// Drop the cached entry and ask the loader again.
    pub fn refresh(&self, user_id: i64) -> bool {
        self.users.remove(&user_id);
        self.is_blacklisted(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl std::fmt::Debug for Blacklist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blacklist")
            .field("users", &self.users.len())
            .field("loader", &self.loader.is_some())
            .finish()
    }
}
