//! Rate Limiter
//!
//! Per-(command, user) cooldown tracking, partitioned by scope (server id, or
//! the user id outside servers).
//!
//! Each partition holds a record `{notified, timestamp}`. A present record
//! means the scope is cooling down. The first invocation that hits an active
//! cooldown is reported as [`Acquisition::Limited`] and flips `notified`;
//! further hits in the same window are [`Acquisition::Suppressed`] so the
//! invoker is told only once per cycle.
//!
//! Entities live in a concurrent map keyed by (signature, user), created with
//! an atomic insert-if-absent. Each scope record is read and written under
//! its own map-entry lock, so two concurrent invocations for the same
//! user, command and scope can never both be admitted in one window, while
//! unrelated users and commands never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::entities::DEFAULT_COOLDOWN;
use crate::infrastructure::clock::Clock;
use crate::infrastructure::metrics;
use crate::infrastructure::worker_pool::WorkerPool;

/// Cooldown state of one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownRecord {
    pub notified: bool,
    pub timestamp_millis: i64,
}

/// Cooldown state of one user for one command.
#[derive(Debug)]
pub struct RateLimitEntity {
    command: String,
    user_id: i64,
    scopes: DashMap<i64, CooldownRecord>,
}

impl RateLimitEntity {
    fn new(command: String, user_id: i64) -> Self {
        Self {
            command,
            user_id,
            scopes: DashMap::new(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn is_cooling_down(&self, scope_id: i64) -> bool {
        self.scopes.contains_key(&scope_id)
    }

    pub fn record(&self, scope_id: i64) -> Option<CooldownRecord> {
        self.scopes.get(&scope_id).map(|r| *r)
    }

    fn release(&self, scope_id: i64) -> bool {
        self.scopes.remove(&scope_id).is_some()
    }

    fn release_window(&self, scope_id: i64, window_started_millis: i64) -> bool {
        self.scopes
            .remove_if(&scope_id, |_, record| record.timestamp_millis == window_started_millis)
            .is_some()
    }
}

/// Result of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    Admitted,
    /// First hit on an active cooldown; the invoker should be told.
    Limited {
        remaining_seconds: i64,
        window_started_millis: i64,
    },
    /// Repeated hit on a cooldown the invoker was already told about.
    Suppressed {
        remaining_seconds: i64,
        window_started_millis: i64,
    },
}

impl Acquisition {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Acquisition::Admitted)
    }
}

/// Extension points fired by the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptorPosition {
    /// Before the invoker is told about a cooldown.
    Notification,
    /// Before a cooldown record is released explicitly.
    Release,
    /// Before an admitted invocation runs.
    Execution,
}

impl InterceptorPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterceptorPosition::Notification => "notification",
            InterceptorPosition::Release => "release",
            InterceptorPosition::Execution => "execution",
        }
    }
}

/// Read-only view handed to interceptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub user_id: i64,
    pub scope_id: i64,
    pub command: String,
}

pub type Interceptor = Arc<dyn Fn(RateLimitSnapshot) + Send + Sync>;

/// Process-wide cooldown tracker.
///
/// Entities are never evicted: every (command, user) pair ever seen, including
/// pairs only queried through [`is_rate_limited`](RateLimiter::is_rate_limited),
/// stays in the map for the life of the limiter.
pub struct RateLimiter {
    entities: DashMap<(String, i64), Arc<RateLimitEntity>>,
    interceptors: RwLock<HashMap<InterceptorPosition, Vec<Interceptor>>>,
    clock: Arc<dyn Clock>,
    pool: WorkerPool,
    default_cooldown: Duration,
}

impl RateLimiter {
    pub fn new(pool: WorkerPool, clock: Arc<dyn Clock>) -> Self {
        Self::with_default_cooldown(pool, clock, DEFAULT_COOLDOWN)
    }

    pub fn with_default_cooldown(pool: WorkerPool, clock: Arc<dyn Clock>, default_cooldown: Duration) -> Self {
        Self {
            entities: DashMap::new(),
            interceptors: RwLock::new(HashMap::new()),
            clock,
            pool,
            default_cooldown,
        }
    }

    /// Cooldown given to commands that do not set one.
    pub fn default_cooldown(&self) -> Duration {
        self.default_cooldown
    }

    /// Register an interceptor. Interceptors run on the worker pool and never
    /// block the caller.
    pub fn add_interceptor<F>(&self, position: InterceptorPosition, interceptor: F)
    where
        F: Fn(RateLimitSnapshot) + Send + Sync + 'static,
    {
        self.interceptors
            .write()
            .entry(position)
            .or_default()
            .push(Arc::new(interceptor));
    }

    /// Try to admit an invocation.
    pub fn try_acquire(&self, user_id: i64, scope_id: i64, command: &str, cooldown: Duration) -> Acquisition {
        let entity = self.entity(command, user_id);
        let now = self.clock.now_millis();
        let cooldown_ms = i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX);

        let outcome = match entity.scopes.entry(scope_id) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                let remaining = remaining_seconds(record.timestamp_millis, cooldown_ms, now);

                if remaining > 0 {
                    let window_started_millis = record.timestamp_millis;
                    if record.notified {
                        Acquisition::Suppressed {
                            remaining_seconds: remaining,
                            window_started_millis,
                        }
                    } else {
                        record.notified = true;
                        Acquisition::Limited {
                            remaining_seconds: remaining,
                            window_started_millis,
                        }
                    }
                } else {
                    // Expired: the old window is dropped and a new one starts now.
                    *record = CooldownRecord {
                        notified: false,
                        timestamp_millis: now,
                    };
                    Acquisition::Admitted
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CooldownRecord {
                    notified: false,
                    timestamp_millis: now,
                });
                Acquisition::Admitted
            }
        };

        match outcome {
            Acquisition::Admitted => {
                tracing::trace!(command, user_id, scope_id, "Cooldown window started");
                self.fire(InterceptorPosition::Execution, user_id, scope_id, command);
            }
            Acquisition::Limited { remaining_seconds, .. } => {
                tracing::debug!(command, user_id, scope_id, remaining_seconds, "Invocation rate limited");
                self.fire(InterceptorPosition::Notification, user_id, scope_id, command);
            }
            Acquisition::Suppressed { .. } => {
                tracing::trace!(command, user_id, scope_id, "Rate limited invocation suppressed");
            }
        }

        outcome
    }

    /// Clear the cooldown of one scope. Releasing a free scope is a no-op.
    ///
    /// Returns whether a record was removed.
    pub fn release(&self, user_id: i64, scope_id: i64, command: &str) -> bool {
        let removed = self
            .entities
            .get(&(command.to_string(), user_id))
            .map(|entity| entity.release(scope_id))
            .unwrap_or(false);

        if removed {
            tracing::debug!(command, user_id, scope_id, "Cooldown released");
            self.fire(InterceptorPosition::Release, user_id, scope_id, command);
        }

        removed
    }

    /// Clear a scope only while it still holds the window that started at
    /// `window_started_millis`. A newer window opened after that one expired
    /// is left untouched.
    pub fn release_window(&self, user_id: i64, scope_id: i64, command: &str, window_started_millis: i64) -> bool {
        let removed = self
            .entities
            .get(&(command.to_string(), user_id))
            .map(|entity| entity.release_window(scope_id, window_started_millis))
            .unwrap_or(false);

        if removed {
            tracing::debug!(command, user_id, scope_id, "Cooldown window released");
            self.fire(InterceptorPosition::Release, user_id, scope_id, command);
        } else {
            tracing::trace!(command, user_id, scope_id, "Stale cooldown release skipped");
        }

        removed
    }

    /// Whether a scope currently holds a cooldown record.
    ///
    /// Creates the (command, user) entity as a side effect, so a pair that
    /// was only ever queried still counts as seen.
    pub fn is_rate_limited(&self, user_id: i64, scope_id: i64, command: &str) -> bool {
        self.entity(command, user_id).is_cooling_down(scope_id)
    }

    /// Entity for a pair, if one was ever created.
    pub fn entity_for(&self, command: &str, user_id: i64) -> Option<Arc<RateLimitEntity>> {
        self.entities
            .get(&(command.to_string(), user_id))
            .map(|e| e.value().clone())
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn entity(&self, command: &str, user_id: i64) -> Arc<RateLimitEntity> {
        self.entities
            .entry((command.to_string(), user_id))
            .or_insert_with(|| Arc::new(RateLimitEntity::new(command.to_string(), user_id)))
            .value()
            .clone()
    }

    fn fire(&self, position: InterceptorPosition, user_id: i64, scope_id: i64, command: &str) {
        metrics::record_ratelimit_event(position.as_str());

        let interceptors: Vec<Interceptor> = match self.interceptors.read().get(&position) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return,
        };

        let snapshot = RateLimitSnapshot {
            user_id,
            scope_id,
            command: command.to_string(),
        };

        for interceptor in interceptors {
            let snapshot = snapshot.clone();
            self.pool.spawn(async move {
                interceptor(snapshot);
            });
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("entities", &self.entities.len())
            .field("default_cooldown", &self.default_cooldown)
            .finish()
    }
}

/// Whole seconds left in a window, rounded up. Zero or less means expired.
fn remaining_seconds(timestamp_millis: i64, cooldown_millis: i64, now_millis: i64) -> i64 {
    let remaining_ms = timestamp_millis.saturating_add(cooldown_millis) - now_millis;
    if remaining_ms <= 0 {
        0
    } else {
        (remaining_ms + 999) / 1000
    }
}
