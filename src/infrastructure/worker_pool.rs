//! Worker Pool
//!
//! Owned execution resource for dispatches, afterwares, interceptors and
//! delayed releases. Intake never waits on a running handler: tasks are
//! spawned immediately and queue on a semaphore for a concurrency slot.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;

use crate::shared::error::{FrameworkError, FrameworkResult};

struct PoolInner {
    handle: Handle,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
    closed: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Bounded task pool backed by a tokio runtime.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("max_concurrency", &self.inner.max_concurrency)
            .field("in_flight", &self.in_flight())
            .field("closed", &self.is_shut_down())
            .finish()
    }
}

/// Decrements the in-flight counter even when the task panics.
struct InFlightGuard(Arc<PoolInner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl WorkerPool {
    pub fn new(handle: Handle, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            inner: Arc::new(PoolInner {
                handle,
                permits: Arc::new(Semaphore::new(max_concurrency)),
                max_concurrency,
                closed: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Build a pool on the runtime the caller is running in.
    pub fn from_current(max_concurrency: usize) -> FrameworkResult<Self> {
        let handle = Handle::try_current().map_err(|e| FrameworkError::MissingRuntime(e.to_string()))?;
        Ok(Self::new(handle, max_concurrency))
    }

    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    /// Tasks spawned and not yet finished, including those waiting for a slot.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Run a task once a concurrency slot frees up.
    ///
    /// Returns `None` once the pool has been shut down.
    pub fn spawn<F>(&self, task: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_shut_down() {
            tracing::debug!("Worker pool is shut down, dropping task");
            return None;
        }

        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlightGuard(self.inner.clone());
        let permits = self.inner.permits.clone();

        Some(self.inner.handle.spawn(async move {
            let _guard = guard;
            let _permit = permits.acquire_owned().await.ok();
            task.await;
        }))
    }

    /// Run a task after `delay`. Timers are not cancellable once armed and are
    /// not awaited by [`shutdown`](Self::shutdown).
    pub fn schedule<F>(&self, delay: Duration, task: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_shut_down() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Worker pool is shut down, dropping timer");
            return None;
        }

        Some(self.inner.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }))
    }

    /// Stop accepting work and wait for spawned tasks to finish.
    pub async fn shutdown(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(in_flight = self.in_flight(), "Shutting down worker pool");
        }

        loop {
            let idle = self.inner.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            if self.in_flight() == 0 {
                break;
            }
            idle.await;
        }

        tracing::info!("Worker pool drained");
    }
}
