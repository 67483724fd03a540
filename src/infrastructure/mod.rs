//! Infrastructure Layer
//!
//! Runtime resources the services depend on:
//! - Worker pool (tokio) for dispatch, afterwares and timers
//! - Clock abstraction for cooldown arithmetic
//! - Prometheus metrics

pub mod clock;
pub mod metrics;
pub mod worker_pool;

pub use clock::{Clock, ManualClock, SystemClock};
pub use worker_pool::WorkerPool;
