//! The worker-pool contract and the four interchangeable engines.
//!
//! Every variant implements [`WorkerPool`]; which one a deployment gets is
//! decided at construction time by [`Config::kind`](crate::PoolKind), never
//! at compile time. [`build`] is the usual entry point.

pub mod task;

mod affine;
mod bounded;
mod spawn;
mod unbounded;
mod worker_set;

pub use affine::AffinePool;
pub use bounded::BoundedPool;
pub use spawn::SpawnPool;
pub use task::{Affinity, Runnable, Task, TaskId, Weight};
pub use unbounded::UnboundedPool;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Config, PoolKind};
use crate::error::Result;

/// Common contract implemented by every pool variant.
///
/// Admission is boolean: a rejected submission (pool shutting down, bounded
/// queue at capacity, thread creation failure) returns `false` and has no
/// other effect. Rejection is not an error and nothing here retries;
/// whether to retry, drop, or escalate is the caller's policy.
///
/// Both shutdown operations are idempotent and permanent. A draining pool
/// can still be escalated to a forced shutdown; nothing un-shuts a pool.
///
/// None of these operations can fail for synchronization reasons: the locks
/// in every variant are not poisoned by a panicking task, and task bodies
/// never run while pool state is locked.
pub trait WorkerPool: Send + Sync {
    /// Transfer `task` into the pool. Returns `true` if the pool accepted
    /// responsibility for running it.
    #[must_use]
    fn submit(&self, task: Task) -> bool;

    /// Submit a shared runnable with placement hints. Variants without
    /// affinity domains or per-task stacks accept and ignore the hints.
    ///
    /// [`submit`](WorkerPool::submit) is equivalent to this with
    /// [`Affinity::System`] and [`Weight::Light`].
    #[must_use]
    fn execute(&self, runnable: Arc<dyn Runnable>, affinity: Affinity, weight: Weight) -> bool;

    /// Stop admitting work; everything already accepted still runs.
    fn shutdown(&self);

    /// Stop admitting work and discard everything still queued. Tasks
    /// already executing run to completion; discarded tasks are destroyed
    /// before this call returns.
    fn shutdown_now(&self);

    /// Block until the pool is idle: no task queued and none executing.
    ///
    /// `Duration::ZERO` waits unboundedly. Returns `false` only when the
    /// timeout elapses first; a shutdown request alone never fails the
    /// wait.
    fn wait_for_completion(&self, timeout: Duration) -> bool;

    /// Number of persistent workers. 0 means unbounded: the spawn-per-task
    /// variant has no fixed worker set.
    fn pool_size(&self) -> usize;

    /// Tasks accepted but not yet started. Excludes tasks currently
    /// executing.
    fn pending_count(&self) -> usize;

    /// Whether either shutdown has been requested. Lock-free.
    fn is_shutdown(&self) -> bool;

    /// Whether the pool is still admitting work. Lock-free.
    fn is_running(&self) -> bool {
        !self.is_shutdown()
    }
}

/// Build the pool variant selected by [`Config::kind`](PoolKind).
///
/// ```
/// use std::time::Duration;
/// use taskwell::{build, Config, PoolKind, Task};
///
/// let config = Config::builder()
///     .kind(PoolKind::Bounded)
///     .num_threads(2)
///     .build()?;
/// let pool = build(config)?;
///
/// assert!(pool.submit(Task::new(|| println!("deferred"))));
/// pool.shutdown();
/// assert!(pool.wait_for_completion(Duration::ZERO));
/// # Ok::<(), taskwell::Error>(())
/// ```
pub fn build(config: Config) -> Result<Box<dyn WorkerPool>> {
    config.validate()?;
    let pool: Box<dyn WorkerPool> = match config.kind {
        PoolKind::SpawnPerTask => Box::new(SpawnPool::new(&config)?),
        PoolKind::Bounded => Box::new(BoundedPool::new(&config)?),
        PoolKind::CoreAffine => Box::new(AffinePool::new(&config)?),
        PoolKind::Unbounded => Box::new(UnboundedPool::new(&config)?),
    };
    Ok(pool)
}

/// Deadline for a completion wait; `Duration::ZERO`, or a timeout too
/// large to represent as an `Instant`, means no deadline.
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    if timeout == Duration::ZERO {
        return None;
    }
    // A deadline that cannot be represented cannot expire either.
    Instant::now().checked_add(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dispatches_on_kind() {
        for (kind, size) in [
            (PoolKind::SpawnPerTask, 0),
            (PoolKind::Bounded, 2),
            (PoolKind::CoreAffine, 2),
            (PoolKind::Unbounded, 2),
        ] {
            let config = Config::builder().kind(kind).num_threads(2).build().unwrap();
            let pool = build(config).unwrap();
            assert_eq!(pool.pool_size(), size, "{kind:?}");
            assert!(pool.is_running());
        }
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        assert!(deadline_after(Duration::ZERO).is_none());
        assert!(deadline_after(Duration::from_millis(1)).is_some());
    }

    #[test]
    fn test_unrepresentable_deadline_means_unbounded() {
        assert!(deadline_after(Duration::MAX).is_none());
    }
}
