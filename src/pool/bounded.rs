//! Bounded single-queue pool: fixed workers over one capacity-limited FIFO.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::pool::task::{Affinity, Runnable, Task, Weight};
use crate::pool::worker_set::{Pinning, WorkerSet};
use crate::pool::{deadline_after, WorkerPool};

/// Worker pool with a fixed number of persistent workers draining one
/// bounded FIFO queue.
///
/// The queue bound is the backpressure mechanism: a submission against a
/// full queue is rejected immediately rather than blocking the caller.
pub struct BoundedPool {
    set: WorkerSet,
}

impl BoundedPool {
    /// Validate `config` and spawn the workers.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let pinning = if config.pin_workers {
            Pinning::RoundRobin
        } else {
            Pinning::None
        };
        let set = WorkerSet::new(
            "worker",
            config.worker_threads(),
            config.queue_capacity,
            pinning,
            config.stack_size,
            &config.thread_name_prefix,
        )?;
        Ok(Self { set })
    }
}

impl WorkerPool for BoundedPool {
    fn submit(&self, task: Task) -> bool {
        self.set.push(task)
    }

    /// Hints are accepted and ignored: a single queue has no affinity
    /// domains, and worker stacks are sized once at construction.
    fn execute(&self, runnable: Arc<dyn Runnable>, _affinity: Affinity, _weight: Weight) -> bool {
        self.set.push(Task::from_runnable(runnable))
    }

    fn shutdown(&self) {
        self.set.shutdown();
    }

    fn shutdown_now(&self) {
        self.set.shutdown_now();
    }

    fn wait_for_completion(&self, timeout: Duration) -> bool {
        self.set.wait_idle(deadline_after(timeout))
    }

    fn pool_size(&self) -> usize {
        self.set.width()
    }

    fn pending_count(&self) -> usize {
        self.set.pending()
    }

    fn is_shutdown(&self) -> bool {
        self.set.is_shutdown()
    }
}

impl std::fmt::Debug for BoundedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedPool")
            .field("pool_size", &self.set.width())
            .field("pending", &self.set.pending())
            .field("is_shutdown", &self.set.is_shutdown())
            .finish()
    }
}

impl Drop for BoundedPool {
    fn drop(&mut self) {
        // Workers drain what is already queued, then exit and are joined.
        self.set.shutdown();
        self.set.close();
    }
}
