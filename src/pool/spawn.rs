//! Spawn-per-task pool: one ephemeral thread per accepted submission.
//!
//! The shape of the variant for hosts that give no persistent execution
//! contexts: no queue, no workers to keep fed, just an in-flight count and
//! a signal for whoever is waiting on it to reach zero.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::pool::task::{Affinity, Runnable, Task, Weight};
use crate::pool::worker_set::pin_current_thread;
use crate::pool::{deadline_after, WorkerPool};

/// Worker pool that spawns a dedicated thread for every accepted task.
///
/// Concurrency is unbounded (host resources aside), so
/// [`pool_size`](WorkerPool::pool_size) reports 0 and
/// [`pending_count`](WorkerPool::pending_count) is always 0: nothing is
/// ever queued, a task is either running or rejected.
pub struct SpawnPool {
    shared: Arc<Shared>,
    pin_workers: bool,
    system_core: usize,
    application_core: usize,
    stack_size: Option<usize>,
    heavy_stack_size: Option<usize>,
    name_prefix: String,
}

struct Shared {
    /// Tasks accepted and not yet finished.
    in_flight: Mutex<usize>,
    all_done: Condvar,
    draining: AtomicBool,
    discarding: AtomicBool,
}

impl Shared {
    fn shutdown_requested(&self) -> bool {
        self.draining.load(Ordering::Acquire) || self.discarding.load(Ordering::Acquire)
    }
}

/// Settles the in-flight count when an ephemeral thread finishes, on every
/// exit path.
struct InFlightGuard {
    shared: Arc<Shared>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.shared.in_flight.lock();
        *in_flight -= 1;
        if *in_flight == 0 {
            self.shared.all_done.notify_all();
        }
    }
}

impl SpawnPool {
    /// Validate `config`; threads are only created per accepted task.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                in_flight: Mutex::new(0),
                all_done: Condvar::new(),
                draining: AtomicBool::new(false),
                discarding: AtomicBool::new(false),
            }),
            pin_workers: config.pin_workers,
            system_core: config.system_core,
            application_core: config.application_core,
            stack_size: config.stack_size,
            heavy_stack_size: config.heavy_stack_size,
            name_prefix: config.thread_name_prefix.clone(),
        })
    }

    fn launch(&self, task: Task, affinity: Affinity, weight: Weight) -> bool {
        // Count first: the task is visible to completion waiters before its
        // thread exists, so a wait that starts now cannot miss it. A failed
        // spawn rolls the increment back, leaving no trace.
        {
            let mut in_flight = self.shared.in_flight.lock();
            if self.shared.shutdown_requested() {
                debug!(task = ?task.id(), "submission rejected: shutting down");
                return false;
            }
            *in_flight += 1;
        }

        let core = if self.pin_workers {
            Some(match affinity {
                Affinity::System => self.system_core,
                Affinity::Application => self.application_core,
            })
        } else {
            None
        };
        let stack = match weight {
            Weight::Light => self.stack_size,
            Weight::Heavy => self.heavy_stack_size.or(self.stack_size),
        };

        let mut builder = thread::Builder::new()
            .name(format!("{}-task-{}", self.name_prefix, task.id()));
        if let Some(stack) = stack {
            builder = builder.stack_size(stack);
        }

        let label = affinity.label();
        let shared = self.shared.clone();
        let spawned = builder.spawn(move || {
            let _guard = InFlightGuard { shared };
            if let Some(core) = core {
                pin_current_thread(core, label);
            }
            task.run_isolated();
        });

        match spawned {
            Ok(_detached) => true,
            Err(e) => {
                let mut in_flight = self.shared.in_flight.lock();
                *in_flight -= 1;
                if *in_flight == 0 {
                    self.shared.all_done.notify_all();
                }
                drop(in_flight);
                warn!(error = %e, "failed to spawn task thread, submission rejected");
                false
            }
        }
    }
}

impl WorkerPool for SpawnPool {
    fn submit(&self, task: Task) -> bool {
        self.launch(task, Affinity::default(), Weight::default())
    }

    fn execute(&self, runnable: Arc<dyn Runnable>, affinity: Affinity, weight: Weight) -> bool {
        self.launch(Task::from_runnable(runnable), affinity, weight)
    }

    fn shutdown(&self) {
        let first = {
            let _in_flight = self.shared.in_flight.lock();
            !self.shared.draining.swap(true, Ordering::AcqRel)
        };
        if first {
            info!("shutdown requested, in-flight tasks run to completion");
        }
    }

    /// With no queue there is nothing to discard; this only stops
    /// admissions. Threads already spawned run to completion.
    fn shutdown_now(&self) {
        let first = {
            let _in_flight = self.shared.in_flight.lock();
            self.shared.draining.store(true, Ordering::Release);
            !self.shared.discarding.swap(true, Ordering::AcqRel)
        };
        if first {
            info!("forced shutdown, in-flight tasks run to completion");
        }
    }

    fn wait_for_completion(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        let mut in_flight = self.shared.in_flight.lock();
        loop {
            if *in_flight == 0 {
                return true;
            }
            match deadline {
                None => self.shared.all_done.wait(&mut in_flight),
                Some(deadline) => {
                    if self
                        .shared
                        .all_done
                        .wait_until(&mut in_flight, deadline)
                        .timed_out()
                    {
                        return *in_flight == 0;
                    }
                }
            }
        }
    }

    /// Always 0: this variant has no fixed set of workers, 0 here means
    /// unbounded.
    fn pool_size(&self) -> usize {
        0
    }

    /// Always 0: accepted tasks start immediately, nothing waits in a queue.
    fn pending_count(&self) -> usize {
        0
    }

    fn is_shutdown(&self) -> bool {
        self.shared.shutdown_requested()
    }
}

impl std::fmt::Debug for SpawnPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnPool")
            .field("in_flight", &*self.shared.in_flight.lock())
            .field("is_shutdown", &self.shared.shutdown_requested())
            .finish()
    }
}

impl Drop for SpawnPool {
    fn drop(&mut self) {
        // No task outlives its pool: wait for every in-flight thread.
        self.shutdown();
        self.wait_for_completion(Duration::ZERO);
    }
}
