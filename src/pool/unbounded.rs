//! Unbounded general-purpose pool for ordinary OS hosts.
//!
//! Fixed workers over one FIFO queue with no capacity limit and no core
//! pinning: submissions are rejected only once shutdown has been
//! requested, never for backpressure.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::pool::task::{Affinity, Runnable, Task, Weight};
use crate::pool::{deadline_after, WorkerPool};

/// Worker pool with a fixed number of persistent workers draining one
/// unbounded FIFO queue.
pub struct UnboundedPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<State>,
    task_ready: Condvar,
    all_done: Condvar,
    draining: AtomicBool,
    discarding: AtomicBool,
}

struct State {
    queue: VecDeque<Task>,
    running: usize,
}

impl Shared {
    fn shutdown_requested(&self) -> bool {
        self.draining.load(Ordering::Acquire) || self.discarding.load(Ordering::Acquire)
    }
}

struct RunningGuard<'a> {
    shared: &'a Shared,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.running -= 1;
        if state.queue.is_empty() && state.running == 0 {
            self.shared.all_done.notify_all();
        }
    }
}

impl UnboundedPool {
    /// Validate `config` and spawn the persistent workers.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                running: 0,
            }),
            task_ready: Condvar::new(),
            all_done: Condvar::new(),
            draining: AtomicBool::new(false),
            discarding: AtomicBool::new(false),
        });

        let width = config.worker_threads();
        let mut pool = Self {
            shared: shared.clone(),
            workers: Vec::with_capacity(width),
        };
        for i in 0..width {
            let mut builder =
                thread::Builder::new().name(format!("{}-{i}", config.thread_name_prefix));
            if let Some(stack) = config.stack_size {
                builder = builder.stack_size(stack);
            }
            let shared = shared.clone();
            // On failure the partially built pool drops, which shuts the
            // spawned workers down and joins them.
            let handle = builder.spawn(move || worker_loop(&shared, i))?;
            pool.workers.push(handle);
        }
        Ok(pool)
    }
}

impl WorkerPool for UnboundedPool {
    fn submit(&self, task: Task) -> bool {
        let mut state = self.shared.state.lock();
        if self.shared.shutdown_requested() {
            debug!(task = ?task.id(), "submission rejected: shutting down");
            return false;
        }
        state.queue.push_back(task);
        drop(state);
        self.shared.task_ready.notify_one();
        true
    }

    /// Hints are accepted and ignored on this variant.
    fn execute(&self, runnable: Arc<dyn Runnable>, _affinity: Affinity, _weight: Weight) -> bool {
        self.submit(Task::from_runnable(runnable))
    }

    fn shutdown(&self) {
        let first = {
            let _state = self.shared.state.lock();
            !self.shared.draining.swap(true, Ordering::AcqRel)
        };
        if first {
            info!("shutdown requested, draining queue");
        }
        self.shared.task_ready.notify_all();
    }

    fn shutdown_now(&self) {
        let (first, discarded) = {
            let mut state = self.shared.state.lock();
            self.shared.draining.store(true, Ordering::Release);
            let first = !self.shared.discarding.swap(true, Ordering::AcqRel);
            (first, std::mem::take(&mut state.queue))
        };
        self.shared.task_ready.notify_all();
        self.shared.all_done.notify_all();

        if first {
            info!(discarded = discarded.len(), "forced shutdown, discarding queue");
        }
        // Discarded tasks are destroyed before this call returns; none of
        // them runs.
        drop(discarded);
    }

    fn wait_for_completion(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        let mut state = self.shared.state.lock();
        loop {
            if state.queue.is_empty() && state.running == 0 {
                return true;
            }
            match deadline {
                None => self.shared.all_done.wait(&mut state),
                Some(deadline) => {
                    if self
                        .shared
                        .all_done
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        return state.queue.is_empty() && state.running == 0;
                    }
                }
            }
        }
    }

    fn pool_size(&self) -> usize {
        self.workers.len()
    }

    fn pending_count(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    fn is_shutdown(&self) -> bool {
        self.shared.shutdown_requested()
    }
}

impl std::fmt::Debug for UnboundedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnboundedPool")
            .field("pool_size", &self.workers.len())
            .field("pending", &self.pending_count())
            .field("is_shutdown", &self.is_shutdown())
            .finish()
    }
}

impl Drop for UnboundedPool {
    fn drop(&mut self) {
        self.shutdown();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: &Shared, index: usize) {
    debug!(worker = index, "worker started");
    loop {
        let task = {
            let mut state = shared.state.lock();
            loop {
                if shared.discarding.load(Ordering::Acquire) {
                    debug!(worker = index, "worker exiting: forced shutdown");
                    return;
                }
                if shared.draining.load(Ordering::Acquire) && state.queue.is_empty() {
                    debug!(worker = index, "worker exiting: queue drained");
                    return;
                }
                if let Some(task) = state.queue.pop_front() {
                    state.running += 1;
                    break task;
                }
                shared.task_ready.wait(&mut state);
            }
        };

        let _guard = RunningGuard { shared };
        task.run_isolated();
    }
}
