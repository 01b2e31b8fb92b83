//! Bounded FIFO work queue with a fixed set of persistent consumers.
//!
//! A `WorkerSet` is one affinity domain: a capacity-bounded queue, the
//! worker threads draining it, and the shutdown and completion machinery.
//! The bounded pool owns a single set; the core-affine pool composes two
//! side by side.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pool::task::Task;

/// How a set's workers are bound to cores.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Pinning {
    /// Leave placement to the OS scheduler.
    None,
    /// Pin every worker in the set to one core.
    Core(usize),
    /// Spread workers across the available cores, one per worker in turn.
    RoundRobin,
}

pub(crate) struct WorkerSet {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    width: usize,
}

struct Shared {
    /// Domain label; appears in worker thread names and logs.
    label: &'static str,
    /// Queue bound; push is rejected while the queue holds this many tasks.
    capacity: usize,
    state: Mutex<State>,
    /// Work-available signal. Advisory only: consumers re-validate the
    /// guarded condition after every wake.
    task_ready: Condvar,
    /// Raised whenever the queue is empty and nothing is running.
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

impl WorkerSet {
    pub(crate) fn new(
        label: &'static str,
        width: usize,
        capacity: usize,
        pinning: Pinning,
        stack_size: Option<usize>,
        name_prefix: &str,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            label,
            capacity,
            state: Mutex::new(State {
                queue: VecDeque::new(),
                running: 0,
            }),
            task_ready: Condvar::new(),
            all_done: Condvar::new(),
            draining: AtomicBool::new(false),
            discarding: AtomicBool::new(false),
        });

        let cores = match pinning {
            Pinning::RoundRobin => core_affinity::get_core_ids().unwrap_or_default(),
            _ => Vec::new(),
        };

        let mut set = Self {
            shared: shared.clone(),
            workers: Vec::with_capacity(width),
            width,
        };

        for i in 0..width {
            let mut builder = thread::Builder::new().name(format!("{name_prefix}-{label}-{i}"));
            if let Some(stack) = stack_size {
                builder = builder.stack_size(stack);
            }

            let core = match pinning {
                Pinning::None => None,
                Pinning::Core(id) => Some(id),
                Pinning::RoundRobin if cores.is_empty() => None,
                Pinning::RoundRobin => Some(cores[i % cores.len()].id),
            };

            let shared = shared.clone();
            let spawned = builder.spawn(move || {
                if let Some(core) = core {
                    pin_current_thread(core, shared.label);
                }
                worker_loop(&shared);
            });

            match spawned {
                Ok(handle) => set.workers.push(handle),
                Err(e) => {
                    // Unwind the partially built set before surfacing the
                    // failure so no worker is left parked forever.
                    set.shutdown_now();
                    set.close();
                    return Err(e.into());
                }
            }
        }

        Ok(set)
    }

    /// Enqueue a task, transferring ownership to the set. Rejected once
    /// shutdown has been requested or while the queue is at capacity.
    pub(crate) fn push(&self, task: Task) -> bool {
        let mut state = self.shared.state.lock();
        if self.shared.shutdown_requested() {
            debug!(domain = self.shared.label, task = ?task.id(), "submission rejected: shutting down");
            return false;
        }
        if state.queue.len() == self.shared.capacity {
            debug!(domain = self.shared.label, task = ?task.id(), "submission rejected: queue at capacity");
            return false;
        }
        state.queue.push_back(task);
        drop(state);
        self.shared.task_ready.notify_one();
        true
    }

    /// Stop admissions and let the queue drain. Idempotent.
    pub(crate) fn shutdown(&self) {
        let first = {
            // Flag transitions happen under the lock so a worker can never
            // check the flags, decide to wait, and miss the wake-up.
            let _state = self.shared.state.lock();
            !self.shared.draining.swap(true, Ordering::AcqRel)
        };
        if first {
            info!(domain = self.shared.label, "shutdown requested, draining queue");
        }
        self.shared.task_ready.notify_all();
    }

    /// Stop admissions and discard everything queued. Idempotent.
    pub(crate) fn shutdown_now(&self) {
        let (first, discarded) = {
            let mut state = self.shared.state.lock();
            self.shared.draining.store(true, Ordering::Release);
            let first = !self.shared.discarding.swap(true, Ordering::AcqRel);
            (first, std::mem::take(&mut state.queue))
        };
        self.shared.task_ready.notify_all();
        self.shared.all_done.notify_all();

        if first {
            info!(
                domain = self.shared.label,
                discarded = discarded.len(),
                "forced shutdown, discarding queue"
            );
        }
        // Discarded tasks are destroyed here, before the shutdown call
        // returns, and are never executed.
        drop(discarded);
    }

    /// Block until the set is idle (queue empty, nothing running) or the
    /// deadline passes. `None` waits unboundedly.
    pub(crate) fn wait_idle(&self, deadline: Option<Instant>) -> bool {
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

    pub(crate) fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.queue.is_empty() && state.running == 0
    }

    pub(crate) fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shared.shutdown_requested()
    }

    /// Join every worker. Callers must have requested shutdown first;
    /// joining blocks until each worker has observed it and exited.
    pub(crate) fn close(&mut self) {
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Settles the running count when a dequeued task finishes, on every exit
/// path, and raises the all-done signal at the idle point.
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

fn worker_loop(shared: &Shared) {
    debug!(domain = shared.label, "worker started");
    loop {
        let task = {
            let mut state = shared.state.lock();
            loop {
                // Forced shutdown pre-empts a drain already in progress.
                if shared.discarding.load(Ordering::Acquire) {
                    debug!(domain = shared.label, "worker exiting: forced shutdown");
                    return;
                }
                if shared.draining.load(Ordering::Acquire) && state.queue.is_empty() {
                    debug!(domain = shared.label, "worker exiting: queue drained");
                    return;
                }
                if let Some(task) = state.queue.pop_front() {
                    state.running += 1;
                    break task;
                }
                shared.task_ready.wait(&mut state);
            }
        };

        // The task body runs with the lock released so a slow task never
        // blocks admissions or the other workers.
        let _guard = RunningGuard { shared };
        task.run_isolated();
    }
}

pub(crate) fn pin_current_thread(core: usize, label: &str) {
    if !core_affinity::set_for_current(core_affinity::CoreId { id: core }) {
        warn!(core, domain = label, "failed to pin worker to core");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_set(width: usize, capacity: usize) -> WorkerSet {
        WorkerSet::new("test", width, capacity, Pinning::None, None, "worker-set").unwrap()
    }

    #[test]
    fn test_runs_pushed_tasks() {
        let mut set = test_set(2, 16);
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let count = count.clone();
            assert!(set.push(Task::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })));
        }
        assert!(set.wait_idle(None));
        assert_eq!(count.load(Ordering::SeqCst), 8);
        set.shutdown();
        set.close();
    }

    #[test]
    fn test_rejects_at_capacity() {
        // No workers: pushes accumulate until the bound trips.
        let mut set = test_set(0, 2);
        assert!(set.push(Task::new(|| {})));
        assert!(set.push(Task::new(|| {})));
        assert!(!set.push(Task::new(|| {})));
        assert_eq!(set.pending(), 2);
        set.shutdown_now();
        set.close();
    }

    #[test]
    fn test_forced_shutdown_discards_queue() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut set = test_set(0, 8);
        for _ in 0..4 {
            let count = count.clone();
            set.push(Task::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }
        set.shutdown_now();
        assert_eq!(set.pending(), 0);
        assert!(set.wait_idle(Some(Instant::now() + Duration::from_secs(1))));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        set.close();
    }

    #[test]
    fn test_panicking_task_does_not_kill_worker() {
        let mut set = test_set(1, 8);
        assert!(set.push(Task::new(|| panic!("boom"))));
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        assert!(set.push(Task::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })));
        assert!(set.wait_idle(None));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        set.shutdown();
        set.close();
    }
}
