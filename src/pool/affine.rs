//! Core-affine pool: two worker sets, one per affinity domain.
//!
//! System and application tasks get their own queue and their own workers,
//! optionally pinned to `Config::system_core` and
//! `Config::application_core`. A task routed to one domain never runs on
//! the other domain's workers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::pool::task::{Affinity, Runnable, Task, Weight};
use crate::pool::worker_set::{Pinning, WorkerSet};
use crate::pool::{deadline_after, WorkerPool};

/// Worker pool with two independent bounded domains, system and
/// application, each a fixed set of workers over its own FIFO.
pub struct AffinePool {
    system: WorkerSet,
    application: WorkerSet,
}

impl AffinePool {
    /// Validate `config`, split the width across the domains, and spawn
    /// both worker sets.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        // The system domain takes the odd worker; both domains always get
        // at least one.
        let total = config.worker_threads();
        let system_width = (total - total / 2).max(1);
        let application_width = (total / 2).max(1);

        let (pin_system, pin_application) = if config.pin_workers {
            (
                Pinning::Core(config.system_core),
                Pinning::Core(config.application_core),
            )
        } else {
            (Pinning::None, Pinning::None)
        };

        let mut system = WorkerSet::new(
            Affinity::System.label(),
            system_width,
            config.queue_capacity,
            pin_system,
            config.stack_size,
            &config.thread_name_prefix,
        )?;
        let application = match WorkerSet::new(
            Affinity::Application.label(),
            application_width,
            config.queue_capacity,
            pin_application,
            config.stack_size,
            &config.thread_name_prefix,
        ) {
            Ok(set) => set,
            Err(e) => {
                // Unwind the half-built pool so no system worker leaks.
                system.shutdown_now();
                system.close();
                return Err(e);
            }
        };

        Ok(Self {
            system,
            application,
        })
    }

    fn domain(&self, affinity: Affinity) -> &WorkerSet {
        match affinity {
            Affinity::System => &self.system,
            Affinity::Application => &self.application,
        }
    }
}

impl WorkerPool for AffinePool {
    fn submit(&self, task: Task) -> bool {
        self.domain(Affinity::default()).push(task)
    }

    fn execute(&self, runnable: Arc<dyn Runnable>, affinity: Affinity, _weight: Weight) -> bool {
        self.domain(affinity).push(Task::from_runnable(runnable))
    }

    fn shutdown(&self) {
        self.system.shutdown();
        self.application.shutdown();
    }

    fn shutdown_now(&self) {
        self.system.shutdown_now();
        self.application.shutdown_now();
    }

    /// Both domains must be idle within the one deadline. Domains are
    /// checked in sequence, each under its own lock, looping until one
    /// pass observes both idle: a submission racing this wait can land in
    /// the first domain while the second is still draining.
    fn wait_for_completion(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        loop {
            if !self.system.wait_idle(deadline) {
                return false;
            }
            if !self.application.wait_idle(deadline) {
                return false;
            }
            if self.system.is_idle() && self.application.is_idle() {
                return true;
            }
        }
    }

    fn pool_size(&self) -> usize {
        self.system.width() + self.application.width()
    }

    fn pending_count(&self) -> usize {
        self.system.pending() + self.application.pending()
    }

    fn is_shutdown(&self) -> bool {
        self.system.is_shutdown() || self.application.is_shutdown()
    }
}

impl std::fmt::Debug for AffinePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffinePool")
            .field("system_workers", &self.system.width())
            .field("application_workers", &self.application.width())
            .field("pending", &self.pending_count())
            .field("is_shutdown", &self.is_shutdown())
            .finish()
    }
}

impl Drop for AffinePool {
    fn drop(&mut self) {
        self.system.shutdown();
        self.application.shutdown();
        self.system.close();
        self.application.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn pool(threads: usize) -> AffinePool {
        let config = Config::builder().num_threads(threads).build().unwrap();
        AffinePool::new(&config).unwrap()
    }

    struct DomainProbe {
        expected: &'static str,
        hits: AtomicUsize,
        misroutes: AtomicUsize,
    }

    impl DomainProbe {
        fn new(expected: &'static str) -> Self {
            Self {
                expected,
                hits: AtomicUsize::new(0),
                misroutes: AtomicUsize::new(0),
            }
        }
    }

    impl Runnable for DomainProbe {
        fn run(&self) {
            let on_expected = thread::current()
                .name()
                .is_some_and(|name| name.contains(self.expected));
            if on_expected {
                self.hits.fetch_add(1, Ordering::SeqCst);
            } else {
                self.misroutes.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_width_split_covers_both_domains() {
        let pool = pool(5);
        assert_eq!(pool.pool_size(), 5);
        assert_eq!(pool.system.width(), 3);
        assert_eq!(pool.application.width(), 2);

        // A single configured thread still yields one worker per domain.
        let pool = self::pool(1);
        assert_eq!(pool.pool_size(), 2);
    }

    #[test]
    fn test_tasks_stay_in_their_domain() {
        let pool = pool(4);
        let sys = Arc::new(DomainProbe::new("-sys-"));
        let app = Arc::new(DomainProbe::new("-app-"));

        for _ in 0..16 {
            assert!(pool.execute(sys.clone(), Affinity::System, Weight::Light));
            assert!(pool.execute(app.clone(), Affinity::Application, Weight::Light));
        }
        assert!(pool.wait_for_completion(Duration::ZERO));

        assert_eq!(sys.hits.load(Ordering::SeqCst), 16);
        assert_eq!(sys.misroutes.load(Ordering::SeqCst), 0);
        assert_eq!(app.hits.load(Ordering::SeqCst), 16);
        assert_eq!(app.misroutes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pending_sums_domains() {
        struct Blocker {
            gate: Arc<AtomicUsize>,
        }
        impl Runnable for Blocker {
            fn run(&self) {
                while self.gate.load(Ordering::SeqCst) == 0 {
                    thread::yield_now();
                }
            }
        }
        struct Noop;
        impl Runnable for Noop {
            fn run(&self) {}
        }

        // One worker per domain; park both on blockers and pile submissions
        // behind them.
        let pool = pool(2);
        let gate = Arc::new(AtomicUsize::new(0));
        for affinity in [Affinity::System, Affinity::Application] {
            let blocker = Arc::new(Blocker { gate: gate.clone() });
            assert!(pool.execute(blocker, affinity, Weight::Light));
        }
        // Once nothing is pending, both blockers were dequeued and each
        // domain's only worker is occupied.
        while pool.pending_count() > 0 {
            thread::yield_now();
        }

        assert!(pool.execute(Arc::new(Noop), Affinity::System, Weight::Light));
        assert!(pool.execute(Arc::new(Noop), Affinity::Application, Weight::Light));
        assert_eq!(pool.pending_count(), 2);

        gate.store(1, Ordering::SeqCst);
        assert!(pool.wait_for_completion(Duration::ZERO));
        assert_eq!(pool.pending_count(), 0);
    }
}
