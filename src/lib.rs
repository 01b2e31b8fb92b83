//! taskwell - interchangeable worker pools behind one contract
//!
//! A family of worker-pool engines that accept deferred units of work and
//! run them concurrently under different runtime constraints: a
//! spawn-per-task pool for hosts without persistent execution contexts, a
//! bounded single-queue pool with backpressure, a dual-queue pool whose
//! system and application domains pin to dedicated cores, and an unbounded
//! general-purpose pool. All four implement the same [`WorkerPool`]
//! contract; which one a deployment gets is a configuration value, not a
//! compile-time choice.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use taskwell::{Config, PoolKind, Task};
//!
//! let config = Config::builder()
//!     .kind(PoolKind::Bounded)
//!     .num_threads(4)
//!     .queue_capacity(256)
//!     .build()?;
//! let pool = taskwell::build(config)?;
//!
//! for i in 0..8 {
//!     assert!(pool.submit(Task::new(move || {
//!         println!("task {i} ran");
//!     })));
//! }
//!
//! assert!(pool.wait_for_completion(Duration::ZERO));
//! pool.shutdown();
//! # Ok::<(), taskwell::Error>(())
//! ```
//!
//! # Features
//!
//! - **Four engines, one contract**: spawn-per-task, bounded, core-affine
//!   dual-queue, and unbounded pools behind [`WorkerPool`]
//! - **Bounded backpressure**: full queues reject instead of blocking
//! - **Dual shutdown semantics**: graceful drain or immediate discard
//! - **Timed completion waits**: deadline-based idle detection
//! - **Panic isolation**: a failing task never takes its worker down
//! - **Core affinity**: optional physical pinning of worker threads

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod pool;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder, PoolKind};
pub use error::{Error, Result};
pub use pool::{
    build, Affinity, AffinePool, BoundedPool, Runnable, SpawnPool, Task, TaskId, UnboundedPool,
    Weight, WorkerPool,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_end_to_end_through_trait_object() {
        let kinds = [
            PoolKind::SpawnPerTask,
            PoolKind::Bounded,
            PoolKind::CoreAffine,
            PoolKind::Unbounded,
        ];
        for kind in kinds {
            let config = Config::builder().kind(kind).num_threads(2).build().unwrap();
            let pool = build(config).unwrap();

            let count = Arc::new(AtomicUsize::new(0));
            for _ in 0..10 {
                let count = count.clone();
                assert!(pool.submit(Task::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })));
            }

            assert!(pool.wait_for_completion(Duration::ZERO));
            assert_eq!(count.load(Ordering::SeqCst), 10, "{kind:?}");

            pool.shutdown();
            assert!(pool.is_shutdown());
            assert!(!pool.submit(Task::new(|| {})));
        }
    }

    #[test]
    fn test_runnable_contract_through_trait_object() {
        struct Job(AtomicUsize);
        impl Runnable for Job {
            fn run(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let pool = build(Config::default()).unwrap();
        let job = Arc::new(Job(AtomicUsize::new(0)));
        assert!(pool.execute(job.clone(), Affinity::Application, Weight::Heavy));
        assert!(pool.wait_for_completion(Duration::from_secs(10)));
        assert_eq!(job.0.load(Ordering::SeqCst), 1);
    }
}
