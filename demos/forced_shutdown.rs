//! Forced shutdown walk-through: queued work is discarded, in-flight work
//! finishes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use taskwell::{Config, PoolKind, Task};
use tracing::info;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();
    info!("--- Forced Shutdown Example ---");

    let config = Config::builder()
        .kind(PoolKind::Bounded)
        .num_threads(1)
        .queue_capacity(16)
        .build()
        .expect("valid config");
    let pool = taskwell::build(config).expect("pool construction");

    let finished = Arc::new(AtomicUsize::new(0));

    // One worker: task 0 starts, tasks 1..5 queue behind it.
    for i in 0..5 {
        let finished = finished.clone();
        let accepted = pool.submit(Task::new(move || {
            info!("task {i} starting");
            thread::sleep(Duration::from_millis(500));
            info!("task {i} finished");
            finished.fetch_add(1, Ordering::SeqCst);
        }));
        info!("submitted task {i}: accepted={accepted}");
    }

    // Give the worker a moment to pick up task 0.
    thread::sleep(Duration::from_millis(100));
    info!(pending = pool.pending_count(), "initiating forced shutdown");
    pool.shutdown_now();
    info!(pending = pool.pending_count(), "queued tasks discarded");

    let idle = pool.wait_for_completion(Duration::from_secs(10));
    info!(
        idle,
        finished = finished.load(Ordering::SeqCst),
        "forced shutdown complete: only the in-flight task ran"
    );
}
