//! Graceful shutdown walk-through: admissions stop, accepted work drains.

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
    info!("--- Graceful Shutdown Example ---");

    let config = Config::builder()
        .kind(PoolKind::Bounded)
        .num_threads(2)
        .queue_capacity(16)
        .build()
        .expect("valid config");
    let pool = taskwell::build(config).expect("pool construction");

    let finished = Arc::new(AtomicUsize::new(0));

    // Two workers: tasks 0 and 1 start, the rest queue behind them.
    for i in 0..5 {
        let finished = finished.clone();
        let accepted = pool.submit(Task::new(move || {
            info!("task {i} starting");
            thread::sleep(Duration::from_millis(300));
            info!("task {i} finished");
            finished.fetch_add(1, Ordering::SeqCst);
        }));
        info!("submitted task {i}: accepted={accepted}");
    }

    info!(pending = pool.pending_count(), "initiating graceful shutdown");
    pool.shutdown();

    let accepted = pool.submit(Task::new(|| info!("this never runs")));
    info!("post-shutdown submission: accepted={accepted}");

    let drained = pool.wait_for_completion(Duration::from_secs(10));
    info!(
        drained,
        finished = finished.load(Ordering::SeqCst),
        "graceful shutdown complete: every accepted task ran"
    );
}
