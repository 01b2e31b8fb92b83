//! Task representation and the execution boundary.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task, used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interface for a runnable unit of work supplied by a collaborator.
///
/// The pool only ever calls [`run`](Runnable::run); implementations live
/// outside this crate.
pub trait Runnable: Send + Sync {
    /// Execute the unit of work.
    fn run(&self);
}

/// Affinity domain a task or execution context is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affinity {
    /// The system domain, backed by `Config::system_core`.
    System,
    /// The application domain, backed by `Config::application_core`.
    Application,
}

impl Affinity {
    /// Short label used in worker thread names and logs.
    pub(crate) fn label(self) -> &'static str {
        match self {
            Affinity::System => "sys",
            Affinity::Application => "app",
        }
    }
}

impl Default for Affinity {
    fn default() -> Self {
        Affinity::System
    }
}

/// Stack-size hint for ephemeral execution contexts.
///
/// Persistent workers reserve their stacks at pool construction and ignore
/// this hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    /// Default stack reservation.
    Light,
    /// Enlarged stack reservation for heavy-duty tasks.
    Heavy,
}

impl Default for Weight {
    fn default() -> Self {
        Weight::Light
    }
}

/// A single deferred unit of work.
///
/// A task is owned and non-copyable: it is transferred into a pool exactly
/// once and from there either runs exactly once on some execution context or
/// is dropped unrun by a forced shutdown. Nothing else destroys or invokes
/// it.
pub struct Task {
    id: TaskId,
    func: Box<dyn FnOnce() + Send + 'static>,
}

impl Task {
    /// Create a task from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task {
            id: TaskId::next(),
            func: Box::new(f),
        }
    }

    /// Create a task that calls `run()` on a shared runnable once.
    pub fn from_runnable(runnable: Arc<dyn Runnable>) -> Self {
        Self::new(move || runnable.run())
    }

    /// The task's unique identifier.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Consume the task and run its body, containing any panic it raises.
    ///
    /// This is the execution boundary: a panicking task is logged and
    /// discarded so it can never take a worker down with it. Callers must
    /// not hold any pool lock here.
    pub(crate) fn run_isolated(self) {
        let id = self.id;
        let result = catch_unwind(AssertUnwindSafe(self.func));
        if let Err(payload) = result {
            warn!(task = ?id, "task panicked: {}", panic_message(payload.as_ref()));
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("id", &self.id).finish()
    }
}

/// Best-effort extraction of a panic payload's message.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}
