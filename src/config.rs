//! Pool selection and construction parameters.

use crate::error::{Error, Result};

/// Which pool engine `build` constructs.
///
/// Selecting the engine is a construction-time decision carried by
/// configuration; all four implement the same [`WorkerPool`] contract.
///
/// [`WorkerPool`]: crate::pool::WorkerPool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// One ephemeral worker thread per accepted task; no queue, no width.
    SpawnPerTask,

    /// Fixed workers consuming a single bounded FIFO queue. Admission is
    /// rejected while the queue is at capacity.
    Bounded,

    /// Fixed workers split across two bounded FIFO queues, one per affinity
    /// domain, with the domains pinnable to dedicated cores.
    CoreAffine,

    /// Fixed workers consuming a single unbounded FIFO queue. The
    /// general-purpose variant for hosts with ordinary preemptible threads.
    Unbounded,
}

impl Default for PoolKind {
    fn default() -> Self {
        PoolKind::Unbounded
    }
}

/// Construction parameters shared by every pool variant.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine selection. Defaults to [`PoolKind::Unbounded`].
    pub kind: PoolKind,

    /// Worker width for the persistent variants; `None` means one worker per
    /// logical CPU. Ignored by [`PoolKind::SpawnPerTask`], which has no
    /// fixed width.
    pub num_threads: Option<usize>,

    /// Queue bound for [`PoolKind::Bounded`] and, per domain, for
    /// [`PoolKind::CoreAffine`].
    pub queue_capacity: usize,

    /// Physically bind workers to cores. Routing between affinity domains
    /// happens regardless; this only controls whether threads are pinned.
    pub pin_workers: bool,

    /// Core backing [`Affinity::System`](crate::pool::Affinity::System).
    pub system_core: usize,

    /// Core backing [`Affinity::Application`](crate::pool::Affinity::Application).
    pub application_core: usize,

    /// Stack reservation for persistent workers and for ephemeral threads
    /// running [`Weight::Light`](crate::pool::Weight::Light) tasks. `None`
    /// keeps the platform default.
    pub stack_size: Option<usize>,

    /// Stack reservation for ephemeral threads running
    /// [`Weight::Heavy`](crate::pool::Weight::Heavy) tasks. Falls back to
    /// `stack_size` when unset.
    pub heavy_stack_size: Option<usize>,

    /// Prefix for worker thread names.
    pub thread_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kind: PoolKind::default(),
            num_threads: None,
            queue_capacity: 1024,
            pin_workers: false,
            system_core: 0,
            application_core: 1,
            stack_size: Some(2 * 1024 * 1024),
            heavy_stack_size: Some(8 * 1024 * 1024),
            thread_name_prefix: "taskwell".to_string(),
        }
    }
}

impl Config {
    /// Start building a configuration from the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Reject values no pool can be built from.
    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::config("num_threads must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("num_threads too large (max 1024)"));
            }
        }

        if self.queue_capacity == 0 {
            return Err(Error::config("queue_capacity must be > 0"));
        }

        Ok(())
    }

    /// Effective persistent-worker width.
    pub fn worker_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Select the pool engine.
    pub fn kind(mut self, kind: PoolKind) -> Self {
        self.config.kind = kind;
        self
    }

    /// Fix the persistent worker width.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    /// Bound each queue at `capacity` tasks.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Physically bind workers to cores.
    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.config.pin_workers = pin;
        self
    }

    /// Core backing the system domain.
    pub fn system_core(mut self, core: usize) -> Self {
        self.config.system_core = core;
        self
    }

    /// Core backing the application domain.
    pub fn application_core(mut self, core: usize) -> Self {
        self.config.application_core = core;
        self
    }

    /// Stack reservation for workers and light ephemeral threads.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    /// Stack reservation for heavy ephemeral threads.
    pub fn heavy_stack_size(mut self, size: usize) -> Self {
        self.config.heavy_stack_size = Some(size);
        self
    }

    /// Prefix for worker thread names.
    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let result = Config::builder().num_threads(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = Config::builder().queue_capacity(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_round_trip() {
        let config = Config::builder()
            .kind(PoolKind::CoreAffine)
            .num_threads(4)
            .queue_capacity(64)
            .pin_workers(true)
            .system_core(2)
            .application_core(3)
            .thread_name_prefix("engine")
            .build()
            .unwrap();

        assert_eq!(config.kind, PoolKind::CoreAffine);
        assert_eq!(config.worker_threads(), 4);
        assert_eq!(config.queue_capacity, 64);
        assert!(config.pin_workers);
        assert_eq!(config.system_core, 2);
        assert_eq!(config.application_core, 3);
        assert_eq!(config.thread_name_prefix, "engine");
    }
}
