//! Error types for pool construction.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced while constructing a pool.
///
/// Admission outcomes are deliberately not errors: `submit`/`execute` report
/// acceptance as a `bool`, and task-body panics are contained at the
/// execution boundary, so `Error` only ever appears before a pool exists.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration failed validation.
    #[error("config error: {0}")]
    Config(String),

    /// A persistent worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::config("queue_capacity must be > 0");
        assert_eq!(err.to_string(), "config error: queue_capacity must be > 0");
    }
}
