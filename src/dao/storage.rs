use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of a game store, whatever database sits behind it.
///
/// Every variant puts the service in degraded mode: recorded stats stay in the
/// outbox of the loaded game until the store answers again.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{backend} storage unavailable: {message}")]
    Unavailable {
        backend: &'static str,
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Wrap a failure reported by `backend`.
    pub fn unavailable(backend: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            backend,
            message: source.to_string(),
            source: Box::new(source),
        }
    }

    /// Name of the backend that failed.
    pub fn backend(&self) -> &'static str {
        match self {
            StorageError::Unavailable { backend, .. } => backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_backend_and_keeps_the_source() {
        let err = StorageError::unavailable(
            "mongodb",
            std::io::Error::new(std::io::ErrorKind::TimedOut, "ping timed out"),
        );
        assert_eq!(err.backend(), "mongodb");
        assert_eq!(err.to_string(), "mongodb storage unavailable: ping timed out");
        assert!(err.source().is_some());
    }
}
