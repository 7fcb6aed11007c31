use thiserror::Error;

/// Errors raised by an [`ObjectStorage`](crate::persistence::ObjectStorage) gateway.
#[derive(Debug, Error)]
pub enum ObjectStorageError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("object not found: {container}/{name}")]
    ObjectNotFound { container: String, name: String },

    #[error("invalid object name: {0:?}")]
    InvalidName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("object store request failed: {0}")]
    Backend(String),
}

/// Errors detected while building a provider from its options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Minio '{0}' is missing.")]
    Missing(&'static str),
    #[error("invalid endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),
    #[error("failed to create object store client: {0}")]
    Client(String),
}

/// Errors surfaced to the host runtime by grain storage operations.
#[derive(Debug, Error)]
pub enum GrainStorageError {
    #[error(transparent)]
    Storage(#[from] ObjectStorageError),

    #[error("failed to serialize grain state: {0}")]
    Serialize(String),
    #[error("failed to deserialize grain state: {0}")]
    Deserialize(String),

    #[error("invalid etag {0:?}, expected a version number")]
    InvalidETag(String),

    #[error("grain storage {0:?} used before initialization")]
    NotInitialized(String),
    #[error("grain storage operation cancelled")]
    Cancelled,
    #[error("grain storage operation timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

// Implementations

impl ObjectStorageError {
    /// Whether the error reports a missing container or a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ObjectStorageError::ContainerNotFound(_) | ObjectStorageError::ObjectNotFound { .. }
        )
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Figment(Box::new(e))
    }
}
