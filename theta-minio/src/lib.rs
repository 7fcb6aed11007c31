//! Grain state persistence on S3 compatible object stores.
//!
//! Each grain's state lives in a single object named `{grain_type}-{grain_id}`
//! inside one container (bucket). The object holds a JSON record carrying the
//! state and a monotonically increasing version which is surfaced to callers as
//! the grain's ETag.
//!
//! ```ignore
//! use theta_minio::prelude::*;
//!
//! let storage = MinioGrainStorage::new("grainstate", InMemoryStorage::new());
//! storage.init(CancellationToken::new()).await?;
//!
//! let mut state = GrainState::new(serde_json::json!({ "balance": 100 }));
//! storage.write_state("UserGrain", "user-42", &mut state).await?;
//! assert_eq!(state.etag.as_deref(), Some("0"));
//! ```

extern crate self as theta_minio;

pub mod base;
pub mod errors;
pub mod grain;
pub mod hosting;
pub mod options;
pub mod persistence;
pub mod serializer;

// Re-exports

pub mod prelude {
    pub use crate::errors::{ConfigError, GrainStorageError, ObjectStorageError};
    pub use crate::grain::{GrainIdentity, GrainKey, GrainState, GrainStateRecord, PersistentGrain};
    pub use crate::hosting::{LifecycleParticipant, StorageHost};
    pub use crate::options::MinioGrainStorageOptions;
    pub use crate::persistence::{MinioGrainStorage, ObjectStorage, storages::InMemoryStorage};
    pub use crate::serializer::{JsonSerializer, StateSerializer};

    #[cfg(feature = "local_fs")]
    pub use crate::persistence::storages::LocalFsStorage;
    #[cfg(feature = "s3")]
    pub use crate::persistence::storages::MinioStorage;

    #[cfg(feature = "macros")]
    pub use theta_minio_macros::PersistentGrain;

    pub use tokio_util::sync::CancellationToken;
}
