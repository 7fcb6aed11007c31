//! Object store gateways.
//!
//! - **InMemoryStorage**: process local store, used by tests
//! - **LocalFsStorage**: directory per container on the local file system
//! - **MinioStorage**: Minio or any other S3 compatible server

#[cfg(feature = "local_fs")]
pub mod local_fs;
pub mod memory;
#[cfg(feature = "s3")]
pub mod minio;

// Re-exports

#[cfg(feature = "local_fs")]
pub use local_fs::LocalFsStorage;
pub use memory::{InMemoryStorage, StoredObject};
#[cfg(feature = "s3")]
pub use minio::MinioStorage;
