pub mod grain_storage;
pub mod object_storage;
pub mod storages;

// Re-exports
pub use grain_storage::MinioGrainStorage;
pub use object_storage::{ContainerNaming, ObjectStorage, append_prefix};
