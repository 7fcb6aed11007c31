use std::{future::Future, sync::Arc};

use bytes::Bytes;

use crate::errors::ObjectStorageError;

/// Capability surface of an object store as seen by grain storage.
///
/// Container and object names passed in are logical names; implementations
/// resolve them with [`ContainerNaming`] before touching the store.
pub trait ObjectStorage: Send + Sync + 'static {
    fn container_exists(
        &self,
        container: &str,
    ) -> impl Future<Output = Result<bool, ObjectStorageError>> + Send;

    /// Create `container`. Creating a container that already exists is not an error.
    fn create_container(
        &self,
        container: &str,
    ) -> impl Future<Output = Result<(), ObjectStorageError>> + Send;

    /// Full content of an object.
    ///
    /// Fails with [`ObjectStorageError::ContainerNotFound`] or
    /// [`ObjectStorageError::ObjectNotFound`] when either is absent.
    fn read_object(
        &self,
        container: &str,
        name: &str,
        prefix: Option<&str>,
    ) -> impl Future<Output = Result<Bytes, ObjectStorageError>> + Send;

    /// Replace the whole content of an object, creating it if needed.
    fn write_object(
        &self,
        container: &str,
        name: &str,
        content: Bytes,
        prefix: Option<&str>,
        content_type: Option<&str>,
    ) -> impl Future<Output = Result<(), ObjectStorageError>> + Send;

    /// Remove an object. Removing an absent object succeeds.
    fn delete_object(
        &self,
        container: &str,
        name: &str,
        prefix: Option<&str>,
    ) -> impl Future<Output = Result<(), ObjectStorageError>> + Send;
}

/// Maps logical container and object names to physical ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerNaming {
    container_prefix: Option<String>,
}

/// `{prefix}-{value}`, or `value` unchanged when there is no prefix.
pub fn append_prefix(prefix: Option<&str>, value: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}-{value}"),
        _ => value.to_string(),
    }
}

// Implementations

impl ContainerNaming {
    pub fn new(container_prefix: Option<String>) -> Self {
        Self { container_prefix }
    }

    pub fn container_prefix(&self) -> Option<&str> {
        self.container_prefix.as_deref()
    }

    pub fn container(&self, container: &str) -> String {
        append_prefix(self.container_prefix(), container)
    }

    pub fn object(&self, name: &str, prefix: Option<&str>) -> String {
        append_prefix(prefix, name)
    }
}

impl<S: ObjectStorage> ObjectStorage for Arc<S> {
    fn container_exists(
        &self,
        container: &str,
    ) -> impl Future<Output = Result<bool, ObjectStorageError>> + Send {
        (**self).container_exists(container)
    }

    fn create_container(
        &self,
        container: &str,
    ) -> impl Future<Output = Result<(), ObjectStorageError>> + Send {
        (**self).create_container(container)
    }

    fn read_object(
        &self,
        container: &str,
        name: &str,
        prefix: Option<&str>,
    ) -> impl Future<Output = Result<Bytes, ObjectStorageError>> + Send {
        (**self).read_object(container, name, prefix)
    }

    fn write_object(
        &self,
        container: &str,
        name: &str,
        content: Bytes,
        prefix: Option<&str>,
        content_type: Option<&str>,
    ) -> impl Future<Output = Result<(), ObjectStorageError>> + Send {
        (**self).write_object(container, name, content, prefix, content_type)
    }

    fn delete_object(
        &self,
        container: &str,
        name: &str,
        prefix: Option<&str>,
    ) -> impl Future<Output = Result<(), ObjectStorageError>> + Send {
        (**self).delete_object(container, name, prefix)
    }
}
