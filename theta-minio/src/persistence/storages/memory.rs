//! In-memory object store for tests and single process development.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use rustc_hash::FxHashMap;

use crate::{
    errors::ObjectStorageError,
    persistence::object_storage::{ContainerNaming, ObjectStorage},
    trace,
};

/// Object kept by [`InMemoryStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content: Bytes,
    pub content_type: Option<String>,
}

/// Object store living in process memory.
///
/// Follows the same contract as a remote store: missing containers and
/// objects are reported distinctly, writes overwrite, deletes of absent objects
/// succeed. Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    naming: ContainerNaming,
    containers: RwLock<FxHashMap<String, FxHashMap<String, StoredObject>>>,
}

type Containers = FxHashMap<String, FxHashMap<String, StoredObject>>;

// Implementations

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container_prefix(prefix: impl Into<String>) -> Self {
        Self {
            naming: ContainerNaming::new(Some(prefix.into())),
            ..Default::default()
        }
    }

    /// Physical names of every container, sorted.
    pub fn containers(&self) -> Vec<String> {
        let Ok(containers) = self.containers.read() else {
            return Vec::new();
        };

        let mut names = containers.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Object stored under the logical `container` and `name`.
    pub fn object(&self, container: &str, name: &str) -> Option<StoredObject> {
        let containers = self.containers.read().ok()?;

        containers
            .get(&self.naming.container(container))
            .and_then(|objects| objects.get(name))
            .cloned()
    }

    /// Drop the logical `container` and everything in it, as if it was removed
    /// behind the provider's back.
    pub fn remove_container(&self, container: &str) -> bool {
        let bucket = self.naming.container(container);

        self.containers
            .write()
            .map(|mut c| c.remove(&bucket).is_some())
            .unwrap_or(false)
    }

    /// Number of objects in the logical `container`.
    pub fn len(&self, container: &str) -> usize {
        self.containers
            .read()
            .ok()
            .and_then(|c| c.get(&self.naming.container(container)).map(|o| o.len()))
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Containers>, ObjectStorageError> {
        self.containers
            .read()
            .map_err(|_| ObjectStorageError::Backend("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Containers>, ObjectStorageError> {
        self.containers
            .write()
            .map_err(|_| ObjectStorageError::Backend("in-memory store lock poisoned".into()))
    }
}

impl ObjectStorage for InMemoryStorage {
    async fn container_exists(&self, container: &str) -> Result<bool, ObjectStorageError> {
        let bucket = self.naming.container(container);

        Ok(self.read()?.contains_key(&bucket))
    }

    async fn create_container(&self, container: &str) -> Result<(), ObjectStorageError> {
        let bucket = self.naming.container(container);
        trace!(%bucket, "Creating in-memory container");

        self.write()?.entry(bucket).or_default();

        Ok(())
    }

    async fn read_object(
        &self,
        container: &str,
        name: &str,
        prefix: Option<&str>,
    ) -> Result<Bytes, ObjectStorageError> {
        let bucket = self.naming.container(container);
        let object_name = self.naming.object(name, prefix);

        let containers = self.read()?;
        let objects = containers
            .get(&bucket)
            .ok_or_else(|| ObjectStorageError::ContainerNotFound(bucket.clone()))?;

        objects
            .get(&object_name)
            .map(|o| o.content.clone())
            .ok_or(ObjectStorageError::ObjectNotFound {
                container: bucket,
                name: object_name,
            })
    }

    async fn write_object(
        &self,
        container: &str,
        name: &str,
        content: Bytes,
        prefix: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStorageError> {
        let bucket = self.naming.container(container);
        let object_name = self.naming.object(name, prefix);

        let mut containers = self.write()?;
        let objects = containers
            .get_mut(&bucket)
            .ok_or(ObjectStorageError::ContainerNotFound(bucket))?;

        objects.insert(
            object_name,
            StoredObject {
                content,
                content_type: content_type.map(str::to_string),
            },
        );

        Ok(())
    }

    async fn delete_object(
        &self,
        container: &str,
        name: &str,
        prefix: Option<&str>,
    ) -> Result<(), ObjectStorageError> {
        let bucket = self.naming.container(container);
        let object_name = self.naming.object(name, prefix);

        let mut containers = self.write()?;
        let objects = containers
            .get_mut(&bucket)
            .ok_or(ObjectStorageError::ContainerNotFound(bucket))?;

        objects.remove(&object_name);

        Ok(())
    }
}
