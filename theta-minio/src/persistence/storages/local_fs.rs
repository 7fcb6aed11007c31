use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use directories::ProjectDirs;
use uuid::Uuid;

use crate::{
    base::CallTimer,
    errors::ObjectStorageError,
    persistence::object_storage::{ContainerNaming, ObjectStorage},
    trace,
};

/// Object store on the local file system.
///
/// Containers are directories under `root`, objects are files inside them.
/// Object names must not contain path separators.
#[derive(Debug, Clone)]
pub struct LocalFsStorage {
    root: PathBuf,
    naming: ContainerNaming,
}

// Implementation

impl LocalFsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            naming: ContainerNaming::default(),
        }
    }

    /// Store rooted at the platform data directory of the calling application,
    /// if the OS provides one.
    ///
    /// Arguments follow [`ProjectDirs::from`], e.g. `("com", "Acme", "Billing")`.
    pub fn for_project(qualifier: &str, organization: &str, application: &str) -> Option<Self> {
        ProjectDirs::from(qualifier, organization, application)
            .map(|dirs| Self::new(dirs.data_dir().join("grainstate")))
    }

    pub fn with_container_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.naming = ContainerNaming::new(Some(prefix.into()));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_path(&self, container: &str) -> Result<PathBuf, ObjectStorageError> {
        let bucket = self.naming.container(container);
        check_segment(&bucket)?;

        Ok(self.root.join(bucket))
    }

    fn object_path(
        &self,
        container: &str,
        name: &str,
        prefix: Option<&str>,
    ) -> Result<(PathBuf, PathBuf), ObjectStorageError> {
        let dir = self.container_path(container)?;
        let object_name = self.naming.object(name, prefix);
        check_segment(&object_name)?;

        let file = dir.join(object_name);
        Ok((dir, file))
    }

    async fn ensure_container(&self, dir: &Path) -> Result<(), ObjectStorageError> {
        if tokio::fs::try_exists(dir).await? {
            Ok(())
        } else {
            Err(ObjectStorageError::ContainerNotFound(
                dir.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ))
        }
    }
}

impl ObjectStorage for LocalFsStorage {
    async fn container_exists(&self, container: &str) -> Result<bool, ObjectStorageError> {
        let dir = self.container_path(container)?;

        match tokio::fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_container(&self, container: &str) -> Result<(), ObjectStorageError> {
        let dir = self.container_path(container)?;
        trace!(dir = %dir.display(), "Creating container directory");

        Ok(tokio::fs::create_dir_all(&dir).await?)
    }

    async fn read_object(
        &self,
        container: &str,
        name: &str,
        prefix: Option<&str>,
    ) -> Result<Bytes, ObjectStorageError> {
        let (dir, file) = self.object_path(container, name, prefix)?;
        let timer = CallTimer::start();

        self.ensure_container(&dir).await?;

        let content = match tokio::fs::read(&file).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ObjectStorageError::ObjectNotFound {
                    container: self.naming.container(container),
                    name: self.naming.object(name, prefix),
                });
            }
            Err(e) => return Err(e.into()),
        };

        trace!(
            time_ms = timer.elapsed_ms(),
            container,
            name,
            prefix,
            "Read file"
        );

        Ok(Bytes::from(content))
    }

    async fn write_object(
        &self,
        container: &str,
        name: &str,
        content: Bytes,
        prefix: Option<&str>,
        _content_type: Option<&str>,
    ) -> Result<(), ObjectStorageError> {
        let (dir, file) = self.object_path(container, name, prefix)?;
        let timer = CallTimer::start();

        self.ensure_container(&dir).await?;

        // Write aside then rename so readers never observe a torn object
        let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        let res = async {
            tokio::fs::write(&tmp, &content).await?;
            tokio::fs::rename(&tmp, &file).await
        }
        .await;

        if let Err(e) = res {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        trace!(
            time_ms = timer.elapsed_ms(),
            container,
            name,
            prefix,
            "Wrote file"
        );

        Ok(())
    }

    async fn delete_object(
        &self,
        container: &str,
        name: &str,
        prefix: Option<&str>,
    ) -> Result<(), ObjectStorageError> {
        let (dir, file) = self.object_path(container, name, prefix)?;

        self.ensure_container(&dir).await?;

        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn check_segment(segment: &str) -> Result<(), ObjectStorageError> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);

    if invalid {
        Err(ObjectStorageError::InvalidName(segment.to_string()))
    } else {
        Ok(())
    }
}
