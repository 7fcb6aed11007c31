#![allow(dead_code)]

use std::sync::Once;

use bytes::Bytes;
use theta_minio::prelude::*;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub async fn initialized(container: &str) -> MinioGrainStorage<InMemoryStorage> {
    init_tracing();

    let storage = MinioGrainStorage::new(container, InMemoryStorage::new());
    storage.init(CancellationToken::new()).await.unwrap();
    storage
}

/// Gateway whose object calls fail like an unreachable or forbidding server.
#[derive(Debug, Default)]
pub struct FailingStorage;

impl ObjectStorage for FailingStorage {
    async fn container_exists(&self, _container: &str) -> Result<bool, ObjectStorageError> {
        Ok(true)
    }

    async fn create_container(&self, _container: &str) -> Result<(), ObjectStorageError> {
        Ok(())
    }

    async fn read_object(
        &self,
        _container: &str,
        _name: &str,
        _prefix: Option<&str>,
    ) -> Result<Bytes, ObjectStorageError> {
        Err(ObjectStorageError::Backend("Access Denied".to_string()))
    }

    async fn write_object(
        &self,
        _container: &str,
        _name: &str,
        _content: Bytes,
        _prefix: Option<&str>,
        _content_type: Option<&str>,
    ) -> Result<(), ObjectStorageError> {
        Err(ObjectStorageError::Backend("connection refused".to_string()))
    }

    async fn delete_object(
        &self,
        _container: &str,
        _name: &str,
        _prefix: Option<&str>,
    ) -> Result<(), ObjectStorageError> {
        Err(ObjectStorageError::Backend("connection reset".to_string()))
    }
}

/// Gateway that never answers object calls.
#[derive(Debug, Default)]
pub struct StalledStorage;

impl ObjectStorage for StalledStorage {
    async fn container_exists(&self, _container: &str) -> Result<bool, ObjectStorageError> {
        Ok(true)
    }

    async fn create_container(&self, _container: &str) -> Result<(), ObjectStorageError> {
        Ok(())
    }

    async fn read_object(
        &self,
        _container: &str,
        _name: &str,
        _prefix: Option<&str>,
    ) -> Result<Bytes, ObjectStorageError> {
        futures::future::pending().await
    }

    async fn write_object(
        &self,
        _container: &str,
        _name: &str,
        _content: Bytes,
        _prefix: Option<&str>,
        _content_type: Option<&str>,
    ) -> Result<(), ObjectStorageError> {
        futures::future::pending().await
    }

    async fn delete_object(
        &self,
        _container: &str,
        _name: &str,
        _prefix: Option<&str>,
    ) -> Result<(), ObjectStorageError> {
        futures::future::pending().await
    }
}
