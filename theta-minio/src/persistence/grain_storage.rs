use std::{future::Future, time::Duration};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::{
    debug, error,
    errors::{GrainStorageError, ObjectStorageError},
    grain::{GrainIdentity, GrainState, GrainStateRecord, PersistentGrain, blob_name},
    persistence::object_storage::ObjectStorage,
    serializer::{JsonSerializer, StateSerializer},
    trace,
};

#[cfg(feature = "s3")]
use crate::{
    errors::ConfigError, options::MinioGrainStorageOptions,
    persistence::storages::minio::MinioStorage,
};

pub const DEFAULT_PROVIDER_NAME: &str = "Default";

/// Grain storage provider keeping one object per grain in a single container.
///
/// Every record is stored as `{"version": n, "state": ...}` under
/// `{grain_type}-{grain_id}`. The version is handed to the caller as the grain's
/// ETag and bumped by one on each write.
///
/// Writes are last writer wins: the next version is derived from the ETag the
/// caller holds, the stored version is not checked before overwriting.
///
/// [`init`](Self::init) must complete before any read, write or clear.
#[derive(Debug)]
pub struct MinioGrainStorage<S, Z = JsonSerializer> {
    name: String,
    container: String,
    storage: S,
    serializer: Z,
    shutdown: CancellationToken,
    request_timeout: Option<Duration>,
    initialized: OnceCell<()>,
}

// Implementations

impl<S: ObjectStorage> MinioGrainStorage<S> {
    pub fn new(container: impl Into<String>, storage: S) -> Self {
        Self::named(DEFAULT_PROVIDER_NAME, container, storage)
    }

    pub fn named(name: impl Into<String>, container: impl Into<String>, storage: S) -> Self {
        Self {
            name: name.into(),
            container: container.into(),
            storage,
            serializer: JsonSerializer::new(),
            shutdown: CancellationToken::new(),
            request_timeout: None,
            initialized: OnceCell::new(),
        }
    }
}

#[cfg(feature = "s3")]
impl MinioGrainStorage<MinioStorage> {
    /// Provider backed by the Minio server described by `options`.
    pub fn from_options(
        name: impl Into<String>,
        options: &MinioGrainStorageOptions,
    ) -> Result<Self, ConfigError> {
        let storage = MinioStorage::from_options(options)?;
        let mut grain_storage = Self::named(name, options.container.clone(), storage);
        grain_storage.request_timeout = options.request_timeout();

        Ok(grain_storage)
    }
}

impl<S, Z> MinioGrainStorage<S, Z>
where
    S: ObjectStorage,
    Z: StateSerializer,
{
    pub fn with_serializer<Z2: StateSerializer>(self, serializer: Z2) -> MinioGrainStorage<S, Z2> {
        MinioGrainStorage {
            name: self.name,
            container: self.container,
            storage: self.storage,
            serializer,
            shutdown: self.shutdown,
            request_timeout: self.request_timeout,
            initialized: self.initialized,
        }
    }

    /// Abort in-flight and future store calls once `shutdown` is cancelled.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Upper bound for every single store call.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// Startup step, creating the container if it does not exist yet.
    ///
    /// Runs once per instance, later calls return immediately.
    pub async fn init(&self, cancel: CancellationToken) -> Result<(), GrainStorageError> {
        self.initialized
            .get_or_try_init(|| async {
                debug!(
                    provider = %self.name,
                    container = %self.container,
                    content_type = self.serializer.content_type(),
                    "Initializing grain storage"
                );

                let exists = self
                    .call(&cancel, self.storage.container_exists(&self.container))
                    .await?;

                if !exists {
                    debug!(container = %self.container, "Creating container");

                    self.call(&cancel, self.storage.create_container(&self.container))
                        .await?;
                }

                Ok::<_, GrainStorageError>(())
            })
            .await
            .inspect_err(|_e| {
                error!(
                    provider = %self.name,
                    container = %self.container,
                    error = %_e,
                    "Error initializing grain storage"
                );
            })?;

        Ok(())
    }

    /// Load the stored state into `grain_state`.
    ///
    /// A missing container or object leaves `grain_state` untouched.
    pub async fn read_state<T>(
        &self,
        grain_type: &str,
        grain_id: &(impl GrainIdentity + ?Sized),
        grain_state: &mut GrainState<T>,
    ) -> Result<(), GrainStorageError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let blob_name = blob_name(grain_type, grain_id);
        let grain_id = grain_id.key_string().into_owned();

        trace!(
            grain_type,
            %grain_id,
            etag = ?grain_state.etag,
            %blob_name,
            container = %self.container,
            "Reading"
        );

        let res = async {
            self.ensure_initialized()?;

            let content = match self
                .call(
                    &self.shutdown,
                    self.storage.read_object(&self.container, &blob_name, None),
                )
                .await
            {
                Ok(content) => content,
                Err(GrainStorageError::Storage(e)) if e.is_not_found() => {
                    trace!(
                        grain_type,
                        %grain_id,
                        etag = ?grain_state.etag,
                        %blob_name,
                        container = %self.container,
                        reason = %e,
                        "Not found reading"
                    );
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            let record: GrainStateRecord<T> = self.serializer.deserialize(&content)?;

            grain_state.state = record.state;
            grain_state.etag = Some(record.version.to_string());

            trace!(
                grain_type,
                %grain_id,
                etag = ?grain_state.etag,
                %blob_name,
                container = %self.container,
                "Read"
            );

            Ok::<_, GrainStorageError>(())
        }
        .await;

        res.inspect_err(|_e| {
            error!(
                grain_type,
                %grain_id,
                etag = ?grain_state.etag,
                %blob_name,
                container = %self.container,
                error = %_e,
                "Error reading"
            );
        })
    }

    /// Store `grain_state` under the next version and advance its ETag.
    pub async fn write_state<T>(
        &self,
        grain_type: &str,
        grain_id: &(impl GrainIdentity + ?Sized),
        grain_state: &mut GrainState<T>,
    ) -> Result<(), GrainStorageError>
    where
        T: Serialize,
    {
        let blob_name = blob_name(grain_type, grain_id);
        let grain_id = grain_id.key_string().into_owned();

        trace!(
            grain_type,
            %grain_id,
            etag = ?grain_state.etag,
            %blob_name,
            container = %self.container,
            "Writing"
        );

        let res = async {
            self.ensure_initialized()?;

            let version = next_version(grain_state.etag.as_deref())?;
            let record = GrainStateRecord {
                version,
                state: &grain_state.state,
            };
            let content = Bytes::from(self.serializer.serialize(&record)?);

            self.call(
                &self.shutdown,
                self.storage.write_object(
                    &self.container,
                    &blob_name,
                    content,
                    None,
                    Some(self.serializer.content_type()),
                ),
            )
            .await?;

            grain_state.etag = Some(version.to_string());

            trace!(
                grain_type,
                %grain_id,
                etag = ?grain_state.etag,
                %blob_name,
                container = %self.container,
                "Wrote"
            );

            Ok::<_, GrainStorageError>(())
        }
        .await;

        res.inspect_err(|_e| {
            error!(
                grain_type,
                %grain_id,
                etag = ?grain_state.etag,
                %blob_name,
                container = %self.container,
                error = %_e,
                "Error writing"
            );
        })
    }

    /// Delete the stored state and reset the ETag.
    ///
    /// `grain_state.state` is left as is.
    pub async fn clear_state<T>(
        &self,
        grain_type: &str,
        grain_id: &(impl GrainIdentity + ?Sized),
        grain_state: &mut GrainState<T>,
    ) -> Result<(), GrainStorageError> {
        let blob_name = blob_name(grain_type, grain_id);
        let grain_id = grain_id.key_string().into_owned();

        trace!(
            grain_type,
            %grain_id,
            etag = ?grain_state.etag,
            %blob_name,
            container = %self.container,
            "Clearing"
        );

        let res = async {
            self.ensure_initialized()?;

            self.call(
                &self.shutdown,
                self.storage.delete_object(&self.container, &blob_name, None),
            )
            .await?;

            grain_state.etag = None;

            trace!(
                grain_type,
                %grain_id,
                %blob_name,
                container = %self.container,
                "Cleared"
            );

            Ok::<_, GrainStorageError>(())
        }
        .await;

        res.inspect_err(|_e| {
            error!(
                grain_type,
                %grain_id,
                etag = ?grain_state.etag,
                %blob_name,
                container = %self.container,
                error = %_e,
                "Error clearing"
            );
        })
    }

    pub async fn read<G: PersistentGrain>(
        &self,
        grain_id: &(impl GrainIdentity + ?Sized),
        grain_state: &mut GrainState<G::State>,
    ) -> Result<(), GrainStorageError> {
        self.read_state(G::GRAIN_TYPE, grain_id, grain_state).await
    }

    pub async fn write<G: PersistentGrain>(
        &self,
        grain_id: &(impl GrainIdentity + ?Sized),
        grain_state: &mut GrainState<G::State>,
    ) -> Result<(), GrainStorageError> {
        self.write_state(G::GRAIN_TYPE, grain_id, grain_state).await
    }

    pub async fn clear<G: PersistentGrain>(
        &self,
        grain_id: &(impl GrainIdentity + ?Sized),
        grain_state: &mut GrainState<G::State>,
    ) -> Result<(), GrainStorageError> {
        self.clear_state(G::GRAIN_TYPE, grain_id, grain_state).await
    }

    fn ensure_initialized(&self) -> Result<(), GrainStorageError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(GrainStorageError::NotInitialized(self.name.clone()))
        }
    }

    /// Run a store call under `cancel` and the request timeout.
    async fn call<T>(
        &self,
        cancel: &CancellationToken,
        fut: impl Future<Output = Result<T, ObjectStorageError>>,
    ) -> Result<T, GrainStorageError> {
        let bounded = async {
            let res = match self.request_timeout {
                Some(limit) => tokio::time::timeout(limit, fut).await?,
                None => fut.await,
            };

            res.map_err(GrainStorageError::from)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GrainStorageError::Cancelled),
            res = bounded => res,
        }
    }
}

/// Version to store for a state currently tagged `etag`.
pub fn next_version(etag: Option<&str>) -> Result<u64, GrainStorageError> {
    match etag.map(str::trim) {
        None | Some("") => Ok(0),
        Some(etag) => etag
            .parse::<u64>()
            .ok()
            .and_then(|v| v.checked_add(1))
            .ok_or_else(|| GrainStorageError::InvalidETag(etag.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::storages::InMemoryStorage;

    #[test]
    fn test_next_version() {
        assert_eq!(next_version(None).unwrap(), 0);
        assert_eq!(next_version(Some("")).unwrap(), 0);
        assert_eq!(next_version(Some("0")).unwrap(), 1);
        assert_eq!(next_version(Some("41")).unwrap(), 42);

        assert!(matches!(
            next_version(Some("abc")),
            Err(GrainStorageError::InvalidETag(e)) if e == "abc"
        ));
        assert!(matches!(
            next_version(Some(&u64::MAX.to_string())),
            Err(GrainStorageError::InvalidETag(_))
        ));
    }

    #[tokio::test]
    async fn test_operations_require_init() {
        let storage = MinioGrainStorage::new("grainstate", InMemoryStorage::new());
        let mut state = GrainState::new(1_i32);

        let res = storage.write_state("Counter", "a", &mut state).await;
        assert!(matches!(res, Err(GrainStorageError::NotInitialized(name)) if name == "Default"));
        assert_eq!(state.etag, None);

        storage.init(CancellationToken::new()).await.unwrap();
        assert!(storage.is_initialized());

        storage.write_state("Counter", "a", &mut state).await.unwrap();
        assert_eq!(state.etag.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn test_init_creates_container_once() {
        let storage = MinioGrainStorage::new("grainstate", InMemoryStorage::new());

        storage.init(CancellationToken::new()).await.unwrap();
        storage.init(CancellationToken::new()).await.unwrap();

        assert_eq!(storage.storage().containers(), vec!["grainstate".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_init() {
        let storage = MinioGrainStorage::new("grainstate", InMemoryStorage::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let res = storage.init(cancel).await;
        assert!(matches!(res, Err(GrainStorageError::Cancelled)));
        assert!(!storage.is_initialized());
        assert!(storage.storage().containers().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_operations() {
        let shutdown = CancellationToken::new();
        let storage = MinioGrainStorage::new("grainstate", InMemoryStorage::new())
            .with_shutdown(shutdown.clone());
        storage.init(CancellationToken::new()).await.unwrap();

        shutdown.cancel();

        let mut state = GrainState::new(1_i32);
        let res = storage.write_state("Counter", "a", &mut state).await;
        assert!(matches!(res, Err(GrainStorageError::Cancelled)));
        assert_eq!(state.etag, None);
    }

    #[tokio::test]
    async fn test_invalid_etag_is_rejected() {
        let storage = MinioGrainStorage::new("grainstate", InMemoryStorage::new());
        storage.init(CancellationToken::new()).await.unwrap();

        let mut state = GrainState {
            state: 1_i32,
            etag: Some("W/\"abc\"".to_string()),
        };

        let res = storage.write_state("Counter", "a", &mut state).await;
        assert!(matches!(res, Err(GrainStorageError::InvalidETag(_))));
        assert_eq!(storage.storage().len("grainstate"), 0);
    }

    #[tokio::test]
    async fn test_pretty_serializer_is_used_for_writes() {
        let storage = MinioGrainStorage::new("grainstate", InMemoryStorage::new())
            .with_serializer(JsonSerializer::pretty());
        storage.init(CancellationToken::new()).await.unwrap();

        let mut state = GrainState::new(serde_json::json!({ "balance": 100 }));
        storage
            .write_state("UserGrain", "user-42", &mut state)
            .await
            .unwrap();

        let object = storage
            .storage()
            .object("grainstate", "UserGrain-user-42")
            .unwrap();
        assert!(object.content.contains(&b'\n'));
        assert_eq!(object.content_type.as_deref(), Some("application/json"));
    }
}
