//! Registration of named grain storage providers and their startup step.

use std::{
    any::Any,
    borrow::Cow,
    sync::Arc,
};

use futures::{FutureExt, future::BoxFuture};
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;

use crate::{
    errors::GrainStorageError,
    info,
    persistence::{MinioGrainStorage, ObjectStorage},
    serializer::StateSerializer,
    warn,
};

#[cfg(feature = "s3")]
use crate::{
    errors::ConfigError, options::MinioGrainStorageOptions, persistence::storages::MinioStorage,
};

/// Something that must run a startup step before the host routes traffic to it.
pub trait LifecycleParticipant: Send + Sync {
    fn participant_name(&self) -> &str;

    fn start(&self, cancel: CancellationToken) -> BoxFuture<'_, Result<(), GrainStorageError>>;
}

/// Named grain storage providers of one host.
#[derive(Default)]
pub struct StorageHost {
    providers: FxHashMap<Cow<'static, str>, Arc<dyn Any + Send + Sync>>,
    participants: Vec<Arc<dyn LifecycleParticipant>>,
}

// Implementations

impl StorageHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `storage` under its provider name.
    ///
    /// A provider registered earlier under the same name is replaced.
    pub fn add_grain_storage<S, Z>(
        &mut self,
        storage: MinioGrainStorage<S, Z>,
    ) -> Arc<MinioGrainStorage<S, Z>>
    where
        S: ObjectStorage,
        Z: StateSerializer,
    {
        let name: Cow<'static, str> = Cow::Owned(storage.name().to_string());
        let storage = Arc::new(storage);

        if self
            .providers
            .insert(name.clone(), storage.clone() as Arc<dyn Any + Send + Sync>)
            .is_some()
        {
            warn!(provider = %name, "Existing grain storage provider is replaced");
            self.participants
                .retain(|p| p.participant_name() != name.as_ref());
        }

        self.participants
            .push(storage.clone() as Arc<dyn LifecycleParticipant>);

        storage
    }

    /// Validate `options`, build a Minio backed provider and register it as `name`.
    #[cfg(feature = "s3")]
    pub fn add_minio_grain_storage(
        &mut self,
        name: &str,
        options: &MinioGrainStorageOptions,
    ) -> Result<Arc<MinioGrainStorage<MinioStorage>>, ConfigError> {
        let storage = MinioGrainStorage::from_options(name, options)?;
        Ok(self.add_grain_storage(storage))
    }

    /// Provider registered as `name`, if its gateway and serializer types match.
    pub fn grain_storage<S, Z>(&self, name: &str) -> Option<Arc<MinioGrainStorage<S, Z>>>
    where
        S: ObjectStorage,
        Z: StateSerializer,
    {
        self.providers
            .get(name)
            .and_then(|p| p.clone().downcast::<MinioGrainStorage<S, Z>>().ok())
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.participant_name())
    }

    /// Run every provider's startup step in registration order.
    ///
    /// Stops at the first failure; providers after it are not started.
    pub async fn start(&self, cancel: CancellationToken) -> Result<(), GrainStorageError> {
        for participant in &self.participants {
            info!(provider = participant.participant_name(), "Starting grain storage");

            participant.start(cancel.clone()).await?;
        }

        Ok(())
    }
}

impl<S, Z> LifecycleParticipant for MinioGrainStorage<S, Z>
where
    S: ObjectStorage,
    Z: StateSerializer,
{
    fn participant_name(&self) -> &str {
        self.name()
    }

    fn start(&self, cancel: CancellationToken) -> BoxFuture<'_, Result<(), GrainStorageError>> {
        self.init(cancel).boxed()
    }
}
