use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ConfigError;

pub const DEFAULT_CONTAINER: &str = "grainstate";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const ENV_PREFIX: &str = "THETA_MINIO_";

/// Options of a single named Minio grain storage provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinioGrainStorageOptions {
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: String,
    pub container: String,
    /// Prepended as `{prefix}-{container}` to every container name, so that
    /// several deployments can share one store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_prefix: Option<String>,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

// Implementations

impl Default for MinioGrainStorageOptions {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            endpoint: String::new(),
            container: DEFAULT_CONTAINER.to_string(),
            container_prefix: None,
            region: DEFAULT_REGION.to_string(),
            request_timeout_ms: None,
        }
    }
}

impl MinioGrainStorageOptions {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_container_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.container_prefix = Some(prefix.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Layered sources for the provider `provider_name`: the `[provider_name]`
    /// table of the TOML file at `path` (if present), then environment variables
    /// such as `THETA_MINIO_<PROVIDER>__ACCESS_KEY`.
    pub fn figment(provider_name: &str, path: impl AsRef<Path>) -> Figment {
        let file = Figment::from(Toml::file(path.as_ref())).focus(provider_name);
        // Env keys are lowercased by figment
        let env = Figment::from(Env::prefixed(ENV_PREFIX).split("__"))
            .focus(&provider_name.to_lowercase());

        Figment::from(Serialized::defaults(Self::default()))
            .merge(file)
            .merge(env)
    }

    /// Extract and validate options from `figment`.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let options: Self = figment.extract()?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(provider_name: &str, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment(provider_name, path))
    }

    /// Fail fast on blank credentials, endpoint or prefix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_blank(&self.access_key) {
            return Err(ConfigError::Missing("accessKey"));
        }
        if is_blank(&self.secret_key) {
            return Err(ConfigError::Missing("secretKey"));
        }
        if is_blank(&self.endpoint) {
            return Err(ConfigError::Missing("endpoint"));
        }
        if is_blank(&self.container) {
            return Err(ConfigError::Missing("container"));
        }
        if self.container_prefix.as_deref().is_some_and(is_blank) {
            return Err(ConfigError::Missing("containerPrefix"));
        }

        self.endpoint_url()?;

        Ok(())
    }

    /// Endpoint as an absolute URL; a bare `host:port` is taken as plain http.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let endpoint = self.endpoint.trim();
        let raw = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };

        Url::parse(&raw).map_err(|source| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
