use bytes::Bytes;
use s3::{
    Bucket, BucketConfiguration, Region, creds::Credentials, error::S3Error, request::ResponseData,
};

use crate::{
    base::CallTimer,
    debug,
    errors::{ConfigError, ObjectStorageError},
    options::{DEFAULT_REGION, MinioGrainStorageOptions},
    persistence::object_storage::{ContainerNaming, ObjectStorage},
    trace,
};

/// Gateway to a Minio or any other S3 compatible server.
///
/// Holds only immutable connection settings, a bucket handle is built per call.
#[derive(Debug, Clone)]
pub struct MinioStorage {
    region: Region,
    credentials: Credentials,
    naming: ContainerNaming,
}

// Implementation

impl MinioStorage {
    pub fn new(access_key: &str, secret_key: &str, endpoint: &str) -> Result<Self, ConfigError> {
        let options = MinioGrainStorageOptions::new(access_key, secret_key, endpoint);
        Self::from_options(&options)
    }

    pub fn with_container_prefix(
        access_key: &str,
        secret_key: &str,
        endpoint: &str,
        container_prefix: &str,
    ) -> Result<Self, ConfigError> {
        let options = MinioGrainStorageOptions::new(access_key, secret_key, endpoint)
            .with_container_prefix(container_prefix);
        Self::from_options(&options)
    }

    pub fn from_options(options: &MinioGrainStorageOptions) -> Result<Self, ConfigError> {
        options.validate()?;

        let endpoint = options.endpoint_url()?;
        let region = Region::Custom {
            region: if options.region.trim().is_empty() {
                DEFAULT_REGION.to_string()
            } else {
                options.region.clone()
            },
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
        };

        let credentials = Credentials::new(
            Some(&options.access_key),
            Some(&options.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            region,
            credentials,
            naming: ContainerNaming::new(options.container_prefix.clone()),
        })
    }

    pub fn naming(&self) -> &ContainerNaming {
        &self.naming
    }

    fn bucket(&self, bucket: &str) -> Result<Box<Bucket>, ObjectStorageError> {
        trace!(%bucket, "Creating Minio client");

        let bucket = Bucket::new(bucket, self.region.clone(), self.credentials.clone())
            .map_err(|e| ObjectStorageError::Backend(e.to_string()))?;

        Ok(bucket.with_path_style())
    }
}

impl ObjectStorage for MinioStorage {
    async fn container_exists(&self, container: &str) -> Result<bool, ObjectStorageError> {
        let bucket = self.naming.container(container);
        let timer = CallTimer::start();

        // Probe the bucket itself, listing all buckets needs account wide rights
        let res = self
            .bucket(&bucket)?
            .list_page(String::new(), None, None, None, Some(1))
            .await;
        let exists = bucket_exists(res.map(|(_, code)| code), &bucket)?;

        trace!(time_ms = timer.elapsed_ms(), %bucket, exists, "Checked container");

        Ok(exists)
    }

    async fn create_container(&self, container: &str) -> Result<(), ObjectStorageError> {
        let bucket = self.naming.container(container);
        let timer = CallTimer::start();

        let res = Bucket::create_with_path_style(
            &bucket,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match res {
            Ok(created) if created.success() => {}
            Ok(created) if is_already_owned(created.response_code, &created.response_text) => {
                debug!(%bucket, "Container already exists");
            }
            Ok(created) => {
                return Err(classify(
                    S3Error::HttpFailWithBody(created.response_code, created.response_text),
                    &bucket,
                    None,
                ));
            }
            Err(S3Error::HttpFailWithBody(code, body)) if is_already_owned(code, &body) => {
                debug!(%bucket, "Container already exists");
            }
            Err(e) => return Err(classify(e, &bucket, None)),
        }

        trace!(time_ms = timer.elapsed_ms(), %bucket, "Created container");

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

        trace!(container, name, prefix, "Reading blob");
        let timer = CallTimer::start();

        let res = self
            .bucket(&bucket)?
            .get_object(&object_name)
            .await
            .map_err(|e| classify(e, &bucket, Some(&object_name)))?;
        let res = ensure_success(res, &bucket, Some(&object_name))?;

        trace!(
            time_ms = timer.elapsed_ms(),
            container,
            name,
            prefix,
            "Read blob"
        );

        Ok(res.bytes().clone())
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

        trace!(container, name, prefix, "Writing blob");
        let timer = CallTimer::start();

        let handle = self.bucket(&bucket)?;
        let res = match content_type {
            Some(content_type) => {
                handle
                    .put_object_with_content_type(&object_name, &content, content_type)
                    .await
            }
            None => handle.put_object(&object_name, &content).await,
        }
        .map_err(|e| classify(e, &bucket, Some(&object_name)))?;
        ensure_success(res, &bucket, Some(&object_name))?;

        trace!(
            time_ms = timer.elapsed_ms(),
            container,
            name,
            prefix,
            "Wrote blob"
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

        trace!(container, name, prefix, "Deleting blob");
        let timer = CallTimer::start();

        let res = self
            .bucket(&bucket)?
            .delete_object(&object_name)
            .await
            .map_err(|e| classify(e, &bucket, Some(&object_name)));

        match res.and_then(|r| ensure_success(r, &bucket, Some(&object_name))) {
            Ok(_) | Err(ObjectStorageError::ObjectNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        trace!(
            time_ms = timer.elapsed_ms(),
            container,
            name,
            prefix,
            "Deleted blob"
        );

        Ok(())
    }
}

fn ensure_success(
    res: ResponseData,
    bucket: &str,
    object_name: Option<&str>,
) -> Result<ResponseData, ObjectStorageError> {
    let code = res.status_code();
    if (200..300).contains(&code) {
        return Ok(res);
    }

    let body = String::from_utf8_lossy(res.as_slice()).into_owned();
    Err(classify(
        S3Error::HttpFailWithBody(code, body),
        bucket,
        object_name,
    ))
}

/// Map an S3 failure onto the gateway's error kinds.
///
/// A 404 is a missing bucket when the error code says so, otherwise a missing
/// object for object calls.
fn classify(e: S3Error, bucket: &str, object_name: Option<&str>) -> ObjectStorageError {
    match (&e, object_name) {
        (S3Error::HttpFailWithBody(404, body), _) if body.contains("NoSuchBucket") => {
            ObjectStorageError::ContainerNotFound(bucket.to_string())
        }
        (S3Error::HttpFailWithBody(404, _), Some(name)) => ObjectStorageError::ObjectNotFound {
            container: bucket.to_string(),
            name: name.to_string(),
        },
        (S3Error::HttpFailWithBody(404, _), None) => {
            ObjectStorageError::ContainerNotFound(bucket.to_string())
        }
        _ => ObjectStorageError::Backend(e.to_string()),
    }
}

/// Outcome of a bucket probe: a missing bucket is `false`, anything else but
/// success is an error.
fn bucket_exists(res: Result<u16, S3Error>, bucket: &str) -> Result<bool, ObjectStorageError> {
    let res = match res {
        Ok(code) if (200..300).contains(&code) => return Ok(true),
        Ok(code) => classify(S3Error::HttpFailWithBody(code, String::new()), bucket, None),
        Err(e) => classify(e, bucket, None),
    };

    match res {
        ObjectStorageError::ContainerNotFound(_) => Ok(false),
        e => Err(e),
    }
}

fn is_already_owned(code: u16, body: &str) -> bool {
    code == 409 && body.contains("BucketAlreadyOwnedByYou")
}
