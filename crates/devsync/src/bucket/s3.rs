//! S3-compatible object store (MinIO and friends).

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use secrecy::{ExposeSecret, SecretString};

use super::store::{ObjectStore, StoreError};

/// S3 caps DeleteObjects at 1000 keys per request.
const DELETE_BATCH_SIZE: usize = 1000;

/// Connection settings for [`S3ObjectStore`].
pub struct S3StoreConfig {
    pub endpoint: String,
    pub region: String,
    pub access_key: SecretString,
    pub secret_key: SecretString,
}

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Builds a path-style client with static credentials.
    pub async fn new(config: S3StoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.expose_secret(),
            config.secret_key.expose_secret(),
            None,
            None,
            "devsync",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
        }
    }

    /// Wraps an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn list_all_keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, bucket, None))?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }

    async fn delete_keys(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError> {
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StoreError::Request(e.to_string()))?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| StoreError::Request(e.to_string()))?;

            let response = self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| map_sdk_error(e, bucket, None))?;

            if let Some(failed) = response.errors().first() {
                return Err(StoreError::Request(format!(
                    "failed to delete '{}': {}",
                    failed.key().unwrap_or_default(),
                    failed.message().unwrap_or("unknown error")
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn remove_bucket_force(&self, bucket: &str) -> Result<(), StoreError> {
        let keys = self.list_all_keys(bucket).await?;
        log::debug!("Removing {} objects from bucket {}", keys.len(), bucket);
        self.delete_keys(bucket, &keys).await?;

        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, None))?;
        Ok(())
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, None))?;
        Ok(())
    }

    async fn put_file(&self, bucket: &str, key: &str, source: &Path) -> Result<(), StoreError> {
        let data = tokio::fs::read(source)
            .await
            .map_err(|e| StoreError::ReadFile {
                path: source.to_path_buf(),
                source: e,
            })?;

        if data.is_empty() {
            return Err(StoreError::EmptyContent(key.to_string()));
        }

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;
        Ok(())
    }
}

fn map_sdk_error<E, R>(err: SdkError<E, R>, bucket: &str, upload_key: Option<&str>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.code() {
        Some(code) => error_for_code(code, err.message(), bucket, upload_key),
        None => StoreError::Request(aws_sdk_s3::error::DisplayErrorContext(&err).to_string()),
    }
}

/// Maps an S3 error code to a [`StoreError`].
///
/// `upload_key` is set for object uploads, where `MissingContentLength`
/// means the payload was empty.
fn error_for_code(
    code: &str,
    message: Option<&str>,
    bucket: &str,
    upload_key: Option<&str>,
) -> StoreError {
    match (code, upload_key) {
        ("NoSuchBucket", _) => StoreError::NoSuchBucket(bucket.to_string()),
        ("BucketAlreadyExists" | "BucketAlreadyOwnedByYou", _) => {
            StoreError::BucketAlreadyExists(bucket.to_string())
        }
        ("MissingContentLength", Some(key)) => StoreError::EmptyContent(key.to_string()),
        _ => StoreError::Request(format!(
            "{}: {}",
            code,
            message.unwrap_or("no message")
        )),
    }
}
