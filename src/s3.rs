//! Module providing an implementation for the [RangeReader] trait using Amazon's S3 object storage service.
//!

use std::fmt::Debug;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::types::RequestPayer;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::StorageError;
use crate::error::StorageError::{AwsS3Error, InvalidUri, IoError, KeyNotFound};
use crate::types::ByteRange;
use crate::{RangeReader, Result};

/// Implementation for the [RangeReader] trait utilising data from an S3 bucket. The
/// bucket and key are resolved from an `s3://` uri, and each `get` is a ranged
/// `GetObject` request.
#[derive(Debug)]
pub struct S3Storage {
  bucket: String,
  key: String,
  request_payer: bool,
  client: Option<Client>,
}

impl S3Storage {
  pub fn new(bucket: String, key: String, request_payer: bool) -> Self {
    Self {
      bucket,
      key,
      request_payer,
      client: None,
    }
  }

  /// Construct with an existing client rather than loading the default config on `open`.
  pub fn new_with_client(client: Client, bucket: String, key: String, request_payer: bool) -> Self {
    Self {
      bucket,
      key,
      request_payer,
      client: Some(client),
    }
  }

  /// Resolve the bucket from the uri host and the key from the uri path.
  pub fn from_url(url: &Url, request_payer: bool) -> Result<Self> {
    let bucket = url
      .host_str()
      .ok_or_else(|| InvalidUri(format!("missing bucket in `{url}`")))?;
    let key = url.path().trim_matches('/');

    Ok(Self::new(
      bucket.to_string(),
      key.to_string(),
      request_payer,
    ))
  }

  pub fn bucket(&self) -> &str {
    &self.bucket
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  fn client(&self) -> Result<&Client> {
    self
      .client
      .as_ref()
      .ok_or_else(|| StorageError::NotOpen(format!("s3://{}/{}", self.bucket, self.key)))
  }

  /// Get a range of the object, fully read into memory.
  async fn get_object(&self, range: ByteRange) -> Result<Bytes> {
    let client = self.client()?;

    let mut request = client
      .get_object()
      .bucket(&self.bucket)
      .key(&self.key)
      .range(range.to_string());
    if self.request_payer {
      request = request.request_payer(RequestPayer::Requester);
    }

    let output = request
      .send()
      .await
      .map_err(|err| Self::map_get_error(&self.key, err))?;

    let data = output
      .body
      .collect()
      .await
      .map_err(|err| IoError("collecting object body".to_string(), err.into()))?;

    Ok(data.into_bytes())
  }

  fn map_get_error<T>(key: &str, error: SdkError<GetObjectError, T>) -> StorageError
  where
    T: Debug + Send + Sync + 'static,
  {
    warn!("S3 error: {}", DisplayErrorContext(&error));

    let error = error.into_service_error();
    if let GetObjectError::NoSuchKey(_) = error {
      KeyNotFound(key.to_string())
    } else {
      AwsS3Error(error.to_string(), key.to_string())
    }
  }
}

#[async_trait]
impl RangeReader for S3Storage {
  #[instrument(level = "trace", skip(self))]
  async fn open(&mut self) -> Result<()> {
    if self.client.is_none() {
      let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
      self.client = Some(Client::new(&config));
    }

    Ok(())
  }

  #[instrument(level = "trace", skip(self))]
  async fn get(&mut self, offset: u64, length: u64) -> Result<Bytes> {
    let range = ByteRange::new(offset, length);
    let bytes = self.get_object(range).await?;

    debug!(bucket = %self.bucket, key = %self.key, %range, len = bytes.len(), "read range from s3");
    Ok(bytes)
  }

  #[instrument(level = "trace", skip(self))]
  async fn close(&mut self) -> Result<()> {
    self.client.take();
    Ok(())
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use aws_credential_types::Credentials;
  use aws_sdk_s3::config::Region;
  use aws_smithy_http_client::test_util::capture_request;

  use super::*;

  #[test]
  fn from_url_resolves_bucket_and_key() {
    let url = Url::parse("s3://bucket/key.ext").unwrap();
    let storage = S3Storage::from_url(&url, false).unwrap();

    assert_eq!(storage.bucket(), "bucket");
    assert_eq!(storage.key(), "key.ext");
  }

  #[test]
  fn from_url_resolves_nested_key() {
    let url = Url::parse("s3://bucket/maps/firenze.pmtiles").unwrap();
    let storage = S3Storage::from_url(&url, false).unwrap();

    assert_eq!(storage.bucket(), "bucket");
    assert_eq!(storage.key(), "maps/firenze.pmtiles");
  }

  #[tokio::test]
  async fn sends_inclusive_range_header() {
    let (http_client, rx) = capture_request(None);
    let mut storage = S3Storage::new_with_client(
      test_client(http_client),
      "bucket".to_string(),
      "key.ext".to_string(),
      false,
    );

    storage.get(10, 4).await.unwrap();

    let request = rx.expect_request();
    assert_eq!(request.headers().get("range"), Some("bytes=10-14"));
    assert_eq!(request.headers().get("x-amz-request-payer"), None);
    assert!(request.uri().to_string().contains("bucket"));
  }

  #[tokio::test]
  async fn sends_request_payer_when_configured() {
    let (http_client, rx) = capture_request(None);
    let mut storage = S3Storage::new_with_client(
      test_client(http_client),
      "bucket".to_string(),
      "key.ext".to_string(),
      true,
    );

    storage.get(0, 9).await.unwrap();

    let request = rx.expect_request();
    assert_eq!(request.headers().get("range"), Some("bytes=0-9"));
    assert_eq!(
      request.headers().get("x-amz-request-payer"),
      Some("requester")
    );
  }

  #[tokio::test]
  async fn get_before_open_fails() {
    let mut storage = S3Storage::new("bucket".to_string(), "key.ext".to_string(), false);

    let result = storage.get(0, 0).await;
    assert!(matches!(result, Err(StorageError::NotOpen(_))));
  }

  #[tokio::test]
  async fn get_after_close_fails() {
    let (http_client, _rx) = capture_request(None);
    let mut storage = S3Storage::new_with_client(
      test_client(http_client),
      "bucket".to_string(),
      "key.ext".to_string(),
      false,
    );

    storage.close().await.unwrap();

    let result = storage.get(0, 0).await;
    assert!(matches!(result, Err(StorageError::NotOpen(_))));
  }

  pub(crate) fn test_client(
    http_client: impl aws_sdk_s3::config::HttpClient + 'static,
  ) -> Client {
    let config = aws_sdk_s3::Config::builder()
      .behavior_version(BehaviorVersion::latest())
      .credentials_provider(Credentials::for_tests())
      .region(Region::new("ap-southeast-2"))
      .http_client(http_client)
      .build();

    Client::from_conf(config)
  }
}
