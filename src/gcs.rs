//! Module providing an implementation for the [RangeReader] trait using a cloud storage
//! bucket, read through ranged media downloads.
//!

use async_trait::async_trait;
use bytes::Bytes;
use http::header::RANGE;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};
use url::Url;

use crate::error::StorageError;
use crate::types::ByteRange;
use crate::{RangeReader, Result};

/// Public endpoint serving bucket objects.
const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Implementation for the [RangeReader] trait using a cloud storage bucket resolved from
/// a `gs://` uri. Each `get` is a media download `GET {endpoint}/{bucket}/{key}` carrying
/// the same `Range` header as the http backend. Objects are read without credentials, so
/// the bucket must allow the caller access.
#[derive(Debug)]
pub struct GcsStorage {
  endpoint: String,
  bucket: String,
  key: String,
  client: Option<Client>,
}

impl GcsStorage {
  pub fn new(bucket: String, key: String) -> Self {
    Self::new_with_endpoint(DEFAULT_ENDPOINT, bucket, key)
  }

  /// Construct against a different endpoint, e.g. a local emulator.
  pub fn new_with_endpoint(endpoint: impl Into<String>, bucket: String, key: String) -> Self {
    Self {
      endpoint: endpoint.into(),
      bucket,
      key,
      client: None,
    }
  }

  /// Resolve the bucket from the uri host and the key from the uri path with the leading
  /// separator stripped.
  pub fn from_url(url: &Url) -> Result<Self> {
    let bucket = url
      .host_str()
      .ok_or_else(|| StorageError::InvalidUri(format!("missing bucket in `{url}`")))?;
    let key = url.path().trim_start_matches('/');

    Ok(Self::new(bucket.to_string(), key.to_string()))
  }

  pub fn bucket(&self) -> &str {
    &self.bucket
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  fn object_url(&self) -> String {
    format!("{}/{}/{}", self.endpoint, self.bucket, self.key)
  }

  fn client(&self) -> Result<&Client> {
    self
      .client
      .as_ref()
      .ok_or_else(|| StorageError::NotOpen(format!("gs://{}/{}", self.bucket, self.key)))
  }
}

#[async_trait]
impl RangeReader for GcsStorage {
  #[instrument(level = "debug", skip(self))]
  async fn open(&mut self) -> Result<()> {
    if self.client.is_none() {
      let client = ClientBuilder::new()
        .build()
        .map_err(|err| StorageError::InternalError(format!("failed to build client: {err}")))?;
      self.client = Some(client);
    }

    Ok(())
  }

  #[instrument(level = "debug", skip(self))]
  async fn get(&mut self, offset: u64, length: u64) -> Result<Bytes> {
    let range = ByteRange::new(offset, length);
    let url = self.object_url();
    let client = self.client()?;

    let response = client
      .get(url.as_str())
      .header(RANGE, range.to_string())
      .send()
      .await
      .map_err(|err| StorageError::ResponseError(format!("{err} with url `{url}`")))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
      return Err(StorageError::ResponseError(format!(
        "url returned {status} for `{url}`"
      )));
    }

    let bytes = response
      .bytes()
      .await
      .map_err(|err| StorageError::ResponseError(format!("reading body from response: {err}")))?;

    debug!(bucket = %self.bucket, key = %self.key, %range, len = bytes.len(), "read range from bucket");
    Ok(bytes)
  }

  #[instrument(level = "debug", skip(self))]
  async fn close(&mut self) -> Result<()> {
    self.client.take();
    Ok(())
  }
}
