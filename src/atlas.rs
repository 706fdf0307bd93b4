//! Module providing an implementation for the [RangeReader] trait against the fixed
//! atlas deployment, which reuses one process-wide S3 client.
//!

use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::instrument;
use url::Url;

use crate::error::StorageError;
use crate::s3::S3Storage;
use crate::{RangeReader, Result};

/// Shared context for the atlas deployment: one client and a fixed bucket, supplied by
/// the caller. The client is owned outside this crate and must outlive every handle
/// constructed from this config.
#[derive(Debug, Clone)]
pub struct AtlasConfig {
  client: Client,
  bucket: String,
}

impl AtlasConfig {
  pub fn new(client: Client, bucket: impl Into<String>) -> Self {
    Self {
      client,
      bucket: bucket.into(),
    }
  }

  pub fn client(&self) -> &Client {
    &self.client
  }

  pub fn bucket(&self) -> &str {
    &self.bucket
  }
}

/// Implementation for the [RangeReader] trait against the atlas deployment. The uri host
/// is ignored; objects are resolved from the configured bucket and the uri path. Range
/// reads and requester pays behavior are delegated to [S3Storage] unchanged. Closing a
/// handle drops its view of the shared client without shutting the client down.
#[derive(Debug)]
pub struct AtlasStorage {
  config: AtlasConfig,
  key: String,
  request_payer: bool,
  inner: Option<S3Storage>,
}

impl AtlasStorage {
  pub fn new(config: AtlasConfig, key: String, request_payer: bool) -> Self {
    Self {
      config,
      key,
      request_payer,
      inner: None,
    }
  }

  /// Resolve the key from the uri path, taken verbatim. The uri host is not used.
  pub fn from_url(url: &Url, config: AtlasConfig, request_payer: bool) -> Self {
    Self::new(config, url.path().to_string(), request_payer)
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  fn inner_mut(&mut self) -> Result<&mut S3Storage> {
    let (bucket, key) = (self.config.bucket(), &self.key);
    let location = format!("atlas bucket `{bucket}` key `{key}`");
    self
      .inner
      .as_mut()
      .ok_or(StorageError::NotOpen(location))
  }
}

#[async_trait]
impl RangeReader for AtlasStorage {
  #[instrument(level = "trace", skip(self))]
  async fn open(&mut self) -> Result<()> {
    if self.inner.is_none() {
      self.inner = Some(S3Storage::new_with_client(
        self.config.client().clone(),
        self.config.bucket().to_string(),
        self.key.clone(),
        self.request_payer,
      ));
    }

    Ok(())
  }

  #[instrument(level = "trace", skip(self))]
  async fn get(&mut self, offset: u64, length: u64) -> Result<Bytes> {
    self.inner_mut()?.get(offset, length).await
  }

  #[instrument(level = "trace", skip(self))]
  async fn close(&mut self) -> Result<()> {
    self.inner.take();
    Ok(())
  }
}
