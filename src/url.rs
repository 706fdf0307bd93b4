//! Module providing an implementation for the [RangeReader] trait over http and https.
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

/// Implementation for the [RangeReader] trait over http and https. A single reusable
/// client is built on `open`, and each `get` is a self-contained `Range` request
/// against the handle's url.
#[derive(Debug)]
pub struct UrlStorage {
  url: Url,
  client: Option<Client>,
}

impl UrlStorage {
  pub fn new(url: Url) -> Self {
    Self { url, client: None }
  }

  /// Construct with an existing client rather than building one on `open`.
  pub fn new_with_client(client: Client, url: Url) -> Self {
    Self {
      url,
      client: Some(client),
    }
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  fn client(&self) -> Result<&Client> {
    self
      .client
      .as_ref()
      .ok_or_else(|| StorageError::NotOpen(self.url.to_string()))
  }
}

#[async_trait]
impl RangeReader for UrlStorage {
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

  /// Issue one ranged GET request. A non-success status aborts the call rather than
  /// returning partial or empty bytes.
  #[instrument(level = "debug", skip(self))]
  async fn get(&mut self, offset: u64, length: u64) -> Result<Bytes> {
    let range = ByteRange::new(offset, length);
    let client = self.client()?;

    let response = client
      .get(self.url.clone())
      .header(RANGE, range.to_string())
      .send()
      .await
      .map_err(|err| StorageError::ResponseError(format!("{} with url `{}`", err, self.url)))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
      return Err(StorageError::ResponseError(format!(
        "url returned {} for `{}`",
        status, self.url
      )));
    }

    let bytes = response
      .bytes()
      .await
      .map_err(|err| StorageError::ResponseError(format!("reading body from response: {err}")))?;

    debug!(url = %self.url, %range, len = bytes.len(), "read range over http");
    Ok(bytes)
  }

  #[instrument(level = "debug", skip(self))]
  async fn close(&mut self) -> Result<()> {
    self.client.take();
    Ok(())
  }
}
