//! Module providing the abstractions needed to read byte ranges from a storage.
//!
//! A [Storage] is selected from a location uri by [Storage::from_uri], opened, read with
//! `get`, and closed. Every operation is a suspension point; dropping an in-flight `get`
//! cancels the underlying request, and a later `close` still releases the resources
//! acquired by `open`.

pub use crate::error::{Result, StorageError};
pub use crate::types::{ByteRange, StorageOptions};

#[cfg(feature = "aws")]
use crate::atlas::AtlasStorage;
use crate::local::LocalStorage;
#[cfg(feature = "aws")]
use crate::s3::S3Storage;
use crate::url::UrlStorage;
#[cfg(feature = "gcs")]
use crate::gcs::GcsStorage;
use async_trait::async_trait;
use bytes::Bytes;
use cfg_if::cfg_if;
use ::url::{ParseError, Url};
use std::fmt;
use std::fmt::{Debug, Formatter};

#[cfg(feature = "aws")]
pub mod atlas;
pub mod error;
#[cfg(feature = "gcs")]
pub mod gcs;
pub mod local;
#[cfg(feature = "aws")]
pub mod s3;
pub mod types;
pub mod url;

/// A RangeReader represents some kind of storage a contiguous slice of bytes can be read
/// from, either locally or in the cloud. A handle is constructed closed; `get` is only
/// valid between `open` and `close`.
#[async_trait]
pub trait RangeReader: Debug {
  /// Acquire the backend's connection, session or file resource. Opening an already open
  /// handle has no effect.
  async fn open(&mut self) -> Result<()>;

  /// Read `length + 1` bytes starting at `offset`, the range endpoints being inclusive as
  /// in http `Range` headers. Backends return fewer bytes only when the data ends early.
  async fn get(&mut self, offset: u64, length: u64) -> Result<Bytes>;

  /// Release everything acquired by `open`, even if reads failed in between. Closing a
  /// closed handle has no effect.
  async fn close(&mut self) -> Result<()>;
}

/// The top-level storage type is created from any `RangeReader`.
pub struct Storage {
  inner: Box<dyn RangeReader + Send + Sync>,
}

impl Storage {
  pub fn new(inner: impl RangeReader + Send + Sync + 'static) -> Self {
    Self {
      inner: Box::new(inner),
    }
  }

  /// Get the inner value.
  pub fn into_inner(self) -> Box<dyn RangeReader + Send + Sync> {
    self.inner
  }

  /// Select a backend from the location's uri scheme and construct it, not yet opened.
  /// This performs no i/o. A location without any scheme selects local storage, and an
  /// unrecognized scheme is an error naming that scheme.
  pub fn from_uri(location: &str, options: StorageOptions) -> Result<Self> {
    match Url::parse(location) {
      Ok(url) => Self::from_url(&url, options),
      Err(ParseError::RelativeUrlWithoutBase) => Ok(Storage::new(LocalStorage::new(location))),
      Err(err) => Err(StorageError::InvalidUri(err.to_string())),
    }
  }

  fn from_url(url: &Url, options: StorageOptions) -> Result<Self> {
    match url.scheme() {
      "http" | "https" => Ok(Storage::new(UrlStorage::new(url.clone()))),
      "s3" => {
        cfg_if! {
          if #[cfg(feature = "aws")] {
            Ok(Storage::new(S3Storage::from_url(url, options.request_payer())?))
          } else {
            Err(StorageError::UnavailableBackend(
              "s3 requires the `aws` feature".to_string(),
            ))
          }
        }
      }
      "atlas" => {
        cfg_if! {
          if #[cfg(feature = "aws")] {
            let request_payer = options.request_payer();
            let atlas = options.into_atlas().ok_or_else(|| {
              StorageError::UnavailableBackend(
                "atlas locations require an atlas config".to_string(),
              )
            })?;

            Ok(Storage::new(AtlasStorage::from_url(url, atlas, request_payer)))
          } else {
            Err(StorageError::UnavailableBackend(
              "atlas requires the `aws` feature".to_string(),
            ))
          }
        }
      }
      "gs" => {
        cfg_if! {
          if #[cfg(feature = "gcs")] {
            Ok(Storage::new(GcsStorage::from_url(url)?))
          } else {
            Err(StorageError::UnavailableBackend(
              "gs requires the `gcs` feature".to_string(),
            ))
          }
        }
      }
      "file" => {
        let path = url
          .to_file_path()
          .map_err(|_| StorageError::InvalidUri(format!("`{url}` is not a file path")))?;

        Ok(Storage::new(LocalStorage::new(path)))
      }
      scheme => Err(StorageError::UnsupportedScheme(scheme.to_string())),
    }
  }
}

impl Debug for Storage {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "Storage({:?})", self.inner)
  }
}

#[async_trait]
impl RangeReader for Storage {
  async fn open(&mut self) -> Result<()> {
    self.inner.open().await
  }

  async fn get(&mut self, offset: u64, length: u64) -> Result<Bytes> {
    self.inner.get(offset, length).await
  }

  async fn close(&mut self) -> Result<()> {
    self.inner.close().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn backend_of(location: &str) -> String {
    format!(
      "{:?}",
      Storage::from_uri(location, Default::default()).unwrap()
    )
  }

  #[test]
  fn from_uri_http() {
    assert!(backend_of("http://url.io/archive.pmtiles").contains("UrlStorage"));
    assert!(backend_of("https://url.io/archive.pmtiles").contains("UrlStorage"));
  }

  #[test]
  fn from_uri_without_scheme_selects_local() {
    assert!(backend_of("archive.pmtiles").contains("LocalStorage"));
  }

  #[test]
  fn from_uri_file_scheme_selects_local() {
    let debug = backend_of("file:///maps/archive.pmtiles");
    assert!(debug.contains("LocalStorage"));
    assert!(debug.contains("archive.pmtiles"));
  }

  #[cfg(feature = "aws")]
  #[test]
  fn from_uri_s3() {
    assert!(backend_of("s3://bucket/archive.pmtiles").contains("S3Storage"));
  }

  #[cfg(feature = "aws")]
  #[test]
  fn from_uri_atlas_requires_config() {
    let result = Storage::from_uri("atlas://host/archive.pmtiles", Default::default());
    assert!(matches!(result, Err(StorageError::UnavailableBackend(_))));
  }

  #[cfg(feature = "aws")]
  #[test]
  fn from_uri_atlas() {
    use crate::atlas::AtlasConfig;

    let (http_client, _rx) = aws_smithy_http_client::test_util::capture_request(None);
    let config = AtlasConfig::new(crate::s3::tests::test_client(http_client), "tiles-bucket");
    let options = StorageOptions::default().with_atlas(config);

    let storage = Storage::from_uri("atlas://host/archive.pmtiles", options).unwrap();
    assert!(format!("{storage:?}").contains("AtlasStorage"));
  }

  #[cfg(feature = "gcs")]
  #[test]
  fn from_uri_gs() {
    assert!(backend_of("gs://bucket/archive.pmtiles").contains("GcsStorage"));
  }

  #[test]
  fn from_uri_unsupported_scheme_names_scheme() {
    let result = Storage::from_uri("ftp://host/path", Default::default());
    assert!(matches!(result, Err(StorageError::UnsupportedScheme(scheme)) if scheme == "ftp"));
  }

  #[tokio::test]
  async fn storage_forwards_the_contract() {
    let (path, _base_path) = crate::local::tests::create_local_test_file().await;

    let mut storage =
      Storage::from_uri(path.to_str().unwrap(), Default::default()).unwrap();
    storage.open().await.unwrap();

    let result = storage.get(10, 4).await.unwrap();
    assert_eq!(result.len(), 5);

    storage.close().await.unwrap();
    assert!(matches!(
      storage.get(0, 0).await,
      Err(StorageError::NotOpen(_))
    ));
  }
}
