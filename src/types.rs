//! Types used to form range requests and to configure backends.
//!

use std::fmt;
use std::fmt::{Display, Formatter};

#[cfg(feature = "aws")]
use crate::atlas::AtlasConfig;

/// A byte range request with an inclusive start and end. A request for `length` covers
/// `length + 1` bytes, matching http `Range` header semantics where both endpoints are
/// part of the response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ByteRange {
  offset: u64,
  length: u64,
}

impl ByteRange {
  pub fn new(offset: u64, length: u64) -> Self {
    Self { offset, length }
  }

  pub fn offset(&self) -> u64 {
    self.offset
  }

  pub fn length(&self) -> u64 {
    self.length
  }

  /// The inclusive end of the range.
  pub fn end(&self) -> u64 {
    self.offset.saturating_add(self.length)
  }

  /// The number of bytes the range covers.
  pub fn count(&self) -> u64 {
    self.length.saturating_add(1)
  }
}

impl Display for ByteRange {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "bytes={}-{}", self.offset, self.end())
  }
}

/// Caller-supplied configuration handed to [Storage::from_uri][crate::Storage::from_uri].
/// All fields are optional and only consulted by the backends they apply to.
#[derive(Clone, Debug, Default)]
pub struct StorageOptions {
  request_payer: bool,
  #[cfg(feature = "aws")]
  atlas: Option<AtlasConfig>,
}

impl StorageOptions {
  /// Accept data-transfer charges when reading from a requester pays bucket.
  pub fn with_request_payer(mut self, request_payer: bool) -> Self {
    self.request_payer = request_payer;
    self
  }

  pub fn request_payer(&self) -> bool {
    self.request_payer
  }

  /// Set the shared client and fixed bucket used by the atlas deployment.
  #[cfg(feature = "aws")]
  pub fn with_atlas(mut self, atlas: AtlasConfig) -> Self {
    self.atlas = Some(atlas);
    self
  }

  #[cfg(feature = "aws")]
  pub fn atlas(&self) -> Option<&AtlasConfig> {
    self.atlas.as_ref()
  }

  #[cfg(feature = "aws")]
  pub(crate) fn into_atlas(self) -> Option<AtlasConfig> {
    self.atlas
  }
}
