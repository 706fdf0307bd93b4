//! Module providing an implementation for the [RangeReader] trait using the local file system.
//!

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tracing::debug;
use tracing::instrument;

use crate::error::StorageError;
use crate::types::ByteRange;
use crate::{RangeReader, Result};

/// Implementation for the [RangeReader] trait using the local file system. The file is
/// opened read-only and the descriptor is held for the lifetime of the handle. Reads are
/// a stateful seek-then-read pair, serialized by the `&mut` receiver.
#[derive(Debug)]
pub struct LocalStorage {
  path: PathBuf,
  file: Option<File>,
}

impl LocalStorage {
  pub fn new<P: AsRef<Path>>(path: P) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
      file: None,
    }
  }

  pub fn path(&self) -> &Path {
    self.path.as_path()
  }

  fn file_mut(&mut self) -> Result<&mut File> {
    let path = &self.path;
    self
      .file
      .as_mut()
      .ok_or_else(|| StorageError::NotOpen(path.to_string_lossy().to_string()))
  }
}

#[async_trait]
impl RangeReader for LocalStorage {
  #[instrument(level = "debug", skip(self))]
  async fn open(&mut self) -> Result<()> {
    if self.file.is_none() {
      let file = File::open(&self.path)
        .await
        .map_err(|err| StorageError::IoError(format!("opening `{}`", self.path.display()), err))?;
      self.file = Some(file);
    }

    Ok(())
  }

  /// Seek to `offset` and read `length + 1` bytes. A file that ends early returns the
  /// shorter result rather than erroring.
  #[instrument(level = "debug", skip(self))]
  async fn get(&mut self, offset: u64, length: u64) -> Result<Bytes> {
    let range = ByteRange::new(offset, length);

    let file = self.file_mut()?;
    file.seek(SeekFrom::Start(offset)).await?;

    let mut buf = Vec::new();
    file.take(range.count()).read_to_end(&mut buf).await?;

    debug!(path = ?self.path, %range, len = buf.len(), "read range from file");
    Ok(buf.into())
  }

  #[instrument(level = "debug", skip(self))]
  async fn close(&mut self) -> Result<()> {
    self.file.take();
    Ok(())
  }
}
