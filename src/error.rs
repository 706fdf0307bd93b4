//! Error and result types for tileset storage.
//!

use std::io;
use std::io::ErrorKind;
use thiserror::Error;

/// The result type for storage.
pub type Result<T> = core::result::Result<T, StorageError>;

/// Storage error type.
#[derive(Error, Debug)]
pub enum StorageError {
  #[error("unsupported scheme: `{0}`")]
  UnsupportedScheme(String),

  #[error("backend not available: `{0}`")]
  UnavailableBackend(String),

  #[error("invalid uri: `{0}`")]
  InvalidUri(String),

  #[error("key not found in storage: `{0}`")]
  KeyNotFound(String),

  #[error("`{0}`: `{1}`")]
  IoError(String, io::Error),

  #[error("response error: `{0}`")]
  ResponseError(String),

  #[cfg(feature = "aws")]
  #[error("aws error: `{0}`, with key: `{1}`")]
  AwsS3Error(String, String),

  #[error("internal error: `{0}`")]
  InternalError(String),

  #[error("storage not open: `{0}`")]
  NotOpen(String),
}

impl From<StorageError> for io::Error {
  fn from(err: StorageError) -> Self {
    match err {
      StorageError::IoError(_, ref io_error) => Self::new(io_error.kind(), err),
      err => Self::new(ErrorKind::Other, err),
    }
  }
}

impl From<io::Error> for StorageError {
  fn from(error: io::Error) -> Self {
    Self::IoError("io error".to_string(), error)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn io_error_from_storage_error_keeps_kind() {
    let err = StorageError::IoError(
      "seeking".to_string(),
      io::Error::new(ErrorKind::UnexpectedEof, "eof"),
    );
    let result = io::Error::from(err);
    assert_eq!(result.kind(), ErrorKind::UnexpectedEof);
  }

  #[test]
  fn unsupported_scheme_names_scheme() {
    let err = StorageError::UnsupportedScheme("ftp".to_string());
    assert_eq!(err.to_string(), "unsupported scheme: `ftp`");
  }
}
