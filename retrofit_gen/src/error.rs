/* Error taxonomy for per-type processing */

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessError {
  /* Validation failed; the diagnostic has already been reported */
  #[error("processing of this type was aborted")]
  Abort,

  /* A referenced type is not in the current snapshot; retry on the next pass */
  #[error("type {name} is not defined yet")]
  MissingType { name: String },

  #[error("{0}")]
  Unexpected(String),
}

pub type ProcessResult<T> = Result<T, ProcessError>;

#[derive(Debug, Error)]
pub enum RenderError {
  #[error("failed to serialize descriptor: {0}")]
  Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum EmitError {
  #[error("could not write generated unit {name} to {path}: {source}")]
  Io {
    name: String,
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("generated unit {0} was already emitted")]
  Duplicate(String),
}

impl From<RenderError> for ProcessError {
  fn from(err: RenderError) -> Self {
    ProcessError::Unexpected(err.to_string())
  }
}

impl From<EmitError> for ProcessError {
  fn from(err: EmitError) -> Self {
    ProcessError::Unexpected(err.to_string())
  }
}
