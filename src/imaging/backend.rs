//! Image tool backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations a build needs from the
//! outside world: reading EXIF, resizing, and stripping metadata from the
//! resized result.
//!
//! The production implementation is
//! [`ExternalToolsBackend`](super::external_backend::ExternalToolsBackend),
//! which shells out to `exiftool` and `magick`. Tests use the recording
//! [`tests::MockBackend`] so the pipeline can run without either tool.

use super::params::ResizeParams;
use crate::metadata::RawMetadata;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("\"{tool}\" is not installed or not on PATH")]
    MissingTool { tool: &'static str },
    #[error("{tool} failed on {path}: {message}")]
    ToolFailed {
        tool: &'static str,
        path: PathBuf,
        message: String,
    },
    #[error("{tool} returned unexpected output for {path}: {message}")]
    UnexpectedOutput {
        tool: &'static str,
        path: PathBuf,
        message: String,
    },
}

/// Trait for external image tooling.
///
/// Calls block until the tool exits; there is no timeout.
pub trait ImageBackend {
    /// Fail with [`BackendError::MissingTool`] if a required tool is absent.
    fn check_tools(&self) -> Result<(), BackendError>;

    /// Read the flat EXIF record of one image.
    fn read_metadata(&self, path: &Path) -> Result<RawMetadata, BackendError>;

    /// Write a resized copy of `params.source` to `params.output`.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;

    /// Remove all embedded metadata from `path` in place.
    fn strip_metadata(&self, path: &Path) -> Result<(), BackendError>;
}
