//! High-level image operations.
//!
//! These functions combine calculations with backend execution.

use super::backend::{BackendError, ImageBackend};
use super::calculations::thumbnail_dimensions;
use super::params::{Quality, ResizeParams};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Configuration for thumbnail generation.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailConfig {
    /// Longest allowed edge in pixels.
    pub max_edge: u32,
    pub quality: Quality,
}

/// Plan a thumbnail resize without executing it.
///
/// Returns `None` when the dimensions cannot be brought under
/// `config.max_edge` (see [`thumbnail_dimensions`]).
pub fn plan_thumbnail(
    source: &Path,
    output: &Path,
    dimensions: (u32, u32),
    config: &ThumbnailConfig,
) -> Option<ResizeParams> {
    let (width, height) = thumbnail_dimensions(dimensions.0, dimensions.1, config.max_edge)?;
    Some(ResizeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width,
        height,
        quality: config.quality,
    })
}

/// Create a metadata-free thumbnail at `destination`.
///
/// The resize and the metadata strip both happen on a staged copy inside a
/// hidden scratch directory next to `destination`; only a fully stripped file
/// is renamed into place. A failure at any step leaves `destination`
/// untouched, so the next run retries instead of skipping a half-made
/// thumbnail.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    params: &ResizeParams,
    destination: &Path,
) -> Result<()> {
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    let file_name = params
        .output
        .file_name()
        .or_else(|| destination.file_name())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("no file name in {}", destination.display()),
            )
        })?;

    let scratch = tempfile::Builder::new()
        .prefix(".partial-")
        .tempdir_in(parent)?;
    let staged = scratch.path().join(file_name);

    backend.resize(&ResizeParams {
        output: staged.clone(),
        ..params.clone()
    })?;
    backend.strip_metadata(&staged)?;
    std::fs::rename(&staged, destination)?;
    Ok(())
}
