//! Image directory scanning and manifest validation.
//!
//! Stage 1 of a build. Lists the files physically present in the image
//! directory and cross-checks them against the identifiers declared in the
//! manifest:
//!
//! ```text
//! images/
//! ├── thumbnails/        # Generated, never scanned
//! ├── .DS_Store          # Hidden, ignored
//! ├── IMG_0001.jpg       # Declared → included
//! ├── IMG_0002.jpg       # Declared → included
//! └── IMG_0003.jpg       # Not declared → reported as not included
//! ```
//!
//! ## Validation
//!
//! - Every declared identifier must exist as a file, otherwise the build fails
//!   with [`ScanError::DeclaredImageMissing`] before any expensive work starts.
//! - Files without a manifest entry are only a warning: they are left out of
//!   the datamodel and listed at the end of the run.

use crate::config::Manifest;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Subdirectory of the image directory that holds generated thumbnails.
pub const THUMBNAIL_DIR: &str = "thumbnails";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Image directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("{filename} not found in {directory}")]
    DeclaredImageMissing { filename: String, directory: PathBuf },
}

/// A declared image that exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub filename: String,
    pub path: PathBuf,
}

/// Outcome of cross-checking the manifest against the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Declared and present, sorted by filename.
    pub included: Vec<SourceImage>,
    /// Present but undeclared, sorted by filename.
    pub not_included: Vec<String>,
}

/// List the regular files directly inside `dir`, sorted by name.
///
/// Symlinks count as the file they point to. Hidden files, dangling links and
/// subdirectories (including `thumbnails/`) are skipped.
pub fn list_image_files(dir: &Path) -> Result<Vec<String>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        names.push(name.to_string());
    }
    Ok(names)
}

/// Split present files into declared and undeclared.
///
/// Declared names are checked in sorted order, so the first missing file
/// reported is stable across runs.
pub fn validate<'a>(
    dir: &Path,
    present: &[String],
    declared: impl IntoIterator<Item = &'a String>,
) -> Result<ScanResult, ScanError> {
    let mut declared: Vec<&String> = declared.into_iter().collect();
    declared.sort();

    for name in &declared {
        if !present.iter().any(|p| p == *name) {
            return Err(ScanError::DeclaredImageMissing {
                filename: (*name).clone(),
                directory: dir.to_path_buf(),
            });
        }
    }

    let mut result = ScanResult::default();
    for name in present {
        if declared.binary_search(&name).is_ok() {
            result.included.push(SourceImage {
                filename: name.clone(),
                path: dir.join(name),
            });
        } else {
            result.not_included.push(name.clone());
        }
    }
    result.included.sort_by(|a, b| a.filename.cmp(&b.filename));
    result.not_included.sort();
    Ok(result)
}

/// Scan the manifest's image directory and validate it against the manifest.
pub fn scan(manifest: &Manifest) -> Result<ScanResult, ScanError> {
    let dir = manifest.image_dir();
    let present = list_image_files(&dir)?;
    validate(&dir, &present, manifest.images.keys())
}
