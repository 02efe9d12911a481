//! Thumbnail synchronization.
//!
//! Stage 3 of a build. Makes sure every image in the datamodel has a
//! metadata-free thumbnail under `<image_directory>/thumbnails/`.
//!
//! ## Sizing
//!
//! The longer edge is divided by the smallest whole number that brings it
//! under `thumbnail_size`, trying at most [`MAX_DIVISOR_STEPS`] divisors:
//!
//! ```text
//! 4000×3000 @ 400  →  ÷10  →  400×300
//! 4001×3000 @ 400  →  ÷11  →  364×273
//! ```
//!
//! ## Idempotence
//!
//! A thumbnail that already exists is never regenerated, even if its source
//! changed. Delete it to force a rebuild.
//!
//! ## Failure policy
//!
//! All thumbnails are planned before any is created, so an image that cannot
//! be sized aborts the run without touching the thumbnail directory. Tool
//! failures abort immediately; thumbnails finished before the failure stay.

use crate::config::GalleryConfig;
use crate::imaging::{
    BackendError, ImageBackend, MAX_DIVISOR_STEPS, Quality, ResizeParams, ThumbnailConfig,
    create_thumbnail, plan_thumbnail,
};
use crate::scan::THUMBNAIL_DIR;
use crate::types::Datamodel;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to create thumbnail for {filename}: {source}")]
    Backend {
        filename: String,
        source: BackendError,
    },
    #[error(
        "cannot shrink {filename} ({width}x{height}) to {max}px within {} steps",
        MAX_DIVISOR_STEPS
    )]
    ResizeIterationExceeded {
        filename: String,
        width: u32,
        height: u32,
        max: u32,
    },
}

impl ThumbnailConfig {
    /// Build a ThumbnailConfig from the manifest's `[config]` values.
    pub fn from_gallery_config(config: &GalleryConfig) -> Self {
        Self {
            max_edge: config.thumbnail_size,
            quality: Quality::new(config.thumbnail_quality),
        }
    }
}

/// Progress of the synchronization loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailEvent {
    Creating {
        index: usize,
        total: usize,
        filename: String,
    },
    Skipped {
        index: usize,
        total: usize,
        filename: String,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailStats {
    pub created: u32,
    pub skipped: u32,
}

impl fmt::Display for ThumbnailStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} created, {} up to date", self.created, self.skipped)
    }
}

/// Path of the thumbnail for `filename`.
pub fn thumbnail_path(image_dir: &Path, filename: &str) -> PathBuf {
    image_dir.join(THUMBNAIL_DIR).join(filename)
}

enum Planned<'a> {
    Present(&'a str),
    Create(&'a str, ResizeParams),
}

/// Create every missing thumbnail for the images in `datamodel`.
pub fn sync_thumbnails(
    datamodel: &Datamodel,
    image_dir: &Path,
    config: &ThumbnailConfig,
    backend: &impl ImageBackend,
    mut on_event: impl FnMut(&ThumbnailEvent),
) -> Result<ThumbnailStats, ThumbnailError> {
    let mut plans = Vec::with_capacity(datamodel.by_filename.len());
    for (filename, record) in &datamodel.by_filename {
        let destination = thumbnail_path(image_dir, filename);
        if destination.exists() {
            plans.push(Planned::Present(filename));
            continue;
        }
        let width = record.image_width;
        let height = record.image_height;
        let params = plan_thumbnail(
            &image_dir.join(filename),
            &destination,
            (width, height),
            config,
        )
        .ok_or_else(|| ThumbnailError::ResizeIterationExceeded {
            filename: filename.clone(),
            width,
            height,
            max: config.max_edge,
        })?;
        plans.push(Planned::Create(filename, params));
    }

    std::fs::create_dir_all(image_dir.join(THUMBNAIL_DIR))?;

    let total = plans.len();
    let mut stats = ThumbnailStats::default();
    for (i, plan) in plans.into_iter().enumerate() {
        let index = i + 1;
        match plan {
            Planned::Present(filename) => {
                stats.skipped += 1;
                on_event(&ThumbnailEvent::Skipped {
                    index,
                    total,
                    filename: filename.to_string(),
                });
            }
            Planned::Create(filename, params) => {
                on_event(&ThumbnailEvent::Creating {
                    index,
                    total,
                    filename: filename.to_string(),
                });
                create_thumbnail(backend, &params, &params.output).map_err(|source| {
                    ThumbnailError::Backend {
                        filename: filename.to_string(),
                        source,
                    }
                })?;
                stats.created += 1;
            }
        }
    }
    Ok(stats)
}
