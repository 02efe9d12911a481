//! Datamodel reconciliation.
//!
//! Stage 2 of a build. Turns the validated image list into a fresh
//! [`Datamodel`]:
//!
//! ```text
//! for each included image:
//!     record = prior.lookup(filename, sha256(file))   // cache hit
//!           ?? normalize(exiftool(file), added_day)   // cache miss
//!     record.tags, record.rating = manifest[filename] // always
//! indices = derive(by_filename)
//! ```
//!
//! ## Manifest-owned fields
//!
//! Tags and rating are taken from the manifest on every run, including for
//! cached records, so retagging an image never requires re-reading its EXIF.
//!
//! ## Derived indices
//!
//! `all_images`, `by_tag`, `by_rating` and `by_added` are computed in one
//! pass over the final `by_filename` map by [`DatamodelBuilder::build`].
//! Old index entries are never merged, so a removed tag or a changed rating
//! cannot leave a stale bucket behind.
//!
//! ## Failure policy
//!
//! Every error is fatal. Nothing is written by this stage, so aborting here
//! leaves the previous artifact in place.

use crate::cache::{CacheStats, PriorState, Snapshot, hash_file};
use crate::config::Manifest;
use crate::imaging::{BackendError, ImageBackend};
use crate::metadata::{NormalizeError, added_day, normalize};
use crate::scan::SourceImage;
use crate::types::{About, Datamodel, ImageRecord};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

/// Textual form of the `generated` stamp.
pub const GENERATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read exif data for {filename}: {source}")]
    Backend {
        filename: String,
        source: BackendError,
    },
    #[error("{source} for image: {filename}")]
    Normalize {
        filename: String,
        source: NormalizeError,
    },
    #[error("manifest field '{field}' not set for image: {filename}")]
    MissingField {
        filename: String,
        field: &'static str,
    },
    #[error("{0} has no manifest entry")]
    Undeclared(String),
}

/// Progress of the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Record taken from the prior state.
    Reused {
        index: usize,
        total: usize,
        filename: String,
    },
    /// EXIF is about to be read.
    Reading {
        index: usize,
        total: usize,
        filename: String,
    },
}

/// Output of [`reconcile`].
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub datamodel: Datamodel,
    /// Cache to persist for the next run.
    pub snapshot: Snapshot,
    pub stats: CacheStats,
}

/// The derived views over `by_filename`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indices {
    pub all_images: BTreeSet<String>,
    pub by_added: BTreeMap<i64, BTreeSet<String>>,
    pub by_rating: BTreeMap<i64, BTreeSet<String>>,
    pub by_tag: BTreeMap<String, BTreeSet<String>>,
}

impl Indices {
    /// Compute every index from the records alone.
    pub fn derive(by_filename: &BTreeMap<String, ImageRecord>) -> Self {
        let mut indices = Self::default();
        for (filename, record) in by_filename {
            indices.all_images.insert(filename.clone());
            indices
                .by_added
                .entry(record.added)
                .or_default()
                .insert(filename.clone());
            indices
                .by_rating
                .entry(record.rating)
                .or_default()
                .insert(filename.clone());
            for tag in &record.tags {
                indices
                    .by_tag
                    .entry(tag.clone())
                    .or_default()
                    .insert(filename.clone());
            }
        }
        indices
    }
}

/// Accumulates records for one run and produces the final [`Datamodel`].
#[derive(Debug, Clone, Default)]
pub struct DatamodelBuilder {
    about: About,
    directory: String,
    new_images_timeframe: u64,
    by_filename: BTreeMap<String, ImageRecord>,
}

impl DatamodelBuilder {
    pub fn new(about: About, directory: String, new_images_timeframe: u64) -> Self {
        Self {
            about,
            directory,
            new_images_timeframe,
            by_filename: BTreeMap::new(),
        }
    }

    /// Scalar fields copied from the manifest.
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self::new(
            manifest.about.to_about(),
            manifest.config.image_directory.clone(),
            manifest.config.new_images_timeframe,
        )
    }

    pub fn insert(&mut self, filename: String, record: ImageRecord) {
        self.by_filename.insert(filename, record);
    }

    /// Derive the indices and stamp `generated`.
    pub fn build(self, generated: DateTime<Utc>) -> Datamodel {
        let Indices {
            all_images,
            by_added,
            by_rating,
            by_tag,
        } = Indices::derive(&self.by_filename);
        Datamodel {
            about: self.about,
            all_images,
            by_added,
            by_filename: self.by_filename,
            by_rating,
            by_tag,
            directory: self.directory,
            generated: format_generated(generated),
            new_images_timeframe: self.new_images_timeframe,
        }
    }
}

/// Render a timestamp in the `generated` form, e.g. `2024-05-01 10:11:12`.
pub fn format_generated(at: DateTime<Utc>) -> String {
    at.format(GENERATED_FORMAT).to_string()
}

impl Datamodel {
    /// Whether every index equals what `by_filename` implies.
    pub fn indices_consistent(&self) -> bool {
        let expected = Indices::derive(&self.by_filename);
        expected.all_images == self.all_images
            && expected.by_added == self.by_added
            && expected.by_rating == self.by_rating
            && expected.by_tag == self.by_tag
    }
}

/// Build the datamodel for `images`, reusing `prior` records where possible.
///
/// `generated` is injected so repeated runs can be compared byte for byte.
pub fn reconcile(
    manifest: &Manifest,
    images: &[SourceImage],
    prior: &PriorState,
    backend: &impl ImageBackend,
    generated: DateTime<Utc>,
    mut on_event: impl FnMut(&ReconcileEvent),
) -> Result<Reconciled, ReconcileError> {
    let mut builder = DatamodelBuilder::from_manifest(manifest);
    let mut snapshot = Snapshot::empty();
    let mut stats = CacheStats::default();
    let total = images.len();

    for (i, image) in images.iter().enumerate() {
        let index = i + 1;
        let filename = &image.filename;
        let entry = manifest
            .images
            .get(filename)
            .ok_or_else(|| ReconcileError::Undeclared(filename.clone()))?;
        let tags: BTreeSet<String> = entry
            .tags
            .as_ref()
            .ok_or_else(|| ReconcileError::MissingField {
                filename: filename.clone(),
                field: "tags",
            })?
            .iter()
            .cloned()
            .collect();

        let io_err = |source| ReconcileError::Io {
            path: image.path.clone(),
            source,
        };
        let source_hash = hash_file(&image.path).map_err(io_err)?;

        let record = match prior.lookup(filename, &source_hash) {
            Some(cached) => {
                stats.hit();
                on_event(&ReconcileEvent::Reused {
                    index,
                    total,
                    filename: filename.clone(),
                });
                cached.clone()
            }
            None => {
                stats.miss();
                on_event(&ReconcileEvent::Reading {
                    index,
                    total,
                    filename: filename.clone(),
                });
                let raw = backend.read_metadata(&image.path).map_err(|source| {
                    ReconcileError::Backend {
                        filename: filename.clone(),
                        source,
                    }
                })?;
                let added = match prior.first_seen(filename) {
                    Some(day) => day,
                    None => {
                        let modified = std::fs::metadata(&image.path)
                            .and_then(|m| m.modified())
                            .map_err(io_err)?;
                        added_day(modified)
                    }
                };
                normalize(&raw, added).map_err(|source| {
                    ReconcileError::Normalize {
                        filename: filename.clone(),
                        source,
                    }
                })?
            }
        };

        let record = record.with_manifest_fields(tags, entry.effective_rating());
        snapshot.insert(filename.clone(), source_hash, record.clone());
        builder.insert(filename.clone(), record);
    }

    Ok(Reconciled {
        datamodel: builder.build(generated),
        snapshot,
        stats,
    })
}
