//! One complete build run.
//!
//! ```text
//! check_tools → scan/validate → load prior state → reconcile
//!             → sync thumbnails → write artifact + snapshot
//! ```
//!
//! Every stage error is wrapped in [`BuildError`]. Nothing is written to the
//! artifact or snapshot unless all earlier stages succeeded, so a failed run
//! keeps the previous datamodel loadable.

use crate::cache::{CacheStats, PriorState};
use crate::config::{ConfigError, Manifest, load_manifest};
use crate::datamodel::{ReconcileError, ReconcileEvent, reconcile};
use crate::generate::{GenerateError, write_outputs};
use crate::imaging::{BackendError, ImageBackend, ThumbnailConfig};
use crate::metadata::NormalizeError;
use crate::process::{ThumbnailError, ThumbnailEvent, ThumbnailStats, sync_thumbnails};
use crate::scan::{ScanError, ScanResult, THUMBNAIL_DIR, scan};
use crate::types::Datamodel;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Tools(#[from] BackendError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Coarse classification of a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidManifest,
    MissingExternalTool,
    DeclaredImageMissing,
    ExternalToolFailure,
    MissingField,
    InvalidField,
    ResizeIterationExceeded,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn backend_kind(err: &BackendError) -> ErrorKind {
    match err {
        BackendError::MissingTool { .. } => ErrorKind::MissingExternalTool,
        BackendError::ToolFailed { .. } | BackendError::UnexpectedOutput { .. } => {
            ErrorKind::ExternalToolFailure
        }
        BackendError::Io(_) => ErrorKind::Io,
    }
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::InvalidManifest,
            Self::Scan(ScanError::DeclaredImageMissing { .. }) => ErrorKind::DeclaredImageMissing,
            Self::Scan(_) => ErrorKind::Io,
            Self::Tools(e) => backend_kind(e),
            Self::Reconcile(e) => match e {
                ReconcileError::MissingField { .. }
                | ReconcileError::Normalize {
                    source: NormalizeError::MissingField { .. },
                    ..
                } => ErrorKind::MissingField,
                ReconcileError::Normalize { .. } => ErrorKind::InvalidField,
                ReconcileError::Backend { source, .. } => backend_kind(source),
                ReconcileError::Undeclared(_) => ErrorKind::InvalidManifest,
                ReconcileError::Io { .. } => ErrorKind::Io,
            },
            Self::Thumbnail(e) => match e {
                ThumbnailError::ResizeIterationExceeded { .. } => {
                    ErrorKind::ResizeIterationExceeded
                }
                ThumbnailError::Backend { source, .. } => backend_kind(source),
                ThumbnailError::Io(_) => ErrorKind::Io,
            },
            Self::Generate(_) => ErrorKind::Io,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Reuse records from the previous run.
    pub use_cache: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

/// Progress reported while a build runs.
#[derive(Debug)]
pub enum BuildEvent<'a> {
    PriorState(&'a PriorState),
    Reconcile(&'a ReconcileEvent),
    Reconciled(CacheStats),
    Thumbnail(&'a ThumbnailEvent),
}

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub datamodel: Datamodel,
    pub cache: CacheStats,
    pub thumbnails: ThumbnailStats,
    pub thumbnail_dir: PathBuf,
    pub artifact_path: PathBuf,
    /// Files present in the image directory without a manifest entry.
    pub not_included: Vec<String>,
}

/// Load and validate `admin.toml`.
pub fn load(manifest_path: &Path) -> Result<Manifest, BuildError> {
    Ok(load_manifest(manifest_path)?)
}

/// Validate the manifest against the image directory without running any
/// external tool.
pub fn check(manifest: &Manifest) -> Result<ScanResult, BuildError> {
    Ok(scan(manifest)?)
}

/// Run every stage for `manifest`, stamping the datamodel with `now`.
pub fn run_build(
    manifest: &Manifest,
    backend: &impl ImageBackend,
    options: &BuildOptions,
    now: DateTime<Utc>,
    mut on_event: impl FnMut(&BuildEvent<'_>),
) -> Result<BuildReport, BuildError> {
    backend.check_tools()?;
    let scanned = scan(manifest)?;

    let artifact_path = manifest.artifact_path();
    let prior = if options.use_cache {
        PriorState::load(&artifact_path)
    } else {
        PriorState::Absent
    };
    on_event(&BuildEvent::PriorState(&prior));

    let reconciled = reconcile(manifest, &scanned.included, &prior, backend, now, |e| {
        on_event(&BuildEvent::Reconcile(e))
    })?;
    on_event(&BuildEvent::Reconciled(reconciled.stats));

    let image_dir = manifest.image_dir();
    let thumbnails = sync_thumbnails(
        &reconciled.datamodel,
        &image_dir,
        &ThumbnailConfig::from_gallery_config(&manifest.config),
        backend,
        |e| on_event(&BuildEvent::Thumbnail(e)),
    )?;

    write_outputs(&artifact_path, &reconciled.datamodel, &reconciled.snapshot)?;

    Ok(BuildReport {
        datamodel: reconciled.datamodel,
        cache: reconciled.stats,
        thumbnails,
        thumbnail_dir: image_dir.join(THUMBNAIL_DIR),
        artifact_path,
        not_included: scanned.not_included,
    })
}
