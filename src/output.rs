//! CLI output formatting for all pipeline stages.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Before starting, edit admin.toml and make sure the images exist inside images
//! Continue [y/N]: y
//! [50%]	Reading exif for a.jpg
//! [100%]	Using cached exif for b.jpg
//! EXIF: 1 cached, 1 read (2 total)
//! [50%]	Creating thumbnail for a.jpg
//! Thumbnails created in images/thumbnails (1 created, 1 up to date)
//! Data written to datamodel.js
//! Some images in directory 'images' were not included!
//! Not included: IMG_9999.jpg
//! Complete!
//! ```
//!
//! Progress lines are tab-separated so they line up regardless of the
//! percentage width.
//!
//! ## Check
//!
//! ```text
//! 12 images declared, all present in images
//! All images in directory 'images' included!
//! ```
//!
//! # Architecture
//!
//! Each message has a `format_*` function (returns `String` or
//! `Vec<String>`) for testability and, where it is printed on its own, a
//! `print_*` wrapper that writes to stdout. Format functions are pure: no
//! I/O, no side effects.

use crate::cache::{CacheStats, PriorOrigin, PriorState};
use crate::datamodel::ReconcileEvent;
use crate::process::{ThumbnailEvent, ThumbnailStats};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Whole-number percentage of `index` out of `total`, rounded down.
fn progress_percent(index: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    index * 100 / total
}

/// `[NN%]<TAB>message`
fn progress_line(index: usize, total: usize, message: &str) -> String {
    format!("[{}%]\t{}", progress_percent(index, total), message)
}

// ============================================================================
// Preamble
// ============================================================================

/// Reminder shown before the confirmation prompt.
pub fn format_preamble(manifest_path: &Path, image_directory: &str) -> String {
    format!(
        "Before starting, edit {} and make sure the images exist inside {}",
        manifest_path.display(),
        image_directory
    )
}

/// Whether a prompt answer means "go ahead". Only `y`/`Y` does.
pub fn is_confirmation(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

// ============================================================================
// Stage 2: Reconcile output
// ============================================================================

/// Describe the state recovered from the previous run.
///
/// Only unusual states produce output; a normal snapshot is silent.
pub fn format_prior_state(prior: &PriorState) -> Vec<String> {
    match prior {
        PriorState::Absent => Vec::new(),
        PriorState::Corrupt { path, reason } => vec![
            format!(
                "Warning: ignoring unreadable previous output {}: {}",
                path.display(),
                reason
            ),
            "Warning: EXIF will be read for every image".to_string(),
        ],
        PriorState::Loaded {
            origin: PriorOrigin::Artifact,
            records,
        } => vec![format!(
            "No cache snapshot found, reusing {} records from the previous datamodel",
            records.len()
        )],
        PriorState::Loaded {
            origin: PriorOrigin::Snapshot,
            ..
        } => Vec::new(),
    }
}

pub fn print_prior_state(prior: &PriorState) {
    for line in format_prior_state(prior) {
        println!("{}", line);
    }
}

pub fn format_reconcile_event(event: &ReconcileEvent) -> String {
    match event {
        ReconcileEvent::Reading {
            index,
            total,
            filename,
        } => progress_line(*index, *total, &format!("Reading exif for {}", filename)),
        ReconcileEvent::Reused {
            index,
            total,
            filename,
        } => progress_line(
            *index,
            *total,
            &format!("Using cached exif for {}", filename),
        ),
    }
}

pub fn format_cache_stats(stats: &CacheStats) -> String {
    format!("EXIF: {}", stats)
}

// ============================================================================
// Stage 3: Thumbnail output
// ============================================================================

/// Progress for one thumbnail. Existing thumbnails print nothing.
pub fn format_thumbnail_event(event: &ThumbnailEvent) -> Option<String> {
    match event {
        ThumbnailEvent::Creating {
            index,
            total,
            filename,
        } => Some(progress_line(
            *index,
            *total,
            &format!("Creating thumbnail for {}", filename),
        )),
        ThumbnailEvent::Skipped { .. } => None,
    }
}

pub fn format_thumbnail_summary(thumbnail_dir: &Path, stats: &ThumbnailStats) -> String {
    format!(
        "Thumbnails created in {} ({})",
        thumbnail_dir.display(),
        stats
    )
}

// ============================================================================
// Stage 4: Serialize output
// ============================================================================

pub fn format_written(artifact_path: &Path) -> String {
    format!("Data written to {}", artifact_path.display())
}

// ============================================================================
// Summary
// ============================================================================

/// List files in the image directory that have no manifest entry.
pub fn format_not_included(image_directory: &str, not_included: &[String]) -> Vec<String> {
    if not_included.is_empty() {
        return vec![format!(
            "All images in directory '{}' included!",
            image_directory
        )];
    }
    let mut lines = vec![format!(
        "Some images in directory '{}' were not included!",
        image_directory
    )];
    lines.extend(
        not_included
            .iter()
            .map(|name| format!("Not included: {}", name)),
    );
    lines
}

pub fn print_not_included(image_directory: &str, not_included: &[String]) {
    for line in format_not_included(image_directory, not_included) {
        println!("{}", line);
    }
}

/// Result of the `check` command.
pub fn format_check_output(
    image_directory: &str,
    declared: usize,
    not_included: &[String],
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} images declared, all present in {}",
        declared, image_directory
    )];
    lines.extend(format_not_included(image_directory, not_included));
    lines
}

pub fn print_check_output(image_directory: &str, declared: usize, not_included: &[String]) {
    for line in format_check_output(image_directory, declared, not_included) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
