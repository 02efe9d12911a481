//! EXIF metadata normalization.
//!
//! The EXIF tool hands back a flat, tool-specific record (`exiftool -json`
//! field names). This module maps it onto the fixed [`ImageRecord`] schema.
//!
//! ## Resolution priority
//!
//! Cameras disagree on which tag carries a value, so each canonical field has
//! an ordered list of acceptable source keys in [`FIELD_SOURCES`]. The first
//! key that is present, non-null and not blank wins. A key holding an empty
//! or whitespace-only string counts as absent and falls through to the next
//! key, so a blank `LensID` still picks up `LensModel`:
//!
//! ```text
//! lens:      LensID → LensModel → Lens
//! ISO:       ISO → BaseISO
//! aperture:  Aperture → ApertureValue → FNumber
//! focal:     FocalLength → Lens
//! ```
//!
//! ## Lens corrections
//!
//! Some bodies report every lens that shares an ID ("Sigma 50mm ... or Zeiss
//! Milvus 50mm ..."). [`LENS_FIXES`] maps those known-ambiguous strings to the
//! lens actually used. The table is applied to every resolved value, which is
//! harmless for fields that never carry lens names.
//!
//! ## Added timestamp
//!
//! The "added" date is the file's modification time floored to UTC midnight,
//! so a batch of images copied in on the same day shares one bucket.
//!
//! There is no partial-record policy: a field that resolves to nothing fails
//! the whole record with [`NormalizeError::MissingField`].

use crate::types::{ImageRecord, UNRATED};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Raw record as emitted by the EXIF tool for one file.
pub type RawMetadata = Map<String, Value>;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("EXIF field '{field}' not found")]
    MissingField { field: &'static str },
    #[error("EXIF field '{field}' has unusable value {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Canonical field → source keys, in priority order.
pub const FIELD_SOURCES: &[(&str, &[&str])] = &[
    ("capture_time", &["DateTimeOriginal"]),
    ("camera", &["Model"]),
    ("lens", &["LensID", "LensModel", "Lens"]),
    ("file_size", &["FileSize"]),
    ("image_width", &["ImageWidth"]),
    ("image_height", &["ImageHeight"]),
    ("shooting_mode", &["ShootingMode"]),
    ("ISO", &["ISO", "BaseISO"]),
    ("aperture", &["Aperture", "ApertureValue", "FNumber"]),
    ("shutter_speed", &["ExposureTime", "ShutterSpeed"]),
    ("focal", &["FocalLength", "Lens"]),
];

/// Known-bad values reported by the EXIF tool → corrected value.
pub const LENS_FIXES: &[(&str, &str)] = &[
    (
        "Sigma 50mm f/1.4 DG HSM | A or Zeiss Milvus 50mm f/1.4 or Sigma 50mm f/1.5 FF High-Speed Prime | 017 or Tokina Opera 50mm f/1.4 FF",
        "Sigma 50mm f/1.4 DG HSM",
    ),
    (
        "Sigma 35mm f/1.4 DG HSM or Sigma 35mm f/1.5 FF High-Speed Prime | 017",
        "Sigma 35mm f/1.4 DG HSM",
    ),
    ("Sigma 20mm f/1.4 DG HSM | A", "Sigma 20mm f/1.4 DG HSM"),
];

/// Source keys for a canonical field, empty for names not in the table.
pub fn sources(field: &str) -> &'static [&'static str] {
    FIELD_SOURCES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, keys)| *keys)
        .unwrap_or(&[])
}

/// Apply [`LENS_FIXES`] to a value.
pub fn fix_value(value: &str) -> String {
    LENS_FIXES
        .iter()
        .find(|(wrong, _)| *wrong == value)
        .map(|(_, right)| (*right).to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Take the first present, non-null, non-blank key and render it as text.
///
/// Strings are used as-is; numbers and booleans use their JSON form
/// (`100`, `2.8`). Arrays and objects are not meaningful here and are skipped.
pub fn resolve_field(raw: &RawMetadata, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .filter_map(|value| match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .find(|s| !s.is_empty())
        .map(|s| fix_value(&s))
}

fn text_field(raw: &RawMetadata, field: &'static str) -> Result<String, NormalizeError> {
    resolve_field(raw, sources(field)).ok_or(NormalizeError::MissingField { field })
}

fn dimension_field(raw: &RawMetadata, field: &'static str) -> Result<u32, NormalizeError> {
    let value = text_field(raw, field)?;
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(NormalizeError::InvalidField { field, value }),
    }
}

/// Map a raw EXIF record onto the canonical schema.
///
/// The returned record carries no tags and is unrated; those fields belong to
/// the manifest and are filled in by the reconciler.
pub fn normalize(raw: &RawMetadata, added: i64) -> Result<ImageRecord, NormalizeError> {
    Ok(ImageRecord {
        iso: text_field(raw, "ISO")?,
        added,
        aperture: text_field(raw, "aperture")?,
        camera: text_field(raw, "camera")?,
        capture_time: text_field(raw, "capture_time")?,
        file_size: text_field(raw, "file_size")?,
        focal: text_field(raw, "focal")?,
        image_height: dimension_field(raw, "image_height")?,
        image_width: dimension_field(raw, "image_width")?,
        lens: text_field(raw, "lens")?,
        rating: UNRATED,
        shooting_mode: text_field(raw, "shooting_mode")?,
        shutter_speed: text_field(raw, "shutter_speed")?,
        tags: BTreeSet::new(),
    })
}

/// Floor a modification time to the start of its UTC day, in Unix seconds.
pub fn added_day(modified: SystemTime) -> i64 {
    let secs = match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    };
    secs.div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY
}
