//! Shared types used across all pipeline stages.
//!
//! [`Datamodel`] is what ends up in the emitted JavaScript file and
//! [`ImageRecord`] is also what the sidecar snapshot caches between runs, so
//! both must serialize identically everywhere.
//!
//! Field declaration order is alphabetical (with `ISO` first, as uppercase
//! sorts before lowercase). Together with `BTreeMap`/`BTreeSet` for every
//! collection this makes serde emit every object with sorted keys and every
//! array sorted, without a separate sorting pass.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Rating stored for images the manifest does not rate.
pub const UNRATED: i64 = -1;

/// Canonical per-image metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(rename = "ISO")]
    pub iso: String,
    /// Start of the UTC day the image was first seen, in Unix seconds.
    pub added: i64,
    pub aperture: String,
    pub camera: String,
    pub capture_time: String,
    pub file_size: String,
    pub focal: String,
    pub image_height: u32,
    pub image_width: u32,
    pub lens: String,
    /// Manifest-owned, [`UNRATED`] when absent.
    pub rating: i64,
    pub shooting_mode: String,
    pub shutter_speed: String,
    /// Manifest-owned.
    pub tags: BTreeSet<String>,
}

impl ImageRecord {
    /// Replace the manifest-owned fields, keeping everything read from EXIF.
    pub fn with_manifest_fields(mut self, tags: BTreeSet<String>, rating: i64) -> Self {
        self.tags = tags;
        self.rating = rating;
        self
    }
}

/// Photographer info shown on the about view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct About {
    /// Pre-rendered HTML.
    pub bio: String,
    pub name: String,
}

/// The aggregate handed to the front-end.
///
/// Only `by_filename` is source data; `all_images`, `by_added`, `by_rating`
/// and `by_tag` are derived from it by
/// [`DatamodelBuilder`](crate::datamodel::DatamodelBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datamodel {
    pub about: About,
    pub all_images: BTreeSet<String>,
    pub by_added: BTreeMap<i64, BTreeSet<String>>,
    pub by_filename: BTreeMap<String, ImageRecord>,
    pub by_rating: BTreeMap<i64, BTreeSet<String>>,
    pub by_tag: BTreeMap<String, BTreeSet<String>>,
    pub directory: String,
    pub generated: String,
    pub new_images_timeframe: u64,
}
