//! Shared test utilities for the gallery-datamodel test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let manifest = write_gallery(
//!     tmp.path(),
//!     &[("a.jpg", "street,night", Some(4)), ("b.jpg", "", None)],
//!     &["undeclared.png"],
//! );
//! let result = scan(&manifest).unwrap();
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::{Manifest, MANIFEST_FILENAME, load_manifest};
use crate::types::{About, Datamodel, ImageRecord, UNRATED};

// =========================================================================
// Fixture setup
// =========================================================================

/// Write an `admin.toml` plus an `images/` directory under `root` and load it.
///
/// Each image is `(filename, comma-separated tags, rating)`; every declared
/// image gets a small file with distinct content so hashes differ. `extra`
/// files are created in the image directory without a manifest entry.
pub fn write_gallery(
    root: &Path,
    images: &[(&str, &str, Option<i64>)],
    extra: &[&str],
) -> Manifest {
    let image_dir = root.join("images");
    std::fs::create_dir_all(&image_dir).unwrap();

    let mut toml = String::from(
        "[config]\nimage_directory = \"images\"\njavascript_name = \"datamodel.js\"\n\n\
         [about]\nname = \"Test Photographer\"\nbio = \"Hello.\"\n",
    );
    for (filename, tags, rating) in images {
        std::fs::write(image_dir.join(filename), format!("pixels of {filename}")).unwrap();

        let tags: Vec<String> = tags
            .split(',')
            .filter(|t| !t.is_empty())
            .map(|t| format!("\"{t}\""))
            .collect();
        toml.push_str(&format!(
            "\n[images.\"{filename}\"]\ntags = [{}]\n",
            tags.join(", ")
        ));
        if let Some(rating) = rating {
            toml.push_str(&format!("rating = {rating}\n"));
        }
    }
    for filename in extra {
        std::fs::write(image_dir.join(filename), format!("pixels of {filename}")).unwrap();
    }

    let manifest_path = root.join(MANIFEST_FILENAME);
    std::fs::write(&manifest_path, toml).unwrap();
    load_manifest(&manifest_path).unwrap()
}

// =========================================================================
// Records
// =========================================================================

/// A fully populated, unrated, untagged record.
pub fn sample_record(width: u32, height: u32) -> ImageRecord {
    ImageRecord {
        iso: "400".into(),
        added: 1714521600,
        aperture: "2.8".into(),
        camera: "X-T5".into(),
        capture_time: "2024:05:01 10:11:12".into(),
        file_size: "12 MB".into(),
        focal: "23.0 mm".into(),
        image_height: height,
        image_width: width,
        lens: "XF23mmF1.4 R LM WR".into(),
        rating: UNRATED,
        shooting_mode: "Aperture Priority".into(),
        shutter_speed: "1/250".into(),
        tags: BTreeSet::new(),
    }
}

/// A datamodel with no images.
pub fn empty_datamodel() -> Datamodel {
    Datamodel {
        about: About {
            bio: "<p>Hello.</p>".into(),
            name: "Test Photographer".into(),
        },
        all_images: BTreeSet::new(),
        by_added: BTreeMap::new(),
        by_filename: BTreeMap::new(),
        by_rating: BTreeMap::new(),
        by_tag: BTreeMap::new(),
        directory: "images".into(),
        generated: "2024-05-01 10:11:12".into(),
        new_images_timeframe: 604800,
    }
}

// =========================================================================
// Extractors
// =========================================================================

/// Set members in order, as `&str`.
pub fn strings(set: &BTreeSet<String>) -> Vec<&str> {
    set.iter().map(String::as_str).collect()
}
