//! Manifest module.
//!
//! Handles loading and validating `admin.toml`, the declarative source of
//! truth for which images belong in the gallery and how they are tagged and
//! rated. Everything in the `[config]` section has a sensible default; the
//! `[images]` table is what the user actually maintains.
//!
//! ## Manifest Layout
//!
//! ```toml
//! [config]
//! image_directory = "images"         # Relative to the manifest file
//! javascript_name = "datamodel.js"   # Relative to the manifest file
//! thumbnail_size = 400               # Max length of the longer edge (px)
//! thumbnail_quality = 80             # Thumbnail encoding quality (1-100)
//! new_images_timeframe = 604800      # Seconds an image counts as "new"
//!
//! [about]
//! name = "Jane Doe"
//! bio = """
//! First paragraph.
//!
//! Second paragraph.
//! """
//!
//! [images."IMG_0001.jpg"]
//! tags = ["street", "night"]
//! rating = 4                         # Optional, omitted = unrated
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::{About, UNRATED};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Conventional manifest filename, used as the CLI default.
pub const MANIFEST_FILENAME: &str = "admin.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Manifest validation error: {0}")]
    Validation(String),
}

/// The parsed `admin.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub config: GalleryConfig,
    #[serde(default)]
    pub about: AboutConfig,
    /// Declared images: filename → tags and rating.
    #[serde(default)]
    pub images: BTreeMap<String, ImageEntry>,
    /// Directory relative paths in `config` are resolved against.
    /// Set by [`load_manifest`]; empty (= current directory) otherwise.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// The `[config]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Directory holding the source images. Copied verbatim into the datamodel.
    pub image_directory: String,
    /// Output JavaScript file.
    pub javascript_name: String,
    /// Thumbnails are shrunk until their longer edge is at most this many pixels.
    pub thumbnail_size: u32,
    pub thumbnail_quality: u32,
    /// How long (seconds) the front-end highlights freshly added images.
    pub new_images_timeframe: u64,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            image_directory: "images".to_string(),
            javascript_name: "datamodel.js".to_string(),
            thumbnail_size: 400,
            thumbnail_quality: 80,
            new_images_timeframe: 7 * 24 * 60 * 60,
        }
    }
}

/// The `[about]` section. `bio` is markdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AboutConfig {
    pub name: String,
    pub bio: String,
}

impl AboutConfig {
    /// Render into the datamodel form, with the bio converted to HTML.
    pub fn to_about(&self) -> About {
        About {
            name: self.name.clone(),
            bio: render_bio(&self.bio),
        }
    }
}

/// Render a markdown bio to HTML. Blank-line separated text becomes `<p>` blocks.
pub fn render_bio(markdown: &str) -> String {
    let parser = pulldown_cmark::Parser::new(markdown);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html.trim_end().to_string()
}

/// One `[images."<filename>"]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageEntry {
    /// Required. Kept optional here so a missing list surfaces as a
    /// `MissingField` during reconciliation rather than a parse error.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<i64>,
}

impl ImageEntry {
    /// Rating with the unrated sentinel applied.
    pub fn effective_rating(&self) -> i64 {
        self.rating.unwrap_or(UNRATED)
    }
}

impl Manifest {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let config = &self.config;
        if config.image_directory.trim().is_empty() {
            return Err(ConfigError::Validation(
                "config.image_directory must not be empty".into(),
            ));
        }
        if config.javascript_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "config.javascript_name must not be empty".into(),
            ));
        }
        if config.thumbnail_size == 0 {
            return Err(ConfigError::Validation(
                "config.thumbnail_size must be greater than 0".into(),
            ));
        }
        if !(1..=100).contains(&config.thumbnail_quality) {
            return Err(ConfigError::Validation(
                "config.thumbnail_quality must be 1-100".into(),
            ));
        }
        for name in self.images.keys() {
            if !is_plain_filename(name) {
                return Err(ConfigError::Validation(format!(
                    "image '{name}' must be a plain filename inside the image directory"
                )));
            }
            if name.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "image '{name}' is a hidden file and is never scanned"
                )));
            }
        }
        Ok(())
    }

    /// Image directory on disk.
    pub fn image_dir(&self) -> PathBuf {
        self.base_dir.join(&self.config.image_directory)
    }

    /// Output artifact path on disk.
    pub fn artifact_path(&self) -> PathBuf {
        self.base_dir.join(&self.config.javascript_name)
    }
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

/// Parse and validate a manifest from TOML text.
pub fn parse_manifest(content: &str) -> Result<Manifest, ConfigError> {
    let manifest: Manifest = toml::from_str(content)?;
    manifest.validate()?;
    Ok(manifest)
}

/// Load `admin.toml` from disk.
///
/// Relative paths inside the manifest are resolved against the directory the
/// manifest lives in.
pub fn load_manifest(path: &Path) -> Result<Manifest, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut manifest = parse_manifest(&content)?;
    manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(manifest)
}

/// Returns a fully-commented stock `admin.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_manifest_toml() -> &'static str {
    r##"# Gallery manifest
# ================
# Every image that should appear in the gallery must be declared under
# [images]. Files in the image directory without an entry are skipped and
# listed at the end of the run. Unknown keys will cause an error.

[config]
# Directory holding the original images (relative to this file).
# Thumbnails are written to <image_directory>/thumbnails/.
image_directory = "images"

# JavaScript file the datamodel is written to (relative to this file).
javascript_name = "datamodel.js"

# Thumbnails are shrunk until the longer edge is at most this many pixels.
thumbnail_size = 400

# Thumbnail encoding quality (1-100).
thumbnail_quality = 80

# How long (in seconds) newly added images are highlighted.
new_images_timeframe = 604800

[about]
name = ""
# Markdown. Separate paragraphs with a blank line.
bio = ""

# [images."IMG_0001.jpg"]
# tags = ["street", "night"]
# rating = 4    # optional, omit for unrated
"##
}
