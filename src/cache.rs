//! Metadata cache for incremental builds.
//!
//! Reading EXIF means spawning `exiftool` once per image, which dominates the
//! run time of a large gallery. This module lets the reconciler reuse the
//! per-image records of the previous run instead.
//!
//! # Design
//!
//! The cache only covers EXIF-derived fields. Tags and ratings are owned by
//! the manifest and are always re-applied, so editing `admin.toml` never
//! needs a cache bust.
//!
//! ## Storage
//!
//! The cache is a JSON snapshot at `<artifact dir>/.datamodel-cache.json`,
//! written next to the JavaScript artifact on every successful run:
//!
//! ```text
//! { "version": 1,
//!   "entries": { "IMG_0001.jpg": { "source_hash": "…", "record": { … } } } }
//! ```
//!
//! When no snapshot exists, the previous artifact itself is parsed as a
//! fallback: the object literal after `const DATAMODEL =` is decoded as a
//! [`Datamodel`]. Records recovered that way carry no content hash and are
//! reused by filename alone.
//!
//! ## Cache keys
//!
//! Lookups are by filename, guarded by `source_hash` (SHA-256 of the image
//! file) when the snapshot has one. Content-based rather than mtime-based so
//! it survives `git checkout`, which resets modification times. A changed
//! hash means the file was replaced and its EXIF is read again.
//!
//! ## Absent vs. corrupt
//!
//! [`PriorState`] keeps "nothing to reuse" ([`PriorState::Absent`]) apart
//! from "something is there but unreadable" ([`PriorState::Corrupt`]). Both
//! lead to a full regeneration; the latter is reported to the user.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to the `build` command to force every image's EXIF to
//! be read again.

use crate::types::{Datamodel, ImageRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the snapshot file within the artifact's directory.
const SNAPSHOT_FILENAME: &str = ".datamodel-cache.json";

/// Version of the snapshot format. Bump this to invalidate all existing
/// snapshots when the format or the record schema changes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Marker preceding the datamodel literal in the JavaScript artifact.
pub const ARTIFACT_BINDING: &str = "const DATAMODEL =";

/// Statement following the datamodel literal in the JavaScript artifact.
pub const ARTIFACT_FREEZE: &str = "Object.freeze(DATAMODEL);";

/// A cached record together with the hash of the file it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub source_hash: String,
    pub record: ImageRecord,
}

/// On-disk snapshot written alongside the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub entries: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, filename: String, source_hash: String, record: ImageRecord) {
        self.entries.insert(
            filename,
            SnapshotEntry {
                source_hash,
                record,
            },
        );
    }

    /// Render as pretty JSON (keys sorted, so unchanged input gives identical bytes).
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Resolve the snapshot path for an artifact.
pub fn snapshot_path(artifact_path: &Path) -> PathBuf {
    artifact_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(SNAPSHOT_FILENAME)
}

/// A record available for reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRecord {
    pub record: ImageRecord,
    /// `None` for records recovered from an artifact.
    pub source_hash: Option<String>,
}

/// Where reusable records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorOrigin {
    Snapshot,
    Artifact,
}

/// State left behind by the previous run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorState {
    /// No snapshot and no artifact, or the cache was disabled.
    Absent,
    /// A file exists but could not be read or decoded.
    Corrupt { path: PathBuf, reason: String },
    Loaded {
        origin: PriorOrigin,
        records: BTreeMap<String, CachedRecord>,
    },
}

impl PriorState {
    /// Load prior state for `artifact_path`: the snapshot if present,
    /// otherwise the artifact itself.
    pub fn load(artifact_path: &Path) -> Self {
        let snapshot = snapshot_path(artifact_path);
        match read_optional(&snapshot) {
            Ok(Some(content)) => return Self::from_snapshot(&snapshot, &content),
            Ok(None) => {}
            Err(e) => return Self::corrupt(&snapshot, e),
        }
        match read_optional(artifact_path) {
            Ok(Some(content)) => Self::from_artifact(artifact_path, &content),
            Ok(None) => Self::Absent,
            Err(e) => Self::corrupt(artifact_path, e),
        }
    }

    fn corrupt(path: &Path, reason: impl ToString) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    fn from_snapshot(path: &Path, content: &str) -> Self {
        let snapshot: Snapshot = match serde_json::from_str(content) {
            Ok(s) => s,
            Err(e) => return Self::corrupt(path, e),
        };
        if snapshot.version != SNAPSHOT_VERSION {
            return Self::corrupt(
                path,
                format!("unsupported snapshot version {}", snapshot.version),
            );
        }
        let records = snapshot
            .entries
            .into_iter()
            .map(|(name, entry)| {
                (
                    name,
                    CachedRecord {
                        record: entry.record,
                        source_hash: Some(entry.source_hash),
                    },
                )
            })
            .collect();
        Self::Loaded {
            origin: PriorOrigin::Snapshot,
            records,
        }
    }

    fn from_artifact(path: &Path, content: &str) -> Self {
        let Some(literal) = extract_datamodel_literal(content) else {
            return Self::corrupt(path, "no datamodel literal found");
        };
        let datamodel: Datamodel = match serde_json::from_str(literal) {
            Ok(d) => d,
            Err(e) => return Self::corrupt(path, e),
        };
        let records = datamodel
            .by_filename
            .into_iter()
            .map(|(name, record)| {
                (
                    name,
                    CachedRecord {
                        record,
                        source_hash: None,
                    },
                )
            })
            .collect();
        Self::Loaded {
            origin: PriorOrigin::Artifact,
            records,
        }
    }

    /// Look up a reusable record.
    ///
    /// Returns the cached record if one exists for `filename` **and** its
    /// stored hash (if any) matches `source_hash`.
    pub fn lookup(&self, filename: &str, source_hash: &str) -> Option<&ImageRecord> {
        let Self::Loaded { records, .. } = self else {
            return None;
        };
        let cached = records.get(filename)?;
        match &cached.source_hash {
            Some(stored) if stored != source_hash => None,
            _ => Some(&cached.record),
        }
    }

    /// The `added` day of the prior record for `filename`, hash or no hash.
    ///
    /// A changed file is read again but keeps the day it was first seen.
    pub fn first_seen(&self, filename: &str) -> Option<i64> {
        let Self::Loaded { records, .. } = self else {
            return None;
        };
        records.get(filename).map(|cached| cached.record.added)
    }

    /// Number of records available for reuse.
    pub fn len(&self) -> usize {
        match self {
            Self::Loaded { records, .. } => records.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read a file, mapping "does not exist" to `None`.
fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Find the JSON object literal between `const DATAMODEL =` and
/// `Object.freeze(DATAMODEL);` in an artifact.
pub fn extract_datamodel_literal(artifact: &str) -> Option<&str> {
    let start = artifact.find(ARTIFACT_BINDING)? + ARTIFACT_BINDING.len();
    let rest = &artifact[start..];
    let end = rest.rfind(ARTIFACT_FREEZE)?;
    let literal = rest[..end].trim().trim_end_matches(';').trim_end();
    if literal.is_empty() {
        None
    } else {
        Some(literal)
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} read ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} read", self.misses)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_record;
    use std::fs;
    use tempfile::TempDir;

    fn artifact_with(literal: &str) -> String {
        format!(
            "// header\n\"use strict\";\n\n{} {}\n{}\n",
            ARTIFACT_BINDING, literal, ARTIFACT_FREEZE
        )
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    #[test]
    fn empty_snapshot_has_current_version() {
        let s = Snapshot::empty();
        assert_eq!(s.version, SNAPSHOT_VERSION);
        assert!(s.entries.is_empty());
    }

    #[test]
    fn snapshot_path_is_next_to_artifact() {
        assert_eq!(
            snapshot_path(Path::new("site/datamodel.js")),
            Path::new("site/.datamodel-cache.json")
        );
        assert_eq!(
            snapshot_path(Path::new("datamodel.js")),
            Path::new(".datamodel-cache.json")
        );
    }

    // =========================================================================
    // PriorState::load
    // =========================================================================

    #[test]
    fn load_nothing_is_absent() {
        let tmp = TempDir::new().unwrap();
        let state = PriorState::load(&tmp.path().join("datamodel.js"));
        assert_eq!(state, PriorState::Absent);
        assert!(state.is_empty());
    }

    #[test]
    fn load_prefers_snapshot() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("datamodel.js");
        let mut snapshot = Snapshot::empty();
        snapshot.insert("a.jpg".into(), "h1".into(), sample_record(100, 100));
        fs::write(snapshot_path(&artifact), snapshot.to_json().unwrap()).unwrap();
        fs::write(&artifact, "garbage").unwrap();

        let state = PriorState::load(&artifact);
        assert!(matches!(
            &state,
            PriorState::Loaded { origin: PriorOrigin::Snapshot, records } if records.len() == 1
        ));
        assert_eq!(
            state.lookup("a.jpg", "h1"),
            Some(&sample_record(100, 100))
        );
    }

    #[test]
    fn load_corrupt_snapshot() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("datamodel.js");
        fs::write(snapshot_path(&artifact), "not json").unwrap();

        let state = PriorState::load(&artifact);
        assert!(matches!(state, PriorState::Corrupt { .. }));
        assert!(state.is_empty());
    }

    #[test]
    fn load_wrong_version_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("datamodel.js");
        let json = format!(
            r#"{{"version": {}, "entries": {{}}}}"#,
            SNAPSHOT_VERSION + 1
        );
        fs::write(snapshot_path(&artifact), json).unwrap();

        assert!(matches!(
            PriorState::load(&artifact),
            PriorState::Corrupt { reason, .. } if reason.contains("version")
        ));
    }

    #[test]
    fn load_falls_back_to_artifact() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("datamodel.js");
        let mut datamodel = crate::test_helpers::empty_datamodel();
        datamodel
            .by_filename
            .insert("a.jpg".into(), sample_record(640, 480));
        let literal = serde_json::to_string_pretty(&datamodel).unwrap();
        fs::write(&artifact, artifact_with(&literal)).unwrap();

        let state = PriorState::load(&artifact);
        assert!(matches!(
            &state,
            PriorState::Loaded { origin: PriorOrigin::Artifact, .. }
        ));
        // No stored hash: any current hash matches
        assert_eq!(
            state.lookup("a.jpg", "whatever"),
            Some(&sample_record(640, 480))
        );
    }

    #[test]
    fn load_artifact_without_literal_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("datamodel.js");
        fs::write(&artifact, "console.log('hi');").unwrap();
        assert!(matches!(
            PriorState::load(&artifact),
            PriorState::Corrupt { .. }
        ));
    }

    #[test]
    fn load_truncated_artifact_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("datamodel.js");
        fs::write(&artifact, artifact_with(r#"{"all_images": ["#)).unwrap();
        assert!(matches!(
            PriorState::load(&artifact),
            PriorState::Corrupt { .. }
        ));
    }

    // =========================================================================
    // lookup
    // =========================================================================

    #[test]
    fn lookup_miss_on_hash_change() {
        let mut records = BTreeMap::new();
        records.insert(
            "a.jpg".to_string(),
            CachedRecord {
                record: sample_record(10, 10),
                source_hash: Some("old".into()),
            },
        );
        let state = PriorState::Loaded {
            origin: PriorOrigin::Snapshot,
            records,
        };
        assert_eq!(state.lookup("a.jpg", "new"), None);
        assert!(state.lookup("a.jpg", "old").is_some());
        assert_eq!(state.lookup("b.jpg", "old"), None);
    }

    #[test]
    fn first_seen_ignores_hash() {
        let mut record = sample_record(10, 10);
        record.added = 86400;
        let mut records = BTreeMap::new();
        records.insert(
            "a.jpg".to_string(),
            CachedRecord {
                record,
                source_hash: Some("old".into()),
            },
        );
        let state = PriorState::Loaded {
            origin: PriorOrigin::Snapshot,
            records,
        };
        assert_eq!(state.first_seen("a.jpg"), Some(86400));
        assert_eq!(state.first_seen("b.jpg"), None);
        assert_eq!(PriorState::Absent.first_seen("a.jpg"), None);
    }

    #[test]
    fn lookup_on_absent_and_corrupt() {
        assert_eq!(PriorState::Absent.lookup("a.jpg", "h"), None);
        let corrupt = PriorState::Corrupt {
            path: "x".into(),
            reason: "y".into(),
        };
        assert_eq!(corrupt.lookup("a.jpg", "h"), None);
    }

    // =========================================================================
    // extract_datamodel_literal
    // =========================================================================

    #[test]
    fn extract_literal_between_markers() {
        let text = artifact_with("{\n    \"a\": 1\n}");
        assert_eq!(
            extract_datamodel_literal(&text),
            Some("{\n    \"a\": 1\n}")
        );
    }

    #[test]
    fn extract_literal_tolerates_trailing_semicolon() {
        let text = artifact_with("{\"a\": 1};");
        assert_eq!(extract_datamodel_literal(&text), Some("{\"a\": 1}"));
    }

    #[test]
    fn extract_literal_missing_freeze() {
        assert_eq!(
            extract_datamodel_literal("const DATAMODEL = {\"a\": 1}"),
            None
        );
    }

    // =========================================================================
    // hash_file / CacheStats
    // =========================================================================

    #[test]
    fn hash_file_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.bin");

        fs::write(&path, b"version 1").unwrap();
        let h1 = hash_file(&path).unwrap();
        assert_eq!(h1, hash_file(&path).unwrap());
        assert_eq!(h1.len(), 64);

        fs::write(&path, b"version 2").unwrap();
        assert_ne!(h1, hash_file(&path).unwrap());
    }

    #[test]
    fn cache_stats_display_with_hits() {
        let stats = CacheStats { hits: 5, misses: 2 };
        assert_eq!(stats.to_string(), "5 cached, 2 read (7 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let stats = CacheStats { hits: 0, misses: 3 };
        assert_eq!(stats.to_string(), "3 read");
    }
}
