//! Datamodel serialization.
//!
//! Final stage of a build. Writes the [`Datamodel`] as a JavaScript file the
//! front-end loads with a plain `<script>` tag, plus the sidecar snapshot the
//! next run reuses.
//!
//! ## Artifact Layout
//!
//! ```text
//! //THIS FILE IS GENERATED BY "gallery-datamodel 0.1.0"
//! "use strict";
//!
//! const DATAMODEL = {
//!     "about": { ... },
//!     ...
//! }
//! Object.freeze(DATAMODEL);
//! ```
//!
//! The literal is JSON with 4-space indentation. Non-ASCII text is written
//! as UTF-8, not escaped. Keys and arrays come out sorted because every
//! collection in [`crate::types`] is ordered, so the same input always
//! renders to the same bytes.
//!
//! ## Atomicity
//!
//! Each file is written to a temporary file in its destination directory and
//! renamed over the target. A crash mid-write leaves the previous version
//! intact. Both files are rendered before either is written, so a
//! serialization error changes nothing on disk.
//!
//! The artifact is the commit point and is written first. A snapshot write
//! that fails afterwards still fails the run, but the new artifact is already
//! in place. The next run then reuses records from the stale snapshot or, if
//! it is unreadable, falls back to the artifact or regenerates.

use crate::cache::{ARTIFACT_BINDING, ARTIFACT_FREEZE, Snapshot, snapshot_path};
use crate::types::Datamodel;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// First line of every artifact.
pub fn artifact_header() -> String {
    format!(
        "//THIS FILE IS GENERATED BY \"{} {}\"",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

/// JSON with 4-space indentation.
fn to_json_4(value: &impl Serialize) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Render the complete artifact text.
pub fn render_artifact(datamodel: &Datamodel) -> Result<String, GenerateError> {
    let literal = to_json_4(datamodel)?;
    Ok(format!(
        "{}\n\"use strict\";\n\n{} {}\n{}\n",
        artifact_header(),
        ARTIFACT_BINDING,
        literal,
        ARTIFACT_FREEZE
    ))
}

/// Replace `path` with `contents` in one rename.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), GenerateError> {
    let io_err = |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Render both outputs, then write the artifact and the snapshot next to it.
pub fn write_outputs(
    artifact_path: &Path,
    datamodel: &Datamodel,
    snapshot: &Snapshot,
) -> Result<(), GenerateError> {
    let artifact = render_artifact(datamodel)?;
    let snapshot = snapshot.to_json()?;
    write_atomic(artifact_path, &artifact)?;
    write_atomic(&snapshot_path(artifact_path), &snapshot)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{PriorOrigin, PriorState, extract_datamodel_literal};
    use crate::test_helpers::*;
    use std::fs;
    use tempfile::TempDir;

    fn datamodel_with_image() -> Datamodel {
        let mut datamodel = empty_datamodel();
        let mut record = sample_record(800, 600);
        record.tags.insert("street".into());
        record.rating = 3;
        datamodel.all_images.insert("a.jpg".into());
        datamodel
            .by_added
            .entry(record.added)
            .or_default()
            .insert("a.jpg".into());
        datamodel.by_rating.entry(3).or_default().insert("a.jpg".into());
        datamodel
            .by_tag
            .entry("street".into())
            .or_default()
            .insert("a.jpg".into());
        datamodel.by_filename.insert("a.jpg".into(), record);
        datamodel
    }

    // =========================================================================
    // render_artifact() tests
    // =========================================================================

    #[test]
    fn artifact_has_header_binding_and_freeze() {
        let text = render_artifact(&empty_datamodel()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("//THIS FILE IS GENERATED BY \"gallery-datamodel "));
        assert_eq!(lines[1], "\"use strict\";");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "const DATAMODEL = {");
        assert_eq!(lines[lines.len() - 1], "Object.freeze(DATAMODEL);");
        assert!(text.ends_with("Object.freeze(DATAMODEL);\n"));
    }

    #[test]
    fn artifact_uses_four_space_indent_and_sorted_keys() {
        let text = render_artifact(&datamodel_with_image()).unwrap();
        let top_level: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("    \"") && !l.starts_with("     "))
            .map(|l| l.trim().split('"').nth(1).unwrap())
            .collect();

        assert_eq!(
            top_level,
            vec![
                "about",
                "all_images",
                "by_added",
                "by_filename",
                "by_rating",
                "by_tag",
                "directory",
                "generated",
                "new_images_timeframe",
            ]
        );
        assert!(text.contains("\n            \"ISO\": \"400\",\n"));
    }

    #[test]
    fn artifact_writes_utf8_verbatim() {
        let mut datamodel = empty_datamodel();
        datamodel.about.name = "Zoë Müller".into();
        let text = render_artifact(&datamodel).unwrap();
        assert!(text.contains("\"name\": \"Zoë Müller\""));
    }

    #[test]
    fn artifact_renders_identically_twice() {
        let datamodel = datamodel_with_image();
        assert_eq!(
            render_artifact(&datamodel).unwrap(),
            render_artifact(&datamodel).unwrap()
        );
    }

    #[test]
    fn artifact_literal_parses_back() {
        let datamodel = datamodel_with_image();
        let text = render_artifact(&datamodel).unwrap();
        let literal = extract_datamodel_literal(&text).unwrap();
        let parsed: Datamodel = serde_json::from_str(literal).unwrap();
        assert_eq!(parsed, datamodel);
    }

    // =========================================================================
    // write_atomic() / write_outputs() tests
    // =========================================================================

    #[test]
    fn write_atomic_replaces_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("datamodel.js");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, "new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn write_atomic_missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope/datamodel.js");
        let result = write_atomic(&path, "x");
        assert!(matches!(result, Err(GenerateError::Io { .. })));
    }

    #[test]
    fn write_outputs_produces_loadable_snapshot() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("datamodel.js");
        let datamodel = datamodel_with_image();
        let mut snapshot = Snapshot::empty();
        snapshot.insert(
            "a.jpg".into(),
            "abc123".into(),
            datamodel.by_filename["a.jpg"].clone(),
        );

        write_outputs(&artifact, &datamodel, &snapshot).unwrap();

        assert!(artifact.exists());
        assert!(snapshot_path(&artifact).exists());
        let prior = PriorState::load(&artifact);
        assert!(matches!(
            prior,
            PriorState::Loaded { origin: PriorOrigin::Snapshot, .. }
        ));
        assert!(prior.lookup("a.jpg", "abc123").is_some());
        assert!(prior.lookup("a.jpg", "other").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn snapshot_failure_comes_after_artifact_commit() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("datamodel.js");
        fs::create_dir(snapshot_path(&artifact)).unwrap();
        let datamodel = datamodel_with_image();

        let result = write_outputs(&artifact, &datamodel, &Snapshot::empty());

        assert!(matches!(
            result,
            Err(GenerateError::Io { path, .. }) if path == snapshot_path(&artifact)
        ));
        assert_eq!(
            fs::read_to_string(&artifact).unwrap(),
            render_artifact(&datamodel).unwrap()
        );
    }
}
