//! Backend that shells out to `exiftool` and ImageMagick.
//!
//! ## Tool mapping
//!
//! | Operation | Command |
//! |---|---|
//! | Presence check | `exiftool -ver`, `magick -version` |
//! | Read EXIF | `exiftool -json <file>` (array with one object) |
//! | Resize | `magick <src> -resize WxH -quality Q <dst>` |
//! | Strip metadata | `exiftool -all= -overwrite_original <file>` |
//!
//! Every call waits for the process to exit. A non-zero exit status is a
//! [`BackendError::ToolFailed`] carrying the first line of stderr.

use super::backend::{BackendError, ImageBackend};
use super::params::ResizeParams;
use crate::metadata::RawMetadata;
use serde_json::Value;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{Command, Output};

const EXIFTOOL: &str = "exiftool";
const MAGICK: &str = "magick";

/// Runs the real command-line tools.
///
/// Program names can be overridden (e.g. an absolute path to a specific
/// ImageMagick build); the defaults rely on `PATH`.
#[derive(Debug, Clone)]
pub struct ExternalToolsBackend {
    pub exiftool: String,
    pub magick: String,
}

impl ExternalToolsBackend {
    pub fn new() -> Self {
        Self {
            exiftool: EXIFTOOL.to_string(),
            magick: MAGICK.to_string(),
        }
    }
}

impl Default for ExternalToolsBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn `program` and wait for it, mapping a missing binary to
/// [`BackendError::MissingTool`].
fn run<I, S>(tool: &'static str, program: &str, args: I) -> Result<Output, BackendError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(program)
        .args(args)
        .output()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BackendError::MissingTool { tool },
            _ => BackendError::Io(e),
        })
}

/// Like [`run`], but a non-zero exit status is an error.
fn run_checked<I, S>(
    tool: &'static str,
    program: &str,
    path: &Path,
    args: I,
) -> Result<Output, BackendError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run(tool, program, args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = stderr
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("exited with {}", output.status));
        return Err(BackendError::ToolFailed {
            tool,
            path: path.to_path_buf(),
            message,
        });
    }
    Ok(output)
}

/// Pull the single record out of `exiftool -json` output.
pub fn parse_exiftool_json(path: &Path, stdout: &[u8]) -> Result<RawMetadata, BackendError> {
    let unexpected = |message: String| BackendError::UnexpectedOutput {
        tool: EXIFTOOL,
        path: path.to_path_buf(),
        message,
    };

    let value: Value = serde_json::from_slice(stdout).map_err(|e| unexpected(e.to_string()))?;
    match value {
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(record)) => Ok(record),
            Some(_) => Err(unexpected("record is not an object".into())),
            None => Err(unexpected("empty result".into())),
        },
        _ => Err(unexpected("expected a JSON array".into())),
    }
}

impl ImageBackend for ExternalToolsBackend {
    fn check_tools(&self) -> Result<(), BackendError> {
        run(EXIFTOOL, &self.exiftool, ["-ver"])?;
        run(MAGICK, &self.magick, ["-version"])?;
        Ok(())
    }

    fn read_metadata(&self, path: &Path) -> Result<RawMetadata, BackendError> {
        let args: [&OsStr; 2] = ["-json".as_ref(), path.as_os_str()];
        let output = run_checked(EXIFTOOL, &self.exiftool, path, args)?;
        parse_exiftool_json(path, &output.stdout)
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let geometry = format!("{}x{}", params.width, params.height);
        let quality = params.quality.value().to_string();
        let args: [&OsStr; 6] = [
            params.source.as_os_str(),
            "-resize".as_ref(),
            geometry.as_ref(),
            "-quality".as_ref(),
            quality.as_ref(),
            params.output.as_os_str(),
        ];
        run_checked(MAGICK, &self.magick, &params.source, args)?;
        Ok(())
    }

    fn strip_metadata(&self, path: &Path) -> Result<(), BackendError> {
        let args: [&OsStr; 3] = [
            "-all=".as_ref(),
            "-overwrite_original".as_ref(),
            path.as_os_str(),
        ];
        run_checked(EXIFTOOL, &self.exiftool, path, args)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_record() {
        let json = br#"[{"SourceFile": "a.jpg", "ISO": 200, "Model": "X100V"}]"#;
        let record = parse_exiftool_json(Path::new("a.jpg"), json).unwrap();
        assert_eq!(record["ISO"], 200);
        assert_eq!(record["Model"], "X100V");
    }

    #[test]
    fn parse_takes_first_record() {
        let json = br#"[{"Model": "A"}, {"Model": "B"}]"#;
        let record = parse_exiftool_json(Path::new("a.jpg"), json).unwrap();
        assert_eq!(record["Model"], "A");
    }

    #[test]
    fn parse_empty_array_is_error() {
        let result = parse_exiftool_json(Path::new("a.jpg"), b"[]");
        assert!(matches!(
            result,
            Err(BackendError::UnexpectedOutput { message, .. }) if message == "empty result"
        ));
    }

    #[test]
    fn parse_non_array_is_error() {
        let result = parse_exiftool_json(Path::new("a.jpg"), br#"{"Model": "A"}"#);
        assert!(matches!(result, Err(BackendError::UnexpectedOutput { .. })));
    }

    #[test]
    fn parse_garbage_is_error() {
        let result = parse_exiftool_json(Path::new("a.jpg"), b"Error: File not found");
        assert!(matches!(result, Err(BackendError::UnexpectedOutput { .. })));
    }

    #[test]
    fn missing_binary_is_missing_tool() {
        let backend = ExternalToolsBackend {
            exiftool: "definitely-not-a-real-exiftool-binary".into(),
            magick: "definitely-not-a-real-magick-binary".into(),
        };
        assert!(matches!(
            backend.check_tools(),
            Err(BackendError::MissingTool { tool: "exiftool" })
        ));
        assert!(matches!(
            backend.read_metadata(Path::new("a.jpg")),
            Err(BackendError::MissingTool { tool: "exiftool" })
        ));
    }
}
