// =============================================================================
// writer.rs — THE HANDOFF TO THE DASHBOARD
// =============================================================================
//
// The dashboard reads one file. This module writes it:
// 1. Serialize the ResultMap with 4-space indentation, non-ASCII left as-is
// 2. Write to a temp file in the target directory
// 3. Give it the old file's permissions (0644 for a fresh file)
// 4. Rename over the real file
//
// The rename means the web app sees either yesterday's file or today's,
// never half of one.
// =============================================================================

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::ResultMap;

/// Terminal failure of a run: the collected events could not be saved.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to move results into place at {}: {source}", path.display())]
    Persist { path: PathBuf, source: io::Error },
}

/// Writes a `ResultMap` to a fixed path.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_path: PathBuf,
}

impl ResultWriter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// Serialize and atomically replace the output file.
    pub fn write(&self, results: &ResultMap) -> Result<(), WriteError> {
        let document = render(results)?;

        let dir = match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&dir).map_err(|source| WriteError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let io_err = |source| WriteError::Io {
            path: self.output_path.clone(),
            source,
        };

        let mut temp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        temp.write_all(&document).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;

        // Temp files are created 0600; the web app may run as another user.
        let permissions = output_permissions(&self.output_path, temp.as_file()).map_err(io_err)?;
        temp.as_file().set_permissions(permissions).map_err(io_err)?;
        debug!(temp = %temp.path().display(), bytes = document.len(), "Results staged");

        temp.persist(&self.output_path)
            .map_err(|e| WriteError::Persist {
                path: self.output_path.clone(),
                source: e.error,
            })?;

        info!(
            path = %self.output_path.display(),
            categories = ?results.categories().collect::<Vec<_>>(),
            events = results.total_events(),
            "Done, saved to {}",
            self.output_path.display()
        );
        Ok(())
    }
}

/// Mode of the file being replaced, or `0644` when there is none yet.
fn output_permissions(target: &Path, staged: &fs::File) -> io::Result<fs::Permissions> {
    match fs::metadata(target) {
        Ok(existing) => Ok(existing.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fresh_permissions(staged),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn fresh_permissions(_staged: &fs::File) -> io::Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn fresh_permissions(staged: &fs::File) -> io::Result<fs::Permissions> {
    Ok(staged.metadata()?.permissions())
}

/// Pretty JSON, 4-space indent. serde_json never escapes non-ASCII, so
/// place names with accents come out readable.
pub fn render(results: &ResultMap) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    results.serialize(&mut serializer)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample() -> ResultMap {
        let mut results = ResultMap::new();
        results.insert(
            "wildfires",
            vec![json!({"id": "EONET_1", "title": "Incendio en Añelo, Neuquén"})],
        );
        results.insert("floods", vec![]);
        results
    }

    #[test]
    fn test_render_is_indented_and_keeps_unicode() {
        let text = String::from_utf8(render(&sample()).unwrap()).unwrap();
        assert!(text.starts_with("{\n    \"wildfires\": [\n        {"));
        assert!(text.contains("Añelo, Neuquén"));
        assert!(!text.contains("\\u"));
        assert!(text.contains("\"floods\": []"));
    }

    #[test]
    fn test_write_creates_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("coastal_events_last24h.json");
        let writer = ResultWriter::new(&path);

        writer.write(&sample()).unwrap();

        let parsed: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let object = parsed.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["wildfires"][0]["id"], "EONET_1");
        assert_eq!(object["floods"], json!([]));
    }

    #[test]
    fn test_write_replaces_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(&path, "stale").unwrap();

        let mut results = ResultMap::new();
        results.insert("drought", vec![]);
        ResultWriter::new(&path).write(&results).unwrap();

        let parsed: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, json!({"drought": []}));

        // Only the target remains; the temp file was renamed, not copied.
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o664)).unwrap();

        ResultWriter::new(&path).write(&sample()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o664);
    }

    #[cfg(unix)]
    #[test]
    fn test_fresh_output_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("events.json");

        ResultWriter::new(&path).write(&sample()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_write_into_a_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();

        let writer = ResultWriter::new(blocker.join("events.json"));
        let err = writer.write(&sample()).unwrap_err();
        assert!(matches!(err, WriteError::CreateDir { .. }));
    }
}
