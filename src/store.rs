//! Local Schema Store
//!
//! Layout under the output root:
//!
//! ```text
//! <root>/
//! ├── orders/
//! │   ├── orders.avsc      (persisted by fetch)
//! │   ├── order.rs         (generated)
//! │   └── mod.rs           (generated)
//! └── events/
//!     ├── events.avsc
//!     └── actor.avsc       (placed out-of-band, still compiled)
//! ```
//!
//! Every subdirectory of the root is a unit, whether or not the current
//! configuration names it. This is what makes offline recompilation work.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::SchemaKind;
use crate::error::{Error, Result};

/// Schema text read back from disk, with its bare filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    pub file_name: String,
    pub text: String,
}

/// Persisted schemas under one output root
#[derive(Debug, Clone)]
pub struct SchemaStore {
    root: PathBuf,
    extension: &'static str,
}

impl SchemaStore {
    pub fn new(root: impl Into<PathBuf>, kind: SchemaKind) -> Self {
        Self {
            root: root.into(),
            extension: kind.extension(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding everything for `unit`
    pub fn unit_dir(&self, unit: &str) -> PathBuf {
        self.root.join(unit)
    }

    /// Canonical location of the persisted schema for `unit`
    pub fn schema_path(&self, unit: &str) -> PathBuf {
        self.unit_dir(unit).join(format!("{}.{}", unit, self.extension))
    }

    /// Create the root directory if it is missing
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| Error::fs(&self.root, e))
    }

    /// Create the directory for `unit` if it is missing
    pub fn ensure_unit(&self, unit: &str) -> Result<PathBuf> {
        let dir = self.unit_dir(unit);
        ensure_dir(&dir)?;
        Ok(dir)
    }

    /// Re-indent `raw` and write it to the unit's canonical path, replacing
    /// whatever was there
    pub fn persist(&self, unit: &str, raw: &str) -> Result<PathBuf> {
        let path = self.schema_path(unit);
        let pretty = pretty_print(raw).map_err(|e| Error::SchemaParse {
            file: path.display().to_string(),
            message: e.to_string(),
        })?;

        self.ensure_unit(unit)?;
        fs::write(&path, pretty).map_err(|e| Error::fs(&path, e))?;
        debug!(path = %path.display(), "persisted schema");
        Ok(path)
    }

    /// Names of every unit directory under the root, sorted
    pub fn units(&self) -> Result<Vec<String>> {
        let mut units = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| walk_error(&self.root, e))?;
            if entry.file_type().is_dir() {
                units.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(units)
    }

    /// Every schema file directly inside the unit directory, sorted by filename
    pub fn read_unit(&self, unit: &str) -> Result<Vec<SourceSchema>> {
        let dir = self.unit_dir(unit);
        let mut schemas = Vec::new();

        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| walk_error(&dir, e))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != self.extension) {
                continue;
            }

            let text = fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;
            schemas.push(SourceSchema {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                text,
            });
        }

        Ok(schemas)
    }

    /// Every unit and its schemas, in directory order
    pub fn read_all(&self) -> Result<Vec<(String, Vec<SourceSchema>)>> {
        self.units()?
            .into_iter()
            .map(|unit| {
                let schemas = self.read_unit(&unit)?;
                Ok((unit, schemas))
            })
            .collect()
    }
}

/// Parse `raw` as JSON and re-indent it with four spaces, keeping key order
pub fn pretty_print(raw: &str) -> serde_json::Result<String> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn ensure_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(Error::fs(path, e)),
    }
}

fn walk_error(root: &Path, e: walkdir::Error) -> Error {
    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
    let source = e
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(ErrorKind::Other, "directory loop"));
    Error::fs(path, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_pretty_print_keeps_field_order() {
        let raw = r#"{"type":"record","name":"Order","fields":[{"name":"id","type":"int"}]}"#;
        let pretty = pretty_print(raw).unwrap();
        assert!(pretty.starts_with("{\n    \"type\": \"record\",\n    \"name\": \"Order\""));
        assert!(pretty.contains("\n            \"name\": \"id\""));
        assert!(pretty.ends_with("}\n"));
    }

    #[test]
    fn test_persist_overwrites() {
        let dir = tempdir().unwrap();
        let store = SchemaStore::new(dir.path(), SchemaKind::Avro);
        store.ensure_root().unwrap();

        store.persist("orders", "\"string\"").unwrap();
        let path = store.persist("orders", "\"long\"").unwrap();

        assert_eq!(path, dir.path().join("orders").join("orders.avsc"));
        assert_eq!(fs::read_to_string(path).unwrap(), "\"long\"\n");
    }

    #[test]
    fn test_persist_rejects_malformed_json() {
        let dir = tempdir().unwrap();
        let store = SchemaStore::new(dir.path(), SchemaKind::Avro);
        assert!(matches!(
            store.persist("orders", "{not json"),
            Err(Error::SchemaParse { .. })
        ));
        assert!(!dir.path().join("orders").exists());
    }

    #[test]
    fn test_read_back_discovers_unconfigured_units() {
        let dir = tempdir().unwrap();
        let store = SchemaStore::new(dir.path(), SchemaKind::Avro);

        fs::create_dir_all(dir.path().join("events")).unwrap();
        fs::write(dir.path().join("events/event.avsc"), "\"string\"").unwrap();
        fs::write(dir.path().join("events/actor.avsc"), "\"int\"").unwrap();
        fs::write(dir.path().join("events/notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("stray.avsc"), "\"int\"").unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        assert_eq!(store.units().unwrap(), vec!["empty", "events"]);

        let schemas = store.read_unit("events").unwrap();
        let names: Vec<_> = schemas.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(names, vec!["actor.avsc", "event.avsc"]);
        assert_eq!(schemas[0].text, "\"int\"");

        assert!(store.read_unit("empty").unwrap().is_empty());
    }

    #[test]
    fn test_ensure_root_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = SchemaStore::new(dir.path().join("out"), SchemaKind::Avro);
        store.ensure_root().unwrap();
        store.ensure_root().unwrap();
        assert!(dir.path().join("out").is_dir());
    }

    #[test]
    fn test_ensure_root_reports_path() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let store = SchemaStore::new(blocker.join("out"), SchemaKind::Avro);
        match store.ensure_root() {
            Err(Error::FileSystem { path, .. }) => assert_eq!(path, blocker.join("out")),
            other => panic!("expected FileSystem error, got {:?}", other),
        }
    }
}
