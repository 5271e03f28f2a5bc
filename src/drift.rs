//! Generated Code Drift Detection
//!
//! Recompiles every unit on disk in memory and compares the result with the
//! generated files already written. Nothing is fetched and nothing is written.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::codegen::names::GENERATED_EXTENSION;
use crate::config::{PipelineConfig, SchemaKind};
use crate::error::{Error, Result};
use crate::pipeline::compile_unit;
use crate::store::SchemaStore;

/// Differences between what would be generated and what is on disk
#[derive(Debug, Clone, Default, Serialize)]
pub struct DriftReport {
    /// Units that were recompiled
    pub units: Vec<String>,
    /// Generated files that do not exist yet
    pub missing: Vec<PathBuf>,
    /// Generated files whose content differs
    pub changed: Vec<FileDrift>,
    /// Generated-extension files no schema produces any more
    pub stale: Vec<PathBuf>,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileDrift {
    pub path: PathBuf,
    pub lines_added: usize,
    pub lines_removed: usize,
    /// Unified diff from the file on disk to the expected content
    pub diff: String,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        !self.missing.is_empty() || !self.changed.is_empty() || !self.stale.is_empty()
    }
}

/// Compare the generated tree under `config.output_dir` with a fresh compile
pub fn check(config: &PipelineConfig) -> Result<DriftReport> {
    let kind: SchemaKind = config.kind.parse()?;
    let store = SchemaStore::new(&config.output_dir, kind);
    let mut report = DriftReport::default();

    for unit in store.units()? {
        let Some(files) = compile_unit(&store, &unit)? else {
            continue;
        };

        let mut expected = HashSet::new();
        for file in &files {
            let path = file.path(store.root());
            expected.insert(path.clone());

            let on_disk = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "missing");
                    report.missing.push(path);
                    continue;
                }
                Err(e) => return Err(Error::fs(&path, e)),
            };

            if on_disk == file.content {
                report.unchanged += 1;
            } else {
                debug!(path = %path.display(), "changed");
                report.changed.push(file_drift(path, &on_disk, &file.content));
            }
        }

        let unit_dir = store.unit_dir(&unit);
        for entry in WalkDir::new(&unit_dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(ErrorKind::Other, "directory loop"));
                Error::fs(&unit_dir, source)
            })?;
            let path = entry.path();
            let generated = path.extension().map_or(false, |ext| ext == GENERATED_EXTENSION);
            if entry.file_type().is_file() && generated && !expected.contains(path) {
                report.stale.push(path.to_path_buf());
            }
        }

        report.units.push(unit);
    }

    info!(
        units = report.units.len(),
        missing = report.missing.len(),
        changed = report.changed.len(),
        stale = report.stale.len(),
        "drift check complete"
    );
    Ok(report)
}

fn file_drift(path: PathBuf, on_disk: &str, expected: &str) -> FileDrift {
    let diff = TextDiff::from_lines(on_disk, expected);

    let mut lines_added = 0;
    let mut lines_removed = 0;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => lines_added += 1,
            ChangeTag::Delete => lines_removed += 1,
            ChangeTag::Equal => {}
        }
    }

    let name = path.display().to_string();
    let unified = diff
        .unified_diff()
        .context_radius(3)
        .header(&name, &format!("{} (expected)", name))
        .to_string();

    FileDrift {
        path,
        lines_added,
        lines_removed,
        diff: unified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline;
    use crate::registry::MemoryRegistry;
    use tempfile::tempdir;

    fn generated_tree() -> (tempfile::TempDir, PipelineConfig) {
        let dir = tempdir().unwrap();
        let unit = dir.path().join("orders");
        fs::create_dir_all(&unit).unwrap();
        fs::write(
            unit.join("orders.avsc"),
            r#"{"type":"record","name":"Order","fields":[{"name":"id","type":"int"}]}"#,
        )
        .unwrap();

        let mut config = PipelineConfig::new("", dir.path());
        config.no_fetch = true;
        pipeline::run(&config, &MemoryRegistry::new()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_clean_tree_has_no_drift() {
        let (_dir, config) = generated_tree();
        let report = check(&config).unwrap();
        assert!(!report.has_drift());
        assert_eq!(report.units, vec!["orders"]);
        assert_eq!(report.unchanged, 2);
    }

    #[test]
    fn test_detects_edited_missing_and_stale_files() {
        let (dir, config) = generated_tree();
        let unit = dir.path().join("orders");

        let order = unit.join("order.rs");
        let edited = fs::read_to_string(&order).unwrap().replace("pub id: i32", "pub id: i64");
        fs::write(&order, edited).unwrap();
        fs::remove_file(unit.join("mod.rs")).unwrap();
        fs::write(unit.join("old_type.rs"), "").unwrap();

        let report = check(&config).unwrap();
        assert!(report.has_drift());
        assert_eq!(report.missing, vec![unit.join("mod.rs")]);
        assert_eq!(report.stale, vec![unit.join("old_type.rs")]);

        let drift = &report.changed[0];
        assert_eq!(drift.path, order);
        assert_eq!((drift.lines_added, drift.lines_removed), (1, 1));
        assert!(drift.diff.contains("-    pub id: i64,\n"));
        assert!(drift.diff.contains("+    pub id: i32,\n"));
    }
}
