//! Code Generation
//!
//! Turns a resolved [`Namespace`] into Rust source files.
//!
//! Architecture:
//! - CodegenContext: immutable after build(), holds the namespace, the name
//!   table and the cycle analysis
//! - Emitters (see [`rust`]): one file per record/enum/fixed, plus the unit
//!   scaffold `mod.rs`
//! - Writing is separate from emission, so the same output can be compared
//!   against disk without touching it
//!
//! Output is a pure function of the namespace and its ordered source list:
//! definitions are visited in qualified-name order.

pub mod names;
pub mod rust;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::{compute_scc_analysis, SccAnalysis, TypeGraph};
use crate::namespace::{Namespace, TypeDefinition};

use names::NameTable;

/// Identity written into every generated header
pub const TOOL_IDENTITY: &str = env!("CARGO_PKG_NAME");

// =============================================================================
// Generated Output
// =============================================================================

/// Whether a file holds one type or the unit scaffold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Type,
    Scaffold,
}

/// One generated source file, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub unit: String,
    pub file_name: String,
    pub content: String,
    pub kind: FileKind,
}

impl GeneratedFile {
    pub fn bytes(&self) -> &[u8] {
        self.content.as_bytes()
    }

    /// Location of this file under `root`
    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(&self.unit).join(&self.file_name)
    }
}

// =============================================================================
// CodegenContext
// =============================================================================

/// Immutable codegen context, frozen after build()
pub struct CodegenContext<'ns> {
    namespace: &'ns Namespace,
    names: NameTable,
    cycles: SccAnalysis,
    header: String,
}

impl<'ns> CodegenContext<'ns> {
    /// Resolve names and analyze cycles for `namespace`
    pub fn build(namespace: &'ns Namespace) -> Result<Self> {
        let names = NameTable::build(namespace)?;
        let graph = TypeGraph::build(namespace);
        let cycles = compute_scc_analysis(&graph);

        for group in &cycles.groups {
            debug!(unit = namespace.unit(), members = ?group.members, "recursive types will be boxed");
        }

        Ok(Self {
            namespace,
            names,
            cycles,
            header: codegen_comment(namespace.sources()),
        })
    }

    pub fn namespace(&self) -> &Namespace {
        self.namespace
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn cycles(&self) -> &SccAnalysis {
        &self.cycles
    }

    /// Generated-code header shared by every file of the unit
    pub fn header(&self) -> &str {
        &self.header
    }
}

/// Header marking a file as generated and listing the schema files it came from.
///
/// Expects at least one source.
pub fn codegen_comment(sources: &[String]) -> String {
    let mut block = String::new();
    block.push_str(&format!("// Code generated by {}. DO NOT EDIT.\n", TOOL_IDENTITY));
    block.push_str("/*\n");
    block.push_str(if sources.len() == 1 { " * SOURCE:\n" } else { " * SOURCES:\n" });
    for source in sources {
        let bare = Path::new(source)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());
        block.push_str(&format!(" *     {}\n", bare));
    }
    block.push_str(" */\n");
    block
}

// =============================================================================
// Public API
// =============================================================================

/// Emit every file for one unit: one per record/enum/fixed, then the scaffold
pub fn emit_unit(namespace: &Namespace) -> Result<Vec<GeneratedFile>> {
    let ctx = CodegenContext::build(namespace)?;
    let mut files = Vec::with_capacity(namespace.len() + 1);

    for definition in namespace.definitions() {
        let content = match definition {
            TypeDefinition::Record { .. } => rust::emit_record(definition, &ctx),
            TypeDefinition::Enum { .. } => rust::emit_enum(definition, &ctx),
            TypeDefinition::Fixed { .. } => rust::emit_fixed(definition, &ctx),
            TypeDefinition::PrimitiveAlias { .. } => continue,
        };
        let Some(resolved) = ctx.names().get(definition.name()) else {
            continue;
        };

        files.push(GeneratedFile {
            unit: namespace.unit().to_string(),
            file_name: resolved.file_name(),
            content,
            kind: FileKind::Type,
        });
    }

    files.push(GeneratedFile {
        unit: namespace.unit().to_string(),
        file_name: format!("{}.{}", names::SCAFFOLD_MODULE, names::GENERATED_EXTENSION),
        content: rust::emit_scaffold(&ctx),
        kind: FileKind::Scaffold,
    });

    Ok(files)
}

/// Write `files` under `root`, leaving files whose content is unchanged alone.
///
/// Returns how many files were actually written.
pub fn write_files(root: &Path, files: &[GeneratedFile]) -> Result<usize> {
    let mut written = 0;
    for file in files {
        let path = file.path(root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
        }

        match fs::read(&path) {
            Ok(existing) if existing == file.bytes() => {
                debug!(path = %path.display(), "unchanged");
                continue;
            }
            _ => {}
        }

        fs::write(&path, file.bytes()).map_err(|e| Error::fs(&path, e))?;
        debug!(path = %path.display(), "wrote generated file");
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::build_namespace;
    use crate::store::SourceSchema;

    #[test]
    fn test_single_source_header() {
        let header = codegen_comment(&["orders.avsc".to_string()]);
        assert_eq!(
            header,
            "// Code generated by registry-codegen. DO NOT EDIT.\n/*\n * SOURCE:\n *     orders.avsc\n */\n"
        );
    }

    #[test]
    fn test_multiple_sources_header_strips_directories() {
        let header = codegen_comment(&["events/event.avsc".to_string(), "actor.avsc".to_string()]);
        assert!(header.contains(" * SOURCES:\n *     event.avsc\n *     actor.avsc\n */\n"));
        assert!(!header.contains("SOURCE:\n"));
    }

    #[test]
    fn test_emit_unit_files() {
        let ns = build_namespace(
            "cards",
            &[SourceSchema {
                file_name: "cards.avsc".to_string(),
                text: r#"{"type":"record","name":"Card","fields":[
                    {"name":"suit","type":{"type":"enum","name":"Suit","symbols":["SPADES"]}},
                    {"name":"hash","type":{"type":"fixed","name":"CardHash","size":4}}]}"#
                    .to_string(),
            }],
        )
        .unwrap();

        let files = emit_unit(&ns).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["card.rs", "card_hash.rs", "suit.rs", "mod.rs"]);
        assert_eq!(files.last().unwrap().kind, FileKind::Scaffold);
        assert!(files.iter().all(|f| f.content.starts_with("// Code generated by registry-codegen. DO NOT EDIT.\n")));
        assert!(files.iter().all(|f| f.unit == "cards"));
    }

    #[test]
    fn test_write_files_skips_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let file = GeneratedFile {
            unit: "u".to_string(),
            file_name: "mod.rs".to_string(),
            content: "pub const PACKAGE: &str = \"u\";\n".to_string(),
            kind: FileKind::Scaffold,
        };

        assert_eq!(write_files(dir.path(), &[file.clone()]).unwrap(), 1);
        assert_eq!(write_files(dir.path(), &[file.clone()]).unwrap(), 0);
        assert_eq!(fs::read_to_string(file.path(dir.path())).unwrap(), file.content);
    }
}
