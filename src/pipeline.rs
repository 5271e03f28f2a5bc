//! Pipeline Orchestrator
//!
//! Sequences one run: validate, fetch and persist every configured unit, then
//! compile every unit directory found under the output root.
//!
//! Ordering contract:
//! - Configuration, schema kind and every version selector are checked before
//!   any directory is created or any registry call is made
//! - Units are fetched in configuration order and compiled in directory order,
//!   one at a time
//! - The first error aborts the run; nothing is retried or skipped
//! - Cancellation is observed only between units

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::codegen::{emit_unit, write_files, GeneratedFile};
use crate::config::{PipelineConfig, SchemaKind, UnitConfig};
use crate::error::{Error, Result};
use crate::namespace::build_namespace;
use crate::registry::RegistryClient;
use crate::store::SchemaStore;
use crate::version::VersionSelector;

/// What one run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Units persisted during the fetch phase, in configuration order
    pub fetched: Vec<String>,
    /// Units compiled, in directory order
    pub compiled: Vec<String>,
    /// Generated files whose content changed on disk
    pub files_written: usize,
}

/// One configured pipeline run
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    client: &'a dyn RegistryClient,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig, client: &'a dyn RegistryClient) -> Self {
        Self {
            config,
            client,
            cancel: None,
        }
    }

    /// Stop before the next unit once `flag` is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn run(&self) -> Result<RunReport> {
        let (kind, selectors) = preflight(self.config)?;

        let store = SchemaStore::new(&self.config.output_dir, kind);
        store.ensure_root()?;

        let mut report = RunReport::default();

        if self.config.fetches() {
            for (unit, selector) in self.config.schemas.iter().zip(&selectors) {
                self.check_cancelled(&unit.package)?;
                self.fetch_unit(&store, unit, selector)?;
                report.fetched.push(unit.package.clone());
            }
        } else {
            info!("fetch disabled, compiling schemas already on disk");
        }

        if !self.config.compile {
            info!(fetched = report.fetched.len(), "compile disabled, stopping after fetch");
            return Ok(report);
        }

        for unit in store.units()? {
            self.check_cancelled(&unit)?;
            let Some(files) = compile_unit(&store, &unit)? else {
                debug!(unit = %unit, "no schema files, skipping");
                continue;
            };
            report.files_written += write_files(store.root(), &files)?;
            report.compiled.push(unit);
        }

        info!(
            fetched = report.fetched.len(),
            compiled = report.compiled.len(),
            files_written = report.files_written,
            "pipeline complete"
        );
        Ok(report)
    }

    fn fetch_unit(&self, store: &SchemaStore, unit: &UnitConfig, selector: &VersionSelector) -> Result<()> {
        store.ensure_unit(&unit.package)?;

        let raw = match &unit.local_path {
            Some(path) => {
                info!(unit = %unit.package, path = %path.display(), "reading local schema");
                read_local(path)?
            }
            None => {
                info!(unit = %unit.package, subject = %unit.subject, version = %selector, "fetching schema");
                selector.resolve(self.client, &unit.subject)?
            }
        };

        store.persist(&unit.package, &raw)?;
        Ok(())
    }

    fn check_cancelled(&self, unit: &str) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => {
                info!(unit, "run cancelled");
                Err(Error::Cancelled { unit: unit.to_string() })
            }
            _ => Ok(()),
        }
    }
}

/// Run the pipeline for `config` against `client`
pub fn run(config: &PipelineConfig, client: &dyn RegistryClient) -> Result<RunReport> {
    Pipeline::new(config, client).run()
}

/// Every check that must pass before the run touches the filesystem or the network
pub fn preflight(config: &PipelineConfig) -> Result<(SchemaKind, Vec<VersionSelector>)> {
    config.validate().map_err(Error::ConfigValidation)?;
    let kind: SchemaKind = config.kind.parse()?;

    let selectors = config
        .schemas
        .iter()
        .map(|unit| VersionSelector::parse(&unit.subject, &unit.version))
        .collect::<Result<Vec<_>>>()?;

    Ok((kind, selectors))
}

/// Read back and emit one unit without writing anything.
///
/// Returns `None` when the unit directory holds no schema files.
pub fn compile_unit(store: &SchemaStore, unit: &str) -> Result<Option<Vec<GeneratedFile>>> {
    let sources = store.read_unit(unit)?;
    if sources.is_empty() {
        return Ok(None);
    }

    info!(unit, sources = sources.len(), "compiling unit");
    let namespace = build_namespace(unit, &sources)?;
    let files = emit_unit(&namespace)?;
    debug!(unit, types = namespace.len(), files = files.len(), "emitted unit");
    Ok(Some(files))
}

fn read_local(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::fs(path, e))
}
