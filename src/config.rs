//! Pipeline configuration
//!
//! Supports loading configuration from:
//! - Config file (`registry-codegen.yaml` / `registry-codegen.toml`)
//! - The user config directory
//! - An explicit file given on the command line
//! - Environment variables (`REGISTRY_CODEGEN__*`)
//!
//! ## Example config file (registry-codegen.yaml):
//! ```yaml
//! kind: avro
//! registry: http://localhost:8081
//! output_dir: ./generated
//! schemas:
//!   - subject: orders-value
//!     version: latest
//!     package: orders
//!   - subject: events-value
//!     version: "3"
//!     package: events
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use config_crate::{Config, ConfigError, Environment, File};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Violation, Violations};

/// Main configuration for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Schema language to compile; only `avro` has a compiler
    pub kind: String,

    /// Registry endpoint
    #[serde(default)]
    pub registry: String,

    /// Root for persisted schemas and generated code
    pub output_dir: PathBuf,

    /// Skip every registry call and compile what is already on disk
    #[serde(default)]
    pub no_fetch: bool,

    /// Compile after fetching
    #[serde(default = "default_true")]
    pub compile: bool,

    /// Units to fetch, in order
    #[serde(default)]
    pub schemas: Vec<UnitConfig>,
}

/// One subject fetched into one output unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Registry subject
    #[serde(default)]
    pub subject: String,

    /// `latest` or a positive integer
    #[serde(default = "default_version")]
    pub version: String,

    /// Output unit name: directory name and generated module name
    pub package: String,

    /// Read the schema from this file instead of the registry
    #[serde(default)]
    pub local_path: Option<PathBuf>,
}

/// Schema languages the pipeline knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Avro,
}

impl SchemaKind {
    /// Extension of persisted schema files
    pub fn extension(&self) -> &'static str {
        match self {
            SchemaKind::Avro => "avsc",
        }
    }
}

impl FromStr for SchemaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("avro") {
            Ok(SchemaKind::Avro)
        } else {
            Err(Error::UnsupportedKind(s.to_string()))
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    crate::version::LATEST.to_string()
}

impl UnitConfig {
    pub fn new(subject: impl Into<String>, version: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            version: version.into(),
            package: package.into(),
            local_path: None,
        }
    }
}

impl PipelineConfig {
    /// Minimal Avro config writing to `output_dir`
    pub fn new(registry: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: "avro".to_string(),
            registry: registry.into(),
            output_dir: output_dir.into(),
            no_fetch: false,
            compile: true,
            schemas: Vec::new(),
        }
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["registry-codegen", ".registry-codegen", "config/registry-codegen"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "registry-codegen", "registry-codegen") {
            for name in ["config.yaml", "config.toml"] {
                let candidate = dirs.config_dir().join(name);
                if candidate.exists() {
                    builder = builder.add_source(File::from(candidate).required(false));
                }
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("REGISTRY_CODEGEN")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Whether this run talks to the registry at all
    pub fn fetches(&self) -> bool {
        !self.no_fetch
    }

    /// Check every field, collecting all violations rather than stopping at the first
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Vec::new();
        let package_name = package_name_pattern();

        if self.kind.trim().is_empty() {
            violations.push(Violation::new("kind", "is required"));
        }
        if self.output_dir.as_os_str().is_empty() {
            violations.push(Violation::new("output_dir", "is required"));
        }
        if self.fetches() {
            if self.registry.trim().is_empty() {
                violations.push(Violation::new("registry", "is required unless no_fetch is set"));
            }
            if self.schemas.is_empty() {
                violations.push(Violation::new("schemas", "at least one schema is required unless no_fetch is set"));
            }
        }

        let mut seen = HashSet::new();
        for (i, unit) in self.schemas.iter().enumerate() {
            let field = |name: &str| format!("schemas[{}].{}", i, name);

            if unit.package.is_empty() {
                violations.push(Violation::new(field("package"), "is required"));
            } else if !package_name.is_match(&unit.package) {
                violations.push(Violation::new(
                    field("package"),
                    format!("{:?} must be a lower-case identifier", unit.package),
                ));
            } else if !seen.insert(unit.package.as_str()) {
                violations.push(Violation::new(
                    field("package"),
                    format!("{:?} is used by more than one schema", unit.package),
                ));
            }

            if self.fetches() && unit.local_path.is_none() && unit.subject.trim().is_empty() {
                violations.push(Violation::new(field("subject"), "is required when fetching from the registry"));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(Violations(violations))
        }
    }
}

fn package_name_pattern() -> Regex {
    Regex::new(r"^[a-z_][a-z0-9_]*$").expect("package name pattern is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PipelineConfig {
        let mut config = PipelineConfig::new("http://localhost:8081", "generated");
        config.schemas.push(UnitConfig::new("orders-value", "latest", "orders"));
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_collects_all_violations() {
        let mut config = valid_config();
        config.kind = String::new();
        config.registry = String::new();
        config.schemas.push(UnitConfig::new("", "1", "Orders-Two"));
        config.schemas.push(UnitConfig::new("x", "1", "orders"));

        let violations = config.validate().unwrap_err();
        assert!(violations.mentions("kind"));
        assert!(violations.mentions("registry"));
        assert!(violations.mentions("schemas[1].package"));
        assert!(violations.mentions("schemas[1].subject"));
        assert!(violations.mentions("schemas[2].package"));
        assert_eq!(violations.iter().count(), 5);
    }

    #[test]
    fn test_no_fetch_relaxes_registry_requirements() {
        let mut config = PipelineConfig::new("", "generated");
        config.no_fetch = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_path_needs_no_subject() {
        let mut config = valid_config();
        config.schemas[0].subject = String::new();
        config.schemas[0].local_path = Some(PathBuf::from("schemas/orders.avsc"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_schema_kind() {
        assert_eq!("Avro".parse::<SchemaKind>().unwrap(), SchemaKind::Avro);
        assert_eq!("avro".parse::<SchemaKind>().unwrap(), SchemaKind::Avro);
        assert!(matches!("protobuf".parse::<SchemaKind>(), Err(Error::UnsupportedKind(k)) if k == "protobuf"));
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(
            &path,
            "kind: avro\nregistry: http://registry:8081\noutput_dir: out\nschemas:\n  - subject: orders-value\n    version: \"2\"\n    package: orders\n",
        )
        .unwrap();

        let config = PipelineConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.registry, "http://registry:8081");
        assert!(config.compile);
        assert!(!config.no_fetch);
        assert_eq!(config.schemas.len(), 1);
        assert_eq!(config.schemas[0].version, "2");
        assert_eq!(config.schemas[0].package, "orders");
    }
}
