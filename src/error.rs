//! Error types for the fetch-resolve-compile pipeline

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::registry::RegistryError;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors. Every variant aborts the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    ConfigValidation(Violations),

    #[error("schema kind {0:?} is not supported")]
    UnsupportedKind(String),

    #[error("version {selector:?} of subject {subject:?} is not \"latest\" or a positive integer")]
    VersionFormat { subject: String, selector: String },

    #[error("failed to fetch subject {subject:?} at version {selector}: {source}")]
    RegistryFetch {
        subject: String,
        selector: String,
        #[source]
        source: RegistryError,
    },

    #[error("filesystem error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed schema in {file}: {message}")]
    SchemaParse { file: String, message: String },

    #[error("type {name} is defined twice with different shapes in unit {unit}")]
    IncompatibleDefinition { name: String, unit: String },

    #[error("type {name} referenced in unit {unit} is not defined by any schema")]
    UnresolvedReference { name: String, unit: String },

    #[error("types {first} and {second} both generate {file} in unit {unit}")]
    FileNameCollision {
        unit: String,
        file: String,
        first: String,
        second: String,
    },

    #[error("types {first} and {second} both generate the Rust name {ident} in unit {unit}")]
    TypeNameCollision {
        unit: String,
        ident: String,
        first: String,
        second: String,
    },

    #[error("run cancelled before unit {unit}")]
    Cancelled { unit: String },
}

impl Error {
    /// Wrap an io error with the path it concerns
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileSystem {
            path: path.into(),
            source,
        }
    }
}

/// A single field-level configuration problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All violations found in one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// Check whether any violation concerns `field`
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", joined.join("; "))
    }
}
