//! Registry Codegen
//!
//! Fetches Avro schemas from a schema registry and compiles them into Rust
//! bindings, one output unit at a time.
//!
//! ## Features
//!
//! - **Version Resolution**: `latest` or an exact version per subject, validated before any I/O
//! - **Offline Recompilation**: every unit directory on disk is compiled, fetched this run or not
//! - **Shared Namespaces**: schema files of one unit may reference each other's types
//! - **Deterministic Output**: byte-identical files for identical input
//! - **Drift Detection**: compare generated files on disk with a fresh compile
//!
//! ## Architecture
//!
//! ```text
//! generated/
//! ├── orders/
//! │   ├── orders.avsc     (persisted, pretty-printed)
//! │   ├── order.rs        (one file per record, enum, fixed)
//! │   └── mod.rs          (unit scaffold)
//! └── events/
//!     ├── events.avsc
//!     ├── actor.avsc
//!     ├── actor.rs
//!     ├── event.rs
//!     └── mod.rs
//! ```

pub mod codegen;
pub mod config;
pub mod drift;
pub mod error;
pub mod graph;
pub mod namespace;
pub mod pipeline;
pub mod registry;
pub mod store;
pub mod version;

pub use codegen::{emit_unit, GeneratedFile};
pub use config::{PipelineConfig, SchemaKind, UnitConfig};
pub use drift::DriftReport;
pub use error::{Error, Result};
pub use namespace::{build_namespace, Namespace, TypeDefinition};
pub use pipeline::{Pipeline, RunReport};
pub use registry::{HttpRegistryClient, MemoryRegistry, RegistryClient};
pub use store::SchemaStore;
pub use version::VersionSelector;
