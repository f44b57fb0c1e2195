//! # hearth-schema: schema migrations for hearth
//!
//! Typed column and index descriptors, a schema-mutation interface with an
//! in-memory double and a PostgreSQL backend, and a runner that applies an
//! ordered set of migration units forward or backward.

pub mod config;
pub mod error;
pub mod logging;
pub mod migrations;

pub use config::MigrationConfig;
pub use error::*;
pub use logging::{init_logging, LoggingConfig};
pub use migrations::*;

// Units only need the interface, the descriptors and the result type
pub mod prelude {
    pub use crate::error::{SchemaError, SchemaResult};
    pub use crate::migrations::mutator::{Migration, SchemaMutator};
    pub use crate::migrations::schema::{
        ColumnDef, ColumnType, GeometryKind, IndexDef, IndexPredicate, IndexTarget,
    };
    pub use async_trait::async_trait;
    pub use serde_json::json;
}
