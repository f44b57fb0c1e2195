//! Migration System
//!
//! Descriptors, the schema-mutation interface, the ordered migration set,
//! and the runner that applies and reverts units against a backend.

pub mod definitions;
pub mod memory;
pub mod mutator;
pub mod postgres;
pub mod rollback;
pub mod runner;
pub mod schema;
pub mod set;
pub mod sql;

pub use definitions::*;
pub use memory::{
    ColumnState, IndexState, MemoryBackend, MemorySchema, MemorySession, Row, SchemaSnapshot,
    TableShape,
};
pub use mutator::{Migration, MigrationBackend, SchemaMutator, SchemaSession};
pub use postgres::{PgBackend, PgSchema};
pub use runner::MigrationRunner;
pub use schema::*;
pub use set::MigrationSet;
pub use sql::SchemaBuilder;
