//! Schema-mutation interface and the migration unit contract
//!
//! Units receive the mutation handle explicitly; backends decide whether the
//! handle is an in-memory model or a database transaction.

use async_trait::async_trait;

use super::definitions::MigrationRecord;
use super::schema::{ColumnDef, IndexDef, IndexTarget};
use crate::error::SchemaResult;

/// Capability for performing DDL-equivalent changes
#[async_trait]
pub trait SchemaMutator: Send {
    /// Add a new column to an existing table
    async fn add_column(&mut self, table: &str, column: &str, def: &ColumnDef) -> SchemaResult<()>;

    /// Drop a column
    async fn remove_column(&mut self, table: &str, column: &str) -> SchemaResult<()>;

    /// Change type, nullability, default and comment of an existing column
    async fn change_column(&mut self, table: &str, column: &str, def: &ColumnDef)
        -> SchemaResult<()>;

    /// Create an index; fails when an index with the same name exists
    async fn add_index(&mut self, index: &IndexDef) -> SchemaResult<()>;

    /// Drop an index; fails when it does not exist
    async fn remove_index(&mut self, table: &str, target: &IndexTarget) -> SchemaResult<()>;

    /// Create the index unless one with the same name exists.
    /// Returns whether the index was created.
    async fn add_index_if_absent(&mut self, index: &IndexDef) -> SchemaResult<bool>;

    /// Drop the index if it exists. Returns whether an index was dropped.
    async fn remove_index_if_present(&mut self, table: &str, name: &str) -> SchemaResult<bool>;

    /// Execute a raw statement
    async fn execute_raw(&mut self, sql: &str) -> SchemaResult<()>;
}

/// A single forward/reverse schema change
#[async_trait]
pub trait Migration: Send + Sync {
    /// Sortable, globally unique identifier (`YYYYMMDD_HHMMSS_name`)
    fn id(&self) -> &'static str;

    /// Human-readable name: the identifier without its timestamp segments
    fn name(&self) -> String {
        let words: Vec<&str> = self
            .id()
            .split('_')
            .skip_while(|part| part.chars().all(|c| c.is_ascii_digit()))
            .collect();
        if words.is_empty() {
            self.id().to_string()
        } else {
            words.join(" ")
        }
    }

    /// Move the schema forward
    async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()>;

    /// Undo `up`
    async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()>;
}

/// Mutation handle scoped to one unit, with ledger access.
/// Changes become visible only after `commit`.
#[async_trait]
pub trait SchemaSession: SchemaMutator + Sized {
    /// Record `id` as applied in `batch`
    async fn record_applied(&mut self, id: &str, batch: i32) -> SchemaResult<()>;

    /// Remove `id` from the ledger
    async fn remove_applied(&mut self, id: &str) -> SchemaResult<()>;

    async fn commit(self) -> SchemaResult<()>;

    async fn rollback(self) -> SchemaResult<()>;
}

/// A migration target: ledger plus a way to open unit sessions
#[async_trait]
pub trait MigrationBackend: Send + Sync {
    type Session: SchemaSession + 'static;

    /// Create the ledger if it does not exist
    async fn ensure_ledger(&self) -> SchemaResult<()>;

    /// Applied migrations, oldest first
    async fn applied_migrations(&self) -> SchemaResult<Vec<MigrationRecord>>;

    /// Open a session for one unit
    async fn begin(&self) -> SchemaResult<Self::Session>;
}
