//! In-memory schema double
//!
//! `MemorySchema` models tables, ordered columns, named indexes and rows, and
//! enforces the same failure rules a relational database would for the
//! supported DDL. `MemoryBackend` wraps it with a ledger and per-unit staged
//! sessions so the runner can be exercised without a database.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use super::definitions::MigrationRecord;
use super::mutator::{MigrationBackend, SchemaMutator, SchemaSession};
use super::schema::{ColumnDef, ColumnType, IndexDef, IndexPredicate, IndexTarget};
use crate::error::{ObjectKind, SchemaError, SchemaResult};

/// A stored row, keyed by column name
pub type Row = BTreeMap<String, Value>;

/// Column as currently declared
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnState {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<Value>,
    pub comment: Option<String>,
}

/// Index as currently declared
#[derive(Debug, Clone, PartialEq)]
pub struct IndexState {
    pub name: String,
    pub columns: Vec<String>,
    pub predicate: Option<IndexPredicate>,
    pub unique: bool,
}

/// Structural shape of a table: columns in order and indexes by name
#[derive(Debug, Clone, PartialEq)]
pub struct TableShape {
    pub columns: Vec<ColumnState>,
    pub indexes: BTreeMap<String, IndexState>,
}

/// Structural shape of every table, without rows
pub type SchemaSnapshot = BTreeMap<String, TableShape>;

#[derive(Debug, Clone, Default)]
struct TableState {
    columns: Vec<ColumnState>,
    indexes: BTreeMap<String, IndexState>,
    rows: Vec<Row>,
}

impl TableState {
    fn column(&self, name: &str) -> Option<&ColumnState> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// In-process schema model implementing `SchemaMutator`
#[derive(Debug, Clone, Default)]
pub struct MemorySchema {
    tables: BTreeMap<String, TableState>,
    raw_statements: Vec<String>,
}

impl MemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with the given columns in order
    pub fn create_table(
        &mut self,
        name: &str,
        columns: Vec<(&str, ColumnDef)>,
    ) -> SchemaResult<()> {
        if self.tables.contains_key(name) {
            return Err(SchemaError::already_exists(ObjectKind::Table, name));
        }

        let mut table = TableState::default();
        for (column, def) in columns {
            if table.column(column).is_some() {
                return Err(SchemaError::already_exists(
                    ObjectKind::Column,
                    qualified(name, column),
                ));
            }
            table.columns.push(column_state(column, def));
        }

        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Insert a row given as a JSON object. Omitted columns take their default.
    pub fn insert_row(&mut self, table: &str, row: Value) -> SchemaResult<()> {
        let state = self.table_mut(table)?;
        let mut values = match row {
            Value::Object(map) => map,
            other => {
                return Err(SchemaError::MutationRejected(format!(
                    "row for {} must be an object, got {}",
                    table, other
                )))
            }
        };

        if let Some(unknown) = values.keys().find(|k| state.column(k).is_none()) {
            return Err(SchemaError::not_found(
                ObjectKind::Column,
                qualified(table, unknown),
            ));
        }

        let mut stored = Row::new();
        for column in &state.columns {
            let value = values
                .remove(&column.name)
                .or_else(|| column.default.clone())
                .unwrap_or(Value::Null);
            check_value(table, column, &value)?;
            stored.insert(column.name.clone(), value);
        }

        state.rows.push(stored);
        Ok(())
    }

    /// Rows currently stored in `table`
    pub fn rows(&self, table: &str) -> SchemaResult<&[Row]> {
        Ok(&self.table_ref(table)?.rows)
    }

    /// Declared state of one column
    pub fn column(&self, table: &str, column: &str) -> Option<&ColumnState> {
        self.tables.get(table).and_then(|t| t.column(column))
    }

    /// Declared state of one index on `table`
    pub fn index(&self, table: &str, name: &str) -> Option<&IndexState> {
        self.tables.get(table).and_then(|t| t.indexes.get(name))
    }

    /// Number of indexes named `name` across all tables
    pub fn index_count(&self, name: &str) -> usize {
        self.tables
            .values()
            .filter(|t| t.indexes.contains_key(name))
            .count()
    }

    pub fn table_shape(&self, table: &str) -> Option<TableShape> {
        self.tables.get(table).map(|t| TableShape {
            columns: t.columns.clone(),
            indexes: t.indexes.clone(),
        })
    }

    /// Structure of every table, for before/after comparisons
    pub fn snapshot(&self) -> SchemaSnapshot {
        self.tables
            .keys()
            .filter_map(|name| self.table_shape(name).map(|shape| (name.clone(), shape)))
            .collect()
    }

    /// Statements passed to `execute_raw`, in order
    pub fn raw_statements(&self) -> &[String] {
        &self.raw_statements
    }

    fn table_ref(&self, table: &str) -> SchemaResult<&TableState> {
        self.tables
            .get(table)
            .ok_or_else(|| SchemaError::not_found(ObjectKind::Table, table))
    }

    fn table_mut(&mut self, table: &str) -> SchemaResult<&mut TableState> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| SchemaError::not_found(ObjectKind::Table, table))
    }
}

#[async_trait]
impl SchemaMutator for MemorySchema {
    async fn add_column(&mut self, table: &str, column: &str, def: &ColumnDef) -> SchemaResult<()> {
        let state = self.table_mut(table)?;
        if state.column(column).is_some() {
            return Err(SchemaError::already_exists(
                ObjectKind::Column,
                qualified(table, column),
            ));
        }

        let position = match def.after() {
            Some(after) => state
                .position(after)
                .map(|i| i + 1)
                .ok_or_else(|| {
                    SchemaError::not_found(ObjectKind::Column, qualified(table, after))
                })?,
            None => state.columns.len(),
        };

        if !def.is_nullable() && def.default_value().is_none() && !state.rows.is_empty() {
            return Err(SchemaError::MutationRejected(format!(
                "column {} is NOT NULL without a default and {} has rows",
                qualified(table, column),
                table
            )));
        }

        let fill = def.default_value().cloned().unwrap_or(Value::Null);
        for row in &mut state.rows {
            row.insert(column.to_string(), fill.clone());
        }
        state.columns.insert(position, column_state(column, def.clone()));
        Ok(())
    }

    async fn remove_column(&mut self, table: &str, column: &str) -> SchemaResult<()> {
        let state = self.table_mut(table)?;
        let position = state
            .position(column)
            .ok_or_else(|| SchemaError::not_found(ObjectKind::Column, qualified(table, column)))?;

        state.columns.remove(position);
        for row in &mut state.rows {
            row.remove(column);
        }
        state.indexes.retain(|_, index| {
            !index.columns.iter().any(|c| c == column)
                && !index
                    .predicate
                    .as_ref()
                    .map_or(false, |p| p.columns().contains(&column))
        });
        Ok(())
    }

    async fn change_column(
        &mut self,
        table: &str,
        column: &str,
        def: &ColumnDef,
    ) -> SchemaResult<()> {
        let state = self.table_mut(table)?;
        let position = state
            .position(column)
            .ok_or_else(|| SchemaError::not_found(ObjectKind::Column, qualified(table, column)))?;

        let mut changed = column_state(column, def.clone());
        if changed.comment.is_none() {
            changed.comment = state.columns[position].comment.clone();
        }

        for row in &state.rows {
            let value = row.get(column).unwrap_or(&Value::Null);
            check_value(table, &changed, value)?;
        }

        state.columns[position] = changed;
        Ok(())
    }

    async fn add_index(&mut self, index: &IndexDef) -> SchemaResult<()> {
        if self.index_count(index.name()) > 0 {
            return Err(SchemaError::already_exists(ObjectKind::Index, index.name()));
        }

        let table = index.table();
        let state = self.table_mut(table)?;
        let predicate_columns = index.predicate().map(|p| p.columns()).unwrap_or_default();
        for column in index.columns().iter().map(String::as_str).chain(predicate_columns) {
            if state.column(column).is_none() {
                return Err(SchemaError::not_found(
                    ObjectKind::Column,
                    qualified(table, column),
                ));
            }
        }

        state.indexes.insert(
            index.name().to_string(),
            IndexState {
                name: index.name().to_string(),
                columns: index.columns().to_vec(),
                predicate: index.predicate().cloned(),
                unique: index.is_unique(),
            },
        );
        Ok(())
    }

    async fn remove_index(&mut self, table: &str, target: &IndexTarget) -> SchemaResult<()> {
        let name = target.resolve(table);
        let state = self.table_mut(table)?;
        state
            .indexes
            .remove(&name)
            .map(|_| ())
            .ok_or_else(|| SchemaError::not_found(ObjectKind::Index, name))
    }

    async fn add_index_if_absent(&mut self, index: &IndexDef) -> SchemaResult<bool> {
        if self.index_count(index.name()) > 0 {
            return Ok(false);
        }
        self.add_index(index).await?;
        Ok(true)
    }

    async fn remove_index_if_present(&mut self, table: &str, name: &str) -> SchemaResult<bool> {
        match self.tables.get_mut(table) {
            Some(state) => Ok(state.indexes.remove(name).is_some()),
            None => Ok(false),
        }
    }

    async fn execute_raw(&mut self, sql: &str) -> SchemaResult<()> {
        self.raw_statements.push(sql.to_string());
        Ok(())
    }
}

fn qualified(table: &str, column: &str) -> String {
    format!("{}.{}", table, column)
}

fn column_state(name: &str, def: ColumnDef) -> ColumnState {
    ColumnState {
        name: name.to_string(),
        column_type: def.column_type().clone(),
        nullable: def.is_nullable(),
        default: def.default_value().cloned(),
        comment: def.comment().map(str::to_string),
    }
}

fn check_value(table: &str, column: &ColumnState, value: &Value) -> SchemaResult<()> {
    if value.is_null() && !column.nullable {
        return Err(SchemaError::MutationRejected(format!(
            "column {} contains null values",
            qualified(table, &column.name)
        )));
    }
    if !column.column_type.accepts(value) {
        return Err(SchemaError::MutationRejected(format!(
            "value {} does not fit {:?} in column {}",
            value,
            column.column_type,
            qualified(table, &column.name)
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    schema: MemorySchema,
    ledger: Vec<MigrationRecord>,
}

/// Migration backend over a shared `MemorySchema`
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Backend starting from an existing schema and an empty ledger
    pub fn new(schema: MemorySchema) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                schema,
                ledger: Vec::new(),
            })),
        }
    }

    /// Copy of the committed schema
    pub async fn schema(&self) -> MemorySchema {
        self.state.lock().await.schema.clone()
    }
}

#[async_trait]
impl MigrationBackend for MemoryBackend {
    type Session = MemorySession;

    async fn ensure_ledger(&self) -> SchemaResult<()> {
        Ok(())
    }

    async fn applied_migrations(&self) -> SchemaResult<Vec<MigrationRecord>> {
        Ok(self.state.lock().await.ledger.clone())
    }

    async fn begin(&self) -> SchemaResult<MemorySession> {
        let staged = self.state.lock().await.clone();
        Ok(MemorySession {
            staged,
            target: Arc::clone(&self.state),
        })
    }
}

/// Staged copy of the backend state; `commit` publishes it
#[derive(Debug)]
pub struct MemorySession {
    staged: MemoryState,
    target: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl SchemaMutator for MemorySession {
    async fn add_column(&mut self, table: &str, column: &str, def: &ColumnDef) -> SchemaResult<()> {
        self.staged.schema.add_column(table, column, def).await
    }

    async fn remove_column(&mut self, table: &str, column: &str) -> SchemaResult<()> {
        self.staged.schema.remove_column(table, column).await
    }

    async fn change_column(
        &mut self,
        table: &str,
        column: &str,
        def: &ColumnDef,
    ) -> SchemaResult<()> {
        self.staged.schema.change_column(table, column, def).await
    }

    async fn add_index(&mut self, index: &IndexDef) -> SchemaResult<()> {
        self.staged.schema.add_index(index).await
    }

    async fn remove_index(&mut self, table: &str, target: &IndexTarget) -> SchemaResult<()> {
        self.staged.schema.remove_index(table, target).await
    }

    async fn add_index_if_absent(&mut self, index: &IndexDef) -> SchemaResult<bool> {
        self.staged.schema.add_index_if_absent(index).await
    }

    async fn remove_index_if_present(&mut self, table: &str, name: &str) -> SchemaResult<bool> {
        self.staged.schema.remove_index_if_present(table, name).await
    }

    async fn execute_raw(&mut self, sql: &str) -> SchemaResult<()> {
        self.staged.schema.execute_raw(sql).await
    }
}

#[async_trait]
impl SchemaSession for MemorySession {
    async fn record_applied(&mut self, id: &str, batch: i32) -> SchemaResult<()> {
        if self.staged.ledger.iter().any(|r| r.id == id) {
            return Err(SchemaError::AlreadyApplied(id.to_string()));
        }
        self.staged.ledger.push(MigrationRecord {
            id: id.to_string(),
            applied_at: Utc::now(),
            batch,
        });
        Ok(())
    }

    async fn remove_applied(&mut self, id: &str) -> SchemaResult<()> {
        let before = self.staged.ledger.len();
        self.staged.ledger.retain(|r| r.id != id);
        if self.staged.ledger.len() == before {
            return Err(SchemaError::UnknownMigration(id.to_string()));
        }
        Ok(())
    }

    async fn commit(self) -> SchemaResult<()> {
        let MemorySession { staged, target } = self;
        *target.lock().await = staged;
        Ok(())
    }

    async fn rollback(self) -> SchemaResult<()> {
        Ok(())
    }
}
