//! PostgreSQL backend
//!
//! Each unit runs inside its own transaction; PostgreSQL DDL is
//! transactional, so a failing unit leaves no partial changes behind.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool, Postgres, Row, Transaction};

use super::definitions::MigrationRecord;
use super::mutator::{MigrationBackend, SchemaMutator, SchemaSession};
use super::schema::{ColumnDef, IndexDef, IndexTarget};
use super::sql::{quote_ident, SchemaBuilder};
use crate::config::MigrationConfig;
use crate::error::{ObjectKind, SchemaError, SchemaResult};

/// Migration backend over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
    config: MigrationConfig,
}

impl PgBackend {
    /// Create a backend from an existing pool
    pub fn new(pool: PgPool, config: MigrationConfig) -> SchemaResult<Self> {
        config.validate()?;
        Ok(Self { pool, config })
    }

    /// Connect using the configured database URL
    pub async fn connect(config: MigrationConfig) -> SchemaResult<Self> {
        config.validate()?;
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(config.require_database_url()?)
            .await?;
        Ok(Self { pool, config })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn ledger(&self) -> String {
        quote_ident(&self.config.migrations_table)
    }
}

#[async_trait]
impl MigrationBackend for PgBackend {
    type Session = PgSchema;

    async fn ensure_ledger(&self) -> SchemaResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id VARCHAR(255) PRIMARY KEY,\n    \
                applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,\n    \
                batch INTEGER NOT NULL\n\
            );",
            self.ledger()
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn applied_migrations(&self) -> SchemaResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT id, applied_at, batch FROM {} ORDER BY batch ASC, applied_at ASC, id ASC",
            self.ledger()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(MigrationRecord {
                id: row.try_get("id")?,
                applied_at: row.try_get("applied_at")?,
                batch: row.try_get("batch")?,
            });
        }
        Ok(records)
    }

    async fn begin(&self) -> SchemaResult<PgSchema> {
        let mut tx = self.pool.begin().await?;
        if let Some(ms) = self.config.lock_timeout_ms {
            let sql = format!("SET LOCAL lock_timeout = '{}ms'", ms);
            (&mut *tx).execute(sql.as_str()).await?;
        }
        Ok(PgSchema {
            tx,
            ledger: self.ledger(),
        })
    }
}

/// Schema-mutation handle bound to one PostgreSQL transaction
pub struct PgSchema {
    tx: Transaction<'static, Postgres>,
    ledger: String,
}

impl PgSchema {
    async fn execute_all(
        &mut self,
        builder: &SchemaBuilder,
        target: ErrorTarget<'_>,
    ) -> SchemaResult<()> {
        for statement in builder.to_sql() {
            tracing::debug!(statement = %statement, "executing DDL");
            sqlx::query(&statement)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| target.classify(e))?;
        }
        Ok(())
    }

    async fn index_exists(&mut self, name: &str) -> SchemaResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM pg_indexes WHERE schemaname = current_schema() AND indexname = $1",
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl SchemaMutator for PgSchema {
    async fn add_column(&mut self, table: &str, column: &str, def: &ColumnDef) -> SchemaResult<()> {
        if let Some(after) = def.after() {
            tracing::debug!(
                table,
                column,
                after,
                "PostgreSQL cannot position columns, hint ignored"
            );
        }
        let mut builder = SchemaBuilder::new();
        builder.add_column(table, column, def);
        let name = format!("{}.{}", table, column);
        self.execute_all(&builder, ErrorTarget::new(table, ObjectKind::Column, &name))
            .await
    }

    async fn remove_column(&mut self, table: &str, column: &str) -> SchemaResult<()> {
        let mut builder = SchemaBuilder::new();
        builder.drop_column(table, column);
        let name = format!("{}.{}", table, column);
        self.execute_all(&builder, ErrorTarget::new(table, ObjectKind::Column, &name))
            .await
    }

    async fn change_column(
        &mut self,
        table: &str,
        column: &str,
        def: &ColumnDef,
    ) -> SchemaResult<()> {
        let mut builder = SchemaBuilder::new();
        builder.change_column(table, column, def);
        let name = format!("{}.{}", table, column);
        self.execute_all(&builder, ErrorTarget::new(table, ObjectKind::Column, &name))
            .await
    }

    async fn add_index(&mut self, index: &IndexDef) -> SchemaResult<()> {
        let mut builder = SchemaBuilder::new();
        builder.create_index(index, false);
        self.execute_all(
            &builder,
            ErrorTarget::new(index.table(), ObjectKind::Index, index.name()),
        )
        .await
    }

    async fn remove_index(&mut self, table: &str, target: &IndexTarget) -> SchemaResult<()> {
        let name = target.resolve(table);
        let mut builder = SchemaBuilder::new();
        builder.drop_index(&name, false);
        self.execute_all(&builder, ErrorTarget::new(table, ObjectKind::Index, &name))
            .await
    }

    async fn add_index_if_absent(&mut self, index: &IndexDef) -> SchemaResult<bool> {
        if self.index_exists(index.name()).await? {
            tracing::debug!(index = index.name(), "index exists, skipping");
            return Ok(false);
        }
        let mut builder = SchemaBuilder::new();
        builder.create_index(index, true);
        self.execute_all(
            &builder,
            ErrorTarget::new(index.table(), ObjectKind::Index, index.name()),
        )
        .await?;
        Ok(true)
    }

    async fn remove_index_if_present(&mut self, table: &str, name: &str) -> SchemaResult<bool> {
        let existed = self.index_exists(name).await?;
        let mut builder = SchemaBuilder::new();
        builder.drop_index(name, true);
        self.execute_all(&builder, ErrorTarget::new(table, ObjectKind::Index, name))
            .await?;
        Ok(existed)
    }

    async fn execute_raw(&mut self, sql: &str) -> SchemaResult<()> {
        tracing::debug!(statement = %sql, "executing raw statement");
        (&mut *self.tx)
            .execute(sql)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) => {
                    SchemaError::MutationRejected(db.message().to_string())
                }
                other => SchemaError::Database(other),
            })?;
        Ok(())
    }
}

#[async_trait]
impl SchemaSession for PgSchema {
    async fn record_applied(&mut self, id: &str, batch: i32) -> SchemaResult<()> {
        let sql = format!(
            "INSERT INTO {} (id, applied_at, batch) VALUES ($1, CURRENT_TIMESTAMP, $2)",
            self.ledger
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(batch)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                    SchemaError::AlreadyApplied(id.to_string())
                }
                other => SchemaError::Database(other),
            })?;
        Ok(())
    }

    async fn remove_applied(&mut self, id: &str) -> SchemaResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.ledger);
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        if result.rows_affected() == 0 {
            return Err(SchemaError::UnknownMigration(id.to_string()));
        }
        Ok(())
    }

    async fn commit(self) -> SchemaResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> SchemaResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// What a failing statement was operating on, for error classification
#[derive(Debug, Clone, Copy)]
struct ErrorTarget<'a> {
    table: &'a str,
    kind: ObjectKind,
    name: &'a str,
}

impl<'a> ErrorTarget<'a> {
    fn new(table: &'a str, kind: ObjectKind, name: &'a str) -> Self {
        Self { table, kind, name }
    }

    /// Map a driver error onto the schema error taxonomy by SQLSTATE
    fn classify(&self, err: sqlx::Error) -> SchemaError {
        let db = match err {
            sqlx::Error::Database(db) => db,
            other => return SchemaError::Database(other),
        };
        classify_sqlstate(db.code().as_deref(), db.message(), *self)
    }
}

fn classify_sqlstate(code: Option<&str>, message: &str, target: ErrorTarget<'_>) -> SchemaError {
    match code {
        Some("42701") | Some("42P07") | Some("42710") => {
            SchemaError::already_exists(target.kind, target.name)
        }
        Some("42P01") => SchemaError::not_found(ObjectKind::Table, target.table),
        Some("42703") | Some("42704") => SchemaError::not_found(target.kind, target.name),
        _ => SchemaError::MutationRejected(message.to_string()),
    }
}
