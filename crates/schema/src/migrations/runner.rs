//! Migration Runner - Executes migration units against a backend
//!
//! Applies pending units one at a time, each in its own session, tracks
//! applied units in the backend's ledger, and groups each run into a batch.

use std::collections::HashSet;
use std::time::Instant;

use super::definitions::{
    MigrationDirection, MigrationRecord, MigrationRunResult, MigrationStatus,
    MigrationStatusEntry,
};
use super::mutator::{Migration, MigrationBackend, SchemaSession};
use super::set::MigrationSet;
use crate::error::{SchemaError, SchemaResult};

/// Migration runner that executes a migration set against a backend
pub struct MigrationRunner<B: MigrationBackend> {
    backend: B,
    set: MigrationSet,
}

impl<B: MigrationBackend> MigrationRunner<B> {
    /// Create a new migration runner
    pub fn new(backend: B, set: MigrationSet) -> Self {
        Self { backend, set }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn migrations(&self) -> &MigrationSet {
        &self.set
    }

    /// Run all pending migrations in ascending id order.
    ///
    /// A failing unit is rolled back and halts the run; units applied
    /// earlier in the same run stay applied.
    pub async fn run_migrations(&self) -> SchemaResult<MigrationRunResult> {
        let start_time = Instant::now();

        self.backend.ensure_ledger().await?;
        let applied = self.backend.applied_migrations().await?;
        let applied_ids: HashSet<String> = applied.iter().map(|m| m.id.clone()).collect();

        let pending = self.set.pending(&applied_ids);
        if pending.is_empty() {
            tracing::info!(skipped = applied_ids.len(), "no pending migrations");
            return Ok(MigrationRunResult {
                skipped_count: applied_ids.len(),
                execution_time_ms: start_time.elapsed().as_millis(),
                ..MigrationRunResult::default()
            });
        }

        let batch = next_batch(&applied);
        let mut applied_migration_ids = Vec::new();

        for migration in pending {
            self.apply(migration, batch).await?;
            applied_migration_ids.push(migration.id().to_string());
        }

        Ok(MigrationRunResult {
            applied_count: applied_migration_ids.len(),
            applied_migrations: applied_migration_ids,
            skipped_count: applied_ids.len(),
            batch: Some(batch),
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Run a specific migration by ID
    pub async fn run_migration(&self, migration_id: &str) -> SchemaResult<()> {
        let migration = self
            .set
            .get(migration_id)
            .ok_or_else(|| SchemaError::UnknownMigration(migration_id.to_string()))?;

        self.backend.ensure_ledger().await?;
        let applied = self.backend.applied_migrations().await?;
        if applied.iter().any(|m| m.id == migration_id) {
            return Err(SchemaError::AlreadyApplied(migration_id.to_string()));
        }

        self.apply(migration, next_batch(&applied)).await
    }

    /// Every unit with its current status, in ascending id order
    pub async fn status(&self) -> SchemaResult<Vec<MigrationStatusEntry>> {
        self.backend.ensure_ledger().await?;
        let applied = self.backend.applied_migrations().await?;

        Ok(self
            .set
            .iter()
            .map(|migration| {
                let status = applied
                    .iter()
                    .find(|record| record.id == migration.id())
                    .map(|record| MigrationStatus::Applied {
                        applied_at: record.applied_at,
                        batch: record.batch,
                    })
                    .unwrap_or(MigrationStatus::Pending);
                MigrationStatusEntry {
                    id: migration.id().to_string(),
                    name: migration.name(),
                    status,
                }
            })
            .collect())
    }

    /// Applied migrations from the ledger, oldest first
    pub async fn applied_migrations(&self) -> SchemaResult<Vec<MigrationRecord>> {
        self.backend.ensure_ledger().await?;
        self.backend.applied_migrations().await
    }

    /// Apply a single migration inside its own session
    async fn apply(&self, migration: &dyn Migration, batch: i32) -> SchemaResult<()> {
        let started = Instant::now();
        tracing::info!(migration_id = migration.id(), batch, "applying migration");

        let mut session = self.backend.begin().await?;
        let outcome = match migration.up(&mut session).await {
            Ok(()) => session.record_applied(migration.id(), batch).await,
            Err(e) => Err(e),
        };

        self.finish(session, outcome, migration, MigrationDirection::Up)
            .await?;

        tracing::info!(
            migration_id = migration.id(),
            batch,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "applied migration"
        );
        Ok(())
    }

    /// Revert a single migration inside its own session
    pub(crate) async fn revert(&self, migration: &dyn Migration) -> SchemaResult<()> {
        let started = Instant::now();
        tracing::info!(migration_id = migration.id(), "reverting migration");

        let mut session = self.backend.begin().await?;
        let outcome = match migration.down(&mut session).await {
            Ok(()) => session.remove_applied(migration.id()).await,
            Err(e) => Err(e),
        };

        self.finish(session, outcome, migration, MigrationDirection::Down)
            .await?;

        tracing::info!(
            migration_id = migration.id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reverted migration"
        );
        Ok(())
    }

    /// Commit on success; otherwise roll back and report the unit
    async fn finish(
        &self,
        session: B::Session,
        outcome: SchemaResult<()>,
        migration: &dyn Migration,
        direction: MigrationDirection,
    ) -> SchemaResult<()> {
        match outcome {
            Ok(()) => session
                .commit()
                .await
                .map_err(|e| SchemaError::unit_failed(migration.id(), direction, e)),
            Err(e) => {
                tracing::warn!(
                    migration_id = migration.id(),
                    %direction,
                    error = %e,
                    "migration failed, rolling back"
                );
                if let Err(rollback_error) = session.rollback().await {
                    tracing::warn!(
                        migration_id = migration.id(),
                        error = %rollback_error,
                        "rollback of failed migration also failed"
                    );
                }
                Err(SchemaError::unit_failed(migration.id(), direction, e))
            }
        }
    }
}

fn next_batch(applied: &[MigrationRecord]) -> i32 {
    applied.iter().map(|m| m.batch).max().unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObjectKind;
    use crate::migrations::memory::{MemoryBackend, MemorySchema};
    use crate::migrations::mutator::SchemaMutator;
    use crate::migrations::schema::{ColumnDef, ColumnType};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Adds a TEXT column named after the unit and journals each call
    struct AddColumn {
        id: &'static str,
        column: &'static str,
        journal: Journal,
    }

    #[async_trait]
    impl Migration for AddColumn {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
            self.journal.lock().unwrap().push(format!("up {}", self.id));
            let def = ColumnDef::builder(ColumnType::Text).build()?;
            schema.add_column("Listings", self.column, &def).await
        }

        async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
            self.journal.lock().unwrap().push(format!("down {}", self.id));
            schema.remove_column("Listings", self.column).await
        }
    }

    fn backend() -> MemoryBackend {
        let mut schema = MemorySchema::new();
        schema
            .create_table(
                "Listings",
                vec![("id", ColumnDef::builder(ColumnType::Integer).not_null().build().unwrap())],
            )
            .unwrap();
        MemoryBackend::new(schema)
    }

    fn runner(
        units: &[(&'static str, &'static str)],
        journal: &Journal,
    ) -> MigrationRunner<MemoryBackend> {
        let set = MigrationSet::new(
            units
                .iter()
                .map(|&(id, column)| {
                    Box::new(AddColumn {
                        id,
                        column,
                        journal: Arc::clone(journal),
                    }) as Box<dyn Migration>
                })
                .collect(),
        )
        .unwrap();
        MigrationRunner::new(backend(), set)
    }

    #[tokio::test]
    async fn test_run_migrations_applies_in_ascending_order() {
        let journal = Journal::default();
        let runner = runner(&[("3_c", "c"), ("1_a", "a"), ("2_b", "b")], &journal);

        let result = runner.run_migrations().await.unwrap();

        assert_eq!(result.applied_migrations, vec!["1_a", "2_b", "3_c"]);
        assert_eq!(result.batch, Some(1));
        assert_eq!(*journal.lock().unwrap(), vec!["up 1_a", "up 2_b", "up 3_c"]);

        let again = runner.run_migrations().await.unwrap();
        assert_eq!(again.applied_count, 0);
        assert_eq!(again.skipped_count, 3);
    }

    #[tokio::test]
    async fn test_each_run_is_a_new_batch() {
        let journal = Journal::default();
        let runner = runner(&[("1_a", "a"), ("2_b", "b")], &journal);

        runner.run_migration("1_a").await.unwrap();
        let result = runner.run_migrations().await.unwrap();

        assert_eq!(result.applied_migrations, vec!["2_b"]);
        assert_eq!(result.batch, Some(2));
    }

    #[tokio::test]
    async fn test_run_migration_twice_fails_fast() {
        let journal = Journal::default();
        let runner = runner(&[("1_a", "a")], &journal);

        runner.run_migration("1_a").await.unwrap();
        let err = runner.run_migration("1_a").await.unwrap_err();

        assert!(matches!(err, SchemaError::AlreadyApplied(_)));
        assert_eq!(journal.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_unit_halts_run_and_keeps_earlier_units() {
        let journal = Journal::default();
        // 2_b collides with the column 1_a adds, 3_c never runs
        let runner = runner(&[("1_a", "a"), ("2_b", "a"), ("3_c", "c")], &journal);

        let err = runner.run_migrations().await.unwrap_err();

        match &err {
            SchemaError::UnitFailed { id, direction, .. } => {
                assert_eq!(id, "2_b");
                assert_eq!(*direction, MigrationDirection::Up);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(matches!(
            err.root_cause(),
            SchemaError::AlreadyExists { kind: ObjectKind::Column, .. }
        ));

        let applied: Vec<_> = runner
            .applied_migrations()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(applied, vec!["1_a"]);
        assert_eq!(*journal.lock().unwrap(), vec!["up 1_a", "up 2_b"]);
    }

    #[tokio::test]
    async fn test_status() {
        let journal = Journal::default();
        let runner = runner(&[("1_a", "a"), ("2_b", "b")], &journal);
        runner.run_migration("1_a").await.unwrap();

        let status = runner.status().await.unwrap();

        assert_eq!(status.len(), 2);
        assert!(status[0].status.is_applied());
        assert_eq!(status[1].status, MigrationStatus::Pending);
        assert_eq!(status[1].name, "b");
    }

    #[tokio::test]
    async fn test_unknown_migration() {
        let journal = Journal::default();
        let runner = runner(&[("1_a", "a")], &journal);

        let err = runner.run_migration("9_z").await.unwrap_err();
        assert!(matches!(err, SchemaError::UnknownMigration(_)));
    }
}
