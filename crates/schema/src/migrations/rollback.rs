//! Migration Rollback - Reverts applied migrations
//!
//! Units are reverted newest first: by step count, by batch, one specific
//! unit, or everything.

use std::time::Instant;

use super::definitions::RollbackResult;
use super::mutator::MigrationBackend;
use super::runner::MigrationRunner;
use crate::error::{SchemaError, SchemaResult};

impl<B: MigrationBackend> MigrationRunner<B> {
    /// Revert the `steps` most recently applied migrations
    pub async fn rollback(&self, steps: usize) -> SchemaResult<RollbackResult> {
        let start_time = Instant::now();

        self.backend().ensure_ledger().await?;
        let applied = self.backend().applied_migrations().await?;
        let plan = self.migrations().plan_rollback(&applied, steps)?;

        let mut rolled_back_migrations = Vec::new();
        for migration in plan {
            self.revert(migration).await?;
            rolled_back_migrations.push(migration.id().to_string());
        }

        Ok(RollbackResult {
            rolled_back_count: rolled_back_migrations.len(),
            rolled_back_migrations,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Revert every migration in the most recent batch
    pub async fn rollback_last_batch(&self) -> SchemaResult<RollbackResult> {
        let applied = self.applied_migrations().await?;
        match applied.iter().map(|m| m.batch).max() {
            Some(latest) => self.rollback_batch(latest).await,
            None => Ok(RollbackResult::default()),
        }
    }

    /// Revert every migration recorded under `batch`, newest first
    pub async fn rollback_batch(&self, batch: i32) -> SchemaResult<RollbackResult> {
        let applied = self.applied_migrations().await?;
        let newer = applied.iter().filter(|m| m.batch > batch).count();
        if newer > 0 {
            return Err(SchemaError::NotMostRecent(format!("batch {}", batch)));
        }

        let in_batch = applied.iter().filter(|m| m.batch == batch).count();
        self.rollback(in_batch).await
    }

    /// Revert a specific migration; it must be the most recently applied one
    pub async fn rollback_migration(&self, migration_id: &str) -> SchemaResult<()> {
        let applied = self.applied_migrations().await?;
        if !applied.iter().any(|m| m.id == migration_id) {
            return Err(SchemaError::UnknownMigration(migration_id.to_string()));
        }

        let plan = self.migrations().plan_rollback(&applied, 1)?;
        match plan.first() {
            Some(latest) if latest.id() == migration_id => self.revert(*latest).await,
            _ => Err(SchemaError::NotMostRecent(migration_id.to_string())),
        }
    }

    /// Revert all applied migrations
    pub async fn rollback_all(&self) -> SchemaResult<RollbackResult> {
        let applied = self.applied_migrations().await?;
        self.rollback(applied.len()).await
    }
}
