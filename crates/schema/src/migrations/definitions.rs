//! Migration Definitions - Core bookkeeping types
//!
//! Records of applied migrations, run/rollback results, and the direction
//! and status enums shared by the runner and the backends.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A migration recorded as applied in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Migration ID
    pub id: String,
    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
    /// Batch number (one batch per run)
    pub batch: i32,
}

/// Result of running migrations
#[derive(Debug, Default)]
pub struct MigrationRunResult {
    /// Number of migrations that were applied
    pub applied_count: usize,
    /// IDs of migrations that were applied, in application order
    pub applied_migrations: Vec<String>,
    /// Number of migrations that were skipped (already applied)
    pub skipped_count: usize,
    /// Batch the applied migrations were recorded under
    pub batch: Option<i32>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Result of rolling back migrations
#[derive(Debug, Default)]
pub struct RollbackResult {
    /// Number of migrations that were rolled back
    pub rolled_back_count: usize,
    /// IDs of migrations that were rolled back, in reversion order
    pub rolled_back_migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run `up`)
    Up,
    /// Revert the migration (run `down`)
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}

/// Migration status in the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Migration is pending (not yet applied)
    Pending,
    /// Migration has been applied
    Applied {
        /// When it was applied
        applied_at: DateTime<Utc>,
        /// Batch number
        batch: i32,
    },
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, MigrationStatus::Applied { .. })
    }
}

/// One row of `MigrationRunner::status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatusEntry {
    pub id: String,
    pub name: String,
    pub status: MigrationStatus,
}
