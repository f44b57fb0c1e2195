//! Ordered migration set
//!
//! Units are ordered by identifier. Forward runs take pending units in
//! ascending order; rollbacks take applied units newest first.

use std::collections::{HashMap, HashSet};

use super::definitions::MigrationRecord;
use super::mutator::Migration;
use crate::error::{SchemaError, SchemaResult};

/// Validated, ordered collection of migration units
pub struct MigrationSet {
    units: Vec<Box<dyn Migration>>,
}

impl MigrationSet {
    /// Sort units by id; fails on an empty or duplicated id
    pub fn new(mut units: Vec<Box<dyn Migration>>) -> SchemaResult<Self> {
        let mut seen = HashSet::new();
        for unit in &units {
            let id = unit.id();
            if id.trim().is_empty() {
                return Err(SchemaError::InvalidDescriptor(
                    "migration id must not be empty".to_string(),
                ));
            }
            if !seen.insert(id) {
                return Err(SchemaError::DuplicateId(id.to_string()));
            }
        }

        units.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(Self { units })
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Identifiers in ascending order
    pub fn ids(&self) -> Vec<&'static str> {
        self.units.iter().map(|u| u.id()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&dyn Migration> {
        self.units
            .iter()
            .find(|u| u.id() == id)
            .map(|u| u.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Migration> {
        self.units.iter().map(|u| u.as_ref())
    }

    /// Units not in `applied`, ascending
    pub fn pending(&self, applied: &HashSet<String>) -> Vec<&dyn Migration> {
        self.iter().filter(|u| !applied.contains(u.id())).collect()
    }

    /// The `steps` most recently applied units, newest first.
    /// Recency is (batch, position in the ledger, id).
    pub fn plan_rollback(
        &self,
        applied: &[MigrationRecord],
        steps: usize,
    ) -> SchemaResult<Vec<&dyn Migration>> {
        let mut ordered: Vec<(usize, &MigrationRecord)> = applied.iter().enumerate().collect();
        ordered.sort_by(|(pos_a, a), (pos_b, b)| {
            b.batch
                .cmp(&a.batch)
                .then(pos_b.cmp(pos_a))
                .then(b.id.cmp(&a.id))
        });

        let by_id: HashMap<&str, &dyn Migration> = self.iter().map(|u| (u.id(), u)).collect();
        ordered
            .into_iter()
            .take(steps)
            .map(|(_, record)| {
                by_id
                    .get(record.id.as_str())
                    .copied()
                    .ok_or_else(|| SchemaError::UnknownMigration(record.id.clone()))
            })
            .collect()
    }
}

impl std::fmt::Debug for MigrationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationSet").field("ids", &self.ids()).finish()
    }
}
