//! Error types for the schema migration system
//!
//! Covers descriptor validation, schema mutations rejected by the target,
//! migration set bookkeeping, and configuration problems.

use std::fmt;

use thiserror::Error;

use crate::migrations::definitions::MigrationDirection;

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Kind of schema object named in an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Column,
    Index,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Table => write!(f, "table"),
            ObjectKind::Column => write!(f, "column"),
            ObjectKind::Index => write!(f, "index"),
        }
    }
}

/// Error types for schema and migration operations
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The target refused the mutation (type conflict, lock timeout, ...)
    #[error("Mutation rejected: {0}")]
    MutationRejected(String),

    /// The object being created already exists
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: ObjectKind, name: String },

    /// The object being changed or dropped does not exist
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ObjectKind, name: String },

    /// A column or index descriptor failed validation
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Two migration units share an identifier
    #[error("Duplicate migration id: {0}")]
    DuplicateId(String),

    /// An id in the ledger has no unit in the migration set
    #[error("Unknown migration: {0}")]
    UnknownMigration(String),

    /// Forward operation requested for a unit that is already applied
    #[error("Migration {0} is already applied")]
    AlreadyApplied(String),

    /// Rollback of a single unit that is not the most recently applied one
    #[error("Migration {0} is not the most recently applied migration")]
    NotMostRecent(String),

    /// A unit's up or down operation failed
    #[error("Migration {id} failed during {direction}: {source}")]
    UnitFailed {
        id: String,
        direction: MigrationDirection,
        #[source]
        source: Box<SchemaError>,
    },

    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SchemaError {
    pub fn already_exists(kind: ObjectKind, name: impl Into<String>) -> Self {
        SchemaError::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    pub fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        SchemaError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Wrap an error raised while running a unit
    pub fn unit_failed(id: &str, direction: MigrationDirection, source: SchemaError) -> Self {
        SchemaError::UnitFailed {
            id: id.to_string(),
            direction,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through `UnitFailed`
    pub fn root_cause(&self) -> &SchemaError {
        match self {
            SchemaError::UnitFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::InvalidDescriptor(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SchemaError::not_found(ObjectKind::Index, "msg_unread_idx");
        assert_eq!(err.to_string(), "index 'msg_unread_idx' not found");

        let err = SchemaError::already_exists(ObjectKind::Column, "Listings.isPublic");
        assert_eq!(err.to_string(), "column 'Listings.isPublic' already exists");
    }

    #[test]
    fn test_root_cause_unwraps_unit_failure() {
        let inner = SchemaError::not_found(ObjectKind::Column, "Listings.location");
        let err = SchemaError::unit_failed("20240212160000_x", MigrationDirection::Down, inner);

        assert!(err.to_string().contains("20240212160000_x"));
        assert!(err.to_string().contains("down"));
        assert!(matches!(
            err.root_cause(),
            SchemaError::NotFound { kind: ObjectKind::Column, .. }
        ));
    }
}
