//! Column and index descriptors
//!
//! Structured records for every change a migration unit can request. All
//! descriptors validate on construction, so a unit cannot hand an invalid
//! change to a schema backend.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{SchemaError, SchemaResult};

/// Geometry subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

impl GeometryKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            GeometryKind::Point => "POINT",
            GeometryKind::LineString => "LINESTRING",
            GeometryKind::Polygon => "POLYGON",
        }
    }
}

/// Column type vocabulary available to migration units
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    /// Bounded string, `VARCHAR(n)`
    String(u32),
    Boolean,
    Json,
    /// Spatial column with an optional SRID
    Geometry(GeometryKind, Option<i32>),
    DateTime,
}

impl ColumnType {
    /// Shorthand for `Geometry(Point, srid)`
    pub fn point(srid: Option<i32>) -> Self {
        ColumnType::Geometry(GeometryKind::Point, srid)
    }

    /// Whether `value` is usable as a default (or stored value) for this type
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            ColumnType::Integer => value
                .as_i64()
                .map_or(false, |n| i32::try_from(n).is_ok()),
            ColumnType::Text => value.is_string(),
            ColumnType::String(len) => value
                .as_str()
                .map_or(false, |s| s.chars().count() <= *len as usize),
            ColumnType::Boolean => value.is_boolean(),
            ColumnType::Json => true,
            ColumnType::Geometry(..) | ColumnType::DateTime => value.is_string(),
        }
    }

    fn validate(&self) -> SchemaResult<()> {
        match self {
            ColumnType::String(0) => Err(SchemaError::InvalidDescriptor(
                "STRING length must be greater than zero".to_string(),
            )),
            ColumnType::Geometry(_, Some(srid)) if *srid <= 0 => Err(
                SchemaError::InvalidDescriptor(format!("invalid SRID {}", srid)),
            ),
            _ => Ok(()),
        }
    }
}

/// Column definition used by `add_column` and `change_column`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    column_type: ColumnType,
    nullable: bool,
    default: Option<Value>,
    after: Option<String>,
    comment: Option<String>,
}

impl ColumnDef {
    /// Start a builder for a column of the given type (nullable, no default)
    pub fn builder(column_type: ColumnType) -> ColumnDefBuilder {
        ColumnDefBuilder {
            def: ColumnDef {
                column_type,
                nullable: true,
                default: None,
                after: None,
                comment: None,
            },
        }
    }

    /// Build a definition from an option object such as
    /// `{"allowNull": false, "defaultValue": 1}`. Unknown keys are rejected.
    pub fn from_options(column_type: ColumnType, options: Value) -> SchemaResult<Self> {
        let options: ColumnOptions = serde_json::from_value(options)?;

        let mut builder = ColumnDef::builder(column_type).nullable(options.allow_null);
        if let Some(default) = options.default_value {
            builder = builder.default(default);
        }
        if let Some(after) = options.after {
            builder = builder.after(after);
        }
        if let Some(comment) = options.comment {
            builder = builder.comment(comment);
        }
        builder.build()
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Positional hint: place the column after this one
    pub fn after(&self) -> Option<&str> {
        self.after.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ColumnOptions {
    #[serde(default = "allow_null_default")]
    allow_null: bool,
    #[serde(default, deserialize_with = "present")]
    default_value: Option<Value>,
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

fn allow_null_default() -> bool {
    true
}

// An explicit `null` is a null default, not an absent one
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Builder for `ColumnDef`
#[derive(Debug, Clone)]
pub struct ColumnDefBuilder {
    def: ColumnDef,
}

impl ColumnDefBuilder {
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.def.nullable = nullable;
        self
    }

    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.def.default = Some(value.into());
        self
    }

    pub fn after(mut self, column: impl Into<String>) -> Self {
        self.def.after = Some(column.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.def.comment = Some(comment.into());
        self
    }

    /// Validate and produce the definition
    pub fn build(self) -> SchemaResult<ColumnDef> {
        let def = self.def;
        def.column_type.validate()?;

        if let Some(default) = &def.default {
            if default.is_null() && !def.nullable {
                return Err(SchemaError::InvalidDescriptor(
                    "NOT NULL column cannot default to NULL".to_string(),
                ));
            }
            if !def.column_type.accepts(default) {
                return Err(SchemaError::InvalidDescriptor(format!(
                    "default {} is not valid for {:?}",
                    default, def.column_type
                )));
            }
        }
        if def.after.as_deref().map_or(false, str::is_empty) {
            return Err(SchemaError::InvalidDescriptor(
                "positional hint must name a column".to_string(),
            ));
        }
        if def.comment.as_deref().map_or(false, |c| c.trim().is_empty()) {
            return Err(SchemaError::InvalidDescriptor(
                "comment must not be empty".to_string(),
            ));
        }

        Ok(def)
    }
}

/// Predicate restricting a partial index
#[derive(Debug, Clone, PartialEq)]
pub enum IndexPredicate {
    IsNull(String),
    IsNotNull(String),
    Equals(String, Value),
    All(Vec<IndexPredicate>),
}

impl IndexPredicate {
    pub fn is_null(column: impl Into<String>) -> Self {
        IndexPredicate::IsNull(column.into())
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        IndexPredicate::IsNotNull(column.into())
    }

    /// Columns the predicate reads
    pub fn columns(&self) -> Vec<&str> {
        match self {
            IndexPredicate::IsNull(c) | IndexPredicate::IsNotNull(c) => vec![c.as_str()],
            IndexPredicate::Equals(c, _) => vec![c.as_str()],
            IndexPredicate::All(parts) => parts.iter().flat_map(|p| p.columns()).collect(),
        }
    }

    fn validate(&self) -> SchemaResult<()> {
        match self {
            IndexPredicate::All(parts) if parts.is_empty() => Err(SchemaError::InvalidDescriptor(
                "index predicate conjunction must not be empty".to_string(),
            )),
            IndexPredicate::All(parts) => parts.iter().try_for_each(|p| p.validate()),
            _ if self.columns().iter().any(|c| c.is_empty()) => Err(
                SchemaError::InvalidDescriptor("index predicate column is empty".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Index definition used by `add_index`
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    table: String,
    columns: Vec<String>,
    name: String,
    predicate: Option<IndexPredicate>,
    unique: bool,
}

impl IndexDef {
    pub fn builder(table: impl Into<String>, columns: &[&str]) -> IndexDefBuilder {
        IndexDefBuilder {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            name: None,
            predicate: None,
            unique: false,
        }
    }

    /// Name given to an index created without an explicit one
    pub fn derived_name(table: &str, columns: &[String]) -> String {
        format!("idx_{}_{}", table, columns.join("_")).to_lowercase()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predicate(&self) -> Option<&IndexPredicate> {
        self.predicate.as_ref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

/// Builder for `IndexDef`
#[derive(Debug, Clone)]
pub struct IndexDefBuilder {
    table: String,
    columns: Vec<String>,
    name: Option<String>,
    predicate: Option<IndexPredicate>,
    unique: bool,
}

impl IndexDefBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn predicate(mut self, predicate: IndexPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn build(self) -> SchemaResult<IndexDef> {
        if self.table.is_empty() {
            return Err(SchemaError::InvalidDescriptor(
                "index table name is empty".to_string(),
            ));
        }
        if self.columns.is_empty() {
            return Err(SchemaError::InvalidDescriptor(format!(
                "index on {} needs at least one column",
                self.table
            )));
        }
        for (i, column) in self.columns.iter().enumerate() {
            if column.is_empty() {
                return Err(SchemaError::InvalidDescriptor(
                    "index column name is empty".to_string(),
                ));
            }
            if self.columns[..i].contains(column) {
                return Err(SchemaError::InvalidDescriptor(format!(
                    "column {} listed twice in index",
                    column
                )));
            }
        }
        if let Some(predicate) = &self.predicate {
            predicate.validate()?;
        }

        let name = match self.name {
            Some(name) if name.is_empty() => {
                return Err(SchemaError::InvalidDescriptor(
                    "index name is empty".to_string(),
                ))
            }
            Some(name) => name,
            None => IndexDef::derived_name(&self.table, &self.columns),
        };

        Ok(IndexDef {
            table: self.table,
            columns: self.columns,
            name,
            predicate: self.predicate,
            unique: self.unique,
        })
    }
}

/// Identifies the index to drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexTarget {
    Name(String),
    /// Resolves to the derived name for the columns
    Columns(Vec<String>),
}

impl IndexTarget {
    pub fn name(name: impl Into<String>) -> Self {
        IndexTarget::Name(name.into())
    }

    pub fn columns(columns: &[&str]) -> Self {
        IndexTarget::Columns(columns.iter().map(|c| c.to_string()).collect())
    }

    /// Concrete index name on `table`
    pub fn resolve(&self, table: &str) -> String {
        match self {
            IndexTarget::Name(name) => name.clone(),
            IndexTarget::Columns(columns) => IndexDef::derived_name(table, columns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_def_builder() {
        let def = ColumnDef::builder(ColumnType::Integer)
            .not_null()
            .default(1)
            .after("maxGuests")
            .comment("Number of adult guests")
            .build()
            .unwrap();

        assert!(!def.is_nullable());
        assert_eq!(def.default_value(), Some(&json!(1)));
        assert_eq!(def.after(), Some("maxGuests"));
        assert_eq!(def.comment(), Some("Number of adult guests"));
    }

    #[test]
    fn test_column_def_rejects_mismatched_default() {
        let err = ColumnDef::builder(ColumnType::Boolean)
            .default("false")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDescriptor(_)));

        let err = ColumnDef::builder(ColumnType::String(3))
            .default("toolong")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDescriptor(_)));
    }

    #[test]
    fn test_column_def_rejects_null_default_on_not_null() {
        let err = ColumnDef::builder(ColumnType::Text)
            .not_null()
            .default(Value::Null)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("NOT NULL"));
    }

    #[test]
    fn test_zero_length_string_rejected() {
        assert!(ColumnDef::builder(ColumnType::String(0)).build().is_err());
    }

    #[test]
    fn test_from_options() {
        let def = ColumnDef::from_options(
            ColumnType::Boolean,
            json!({ "allowNull": false, "defaultValue": false, "comment": "visible in search" }),
        )
        .unwrap();

        assert!(!def.is_nullable());
        assert_eq!(def.default_value(), Some(&json!(false)));
        assert_eq!(def.comment(), Some("visible in search"));
    }

    #[test]
    fn test_from_options_rejects_unknown_keys() {
        let err = ColumnDef::from_options(
            ColumnType::Integer,
            json!({ "allowNull": false, "unsigned": true }),
        )
        .unwrap_err();

        assert!(matches!(err, SchemaError::InvalidDescriptor(_)));
        assert!(err.to_string().contains("unsigned"));
    }

    #[test]
    fn test_from_options_null_default_on_not_null() {
        let err = ColumnDef::from_options(
            ColumnType::Integer,
            json!({ "allowNull": false, "defaultValue": null }),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDescriptor(_)));

        let def = ColumnDef::from_options(ColumnType::Integer, json!({ "defaultValue": null }))
            .unwrap();
        assert_eq!(def.default_value(), Some(&Value::Null));
    }

    #[test]
    fn test_integer_default_must_fit_int4() {
        assert!(ColumnDef::builder(ColumnType::Integer)
            .default(3_000_000_000i64)
            .build()
            .is_err());
        assert!(ColumnDef::builder(ColumnType::Integer)
            .default(i32::MAX)
            .build()
            .is_ok());
    }

    #[test]
    fn test_index_def_derived_name() {
        let index = IndexDef::builder("Messages", &["conversationId"]).build().unwrap();
        assert_eq!(index.name(), "idx_messages_conversationid");
        assert_eq!(
            IndexTarget::columns(&["conversationId"]).resolve("Messages"),
            index.name()
        );
    }

    #[test]
    fn test_index_def_validation() {
        assert!(IndexDef::builder("Messages", &[]).build().is_err());
        assert!(IndexDef::builder("Messages", &["a", "a"]).build().is_err());
        assert!(IndexDef::builder("Messages", &["a"]).name("").build().is_err());
        assert!(IndexDef::builder("Messages", &["a"])
            .predicate(IndexPredicate::All(vec![]))
            .build()
            .is_err());
    }

    #[test]
    fn test_predicate_columns() {
        let predicate = IndexPredicate::All(vec![
            IndexPredicate::is_null("readAt"),
            IndexPredicate::Equals("deleted".to_string(), json!(false)),
        ]);
        assert_eq!(predicate.columns(), vec!["readAt", "deleted"]);
    }
}
