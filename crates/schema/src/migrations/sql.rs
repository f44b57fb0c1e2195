//! Schema Builder - PostgreSQL DDL rendering
//!
//! Turns column and index descriptors into the statements the PostgreSQL
//! backend executes. Identifiers are always quoted, since the application's
//! tables use mixed-case names.

use serde_json::Value;

use super::schema::{ColumnDef, ColumnType, IndexDef, IndexPredicate};

/// Collects DDL statements for one schema change
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    statements: Vec<String>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
        }
    }

    /// Add a column to an existing table
    pub fn add_column(&mut self, table: &str, column: &str, def: &ColumnDef) -> &mut Self {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_ident(table),
            quote_ident(column),
            column_type_sql(def.column_type())
        );
        if !def.is_nullable() {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = def.default_value() {
            sql.push_str(" DEFAULT ");
            sql.push_str(&literal(default, def.column_type()));
        }
        sql.push(';');
        self.statements.push(sql);

        if let Some(comment) = def.comment() {
            self.comment_on_column(table, column, comment);
        }
        self
    }

    /// Drop a column from an existing table
    pub fn drop_column(&mut self, table: &str, column: &str) -> &mut Self {
        self.statements.push(format!(
            "ALTER TABLE {} DROP COLUMN {};",
            quote_ident(table),
            quote_ident(column)
        ));
        self
    }

    /// Change type, nullability and default of a column
    pub fn change_column(&mut self, table: &str, column: &str, def: &ColumnDef) -> &mut Self {
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            quote_ident(table),
            quote_ident(column)
        );

        self.statements.push(format!(
            "{} TYPE {};",
            prefix,
            column_type_sql(def.column_type())
        ));
        self.statements.push(if def.is_nullable() {
            format!("{} DROP NOT NULL;", prefix)
        } else {
            format!("{} SET NOT NULL;", prefix)
        });
        self.statements.push(match def.default_value() {
            Some(default) => format!(
                "{} SET DEFAULT {};",
                prefix,
                literal(default, def.column_type())
            ),
            None => format!("{} DROP DEFAULT;", prefix),
        });

        if let Some(comment) = def.comment() {
            self.comment_on_column(table, column, comment);
        }
        self
    }

    /// Create an index
    pub fn create_index(&mut self, index: &IndexDef, if_not_exists: bool) -> &mut Self {
        let columns: Vec<String> = index.columns().iter().map(|c| quote_ident(c)).collect();
        let mut sql = format!(
            "CREATE {}INDEX {}{} ON {} ({})",
            if index.is_unique() { "UNIQUE " } else { "" },
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            quote_ident(index.name()),
            quote_ident(index.table()),
            columns.join(", ")
        );
        if let Some(predicate) = index.predicate() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate_sql(predicate));
        }
        sql.push(';');
        self.statements.push(sql);
        self
    }

    /// Drop an index
    pub fn drop_index(&mut self, name: &str, if_exists: bool) -> &mut Self {
        self.statements.push(format!(
            "DROP INDEX {}{};",
            if if_exists { "IF EXISTS " } else { "" },
            quote_ident(name)
        ));
        self
    }

    fn comment_on_column(&mut self, table: &str, column: &str, comment: &str) {
        self.statements.push(format!(
            "COMMENT ON COLUMN {}.{} IS {};",
            quote_ident(table),
            quote_ident(column),
            quote_str(comment)
        ));
    }

    /// Get all SQL statements
    pub fn to_sql(&self) -> Vec<String> {
        self.statements.clone()
    }

    /// All statements as a single SQL string
    pub fn build(&self) -> String {
        self.statements.join("\n")
    }
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_str(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn column_type_sql(column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::Integer => "INTEGER".to_string(),
        ColumnType::Text => "TEXT".to_string(),
        ColumnType::String(len) => format!("VARCHAR({})", len),
        ColumnType::Boolean => "BOOLEAN".to_string(),
        ColumnType::Json => "JSON".to_string(),
        ColumnType::Geometry(kind, None) => format!("GEOMETRY({})", kind.as_sql()),
        ColumnType::Geometry(kind, Some(srid)) => format!("GEOMETRY({}, {})", kind.as_sql(), srid),
        ColumnType::DateTime => "TIMESTAMP WITH TIME ZONE".to_string(),
    }
}

/// Render a default value as a literal for a column of `column_type`
pub fn literal(value: &Value, column_type: &ColumnType) -> String {
    match (value, column_type) {
        (Value::Null, _) => "NULL".to_string(),
        (_, ColumnType::Json) => format!("{}::json", quote_str(&value.to_string())),
        (Value::Bool(true), _) => "TRUE".to_string(),
        (Value::Bool(false), _) => "FALSE".to_string(),
        (Value::Number(n), _) => n.to_string(),
        (Value::String(s), _) => quote_str(s),
        (other, _) => quote_str(&other.to_string()),
    }
}

/// Render a partial-index predicate
pub fn predicate_sql(predicate: &IndexPredicate) -> String {
    match predicate {
        IndexPredicate::IsNull(column) => format!("{} IS NULL", quote_ident(column)),
        IndexPredicate::IsNotNull(column) => format!("{} IS NOT NULL", quote_ident(column)),
        IndexPredicate::Equals(column, Value::Null) => format!("{} IS NULL", quote_ident(column)),
        IndexPredicate::Equals(column, value) => {
            let rendered = match value {
                Value::Bool(true) => "TRUE".to_string(),
                Value::Bool(false) => "FALSE".to_string(),
                Value::Number(n) => n.to_string(),
                Value::String(s) => quote_str(s),
                other => quote_str(&other.to_string()),
            };
            format!("{} = {}", quote_ident(column), rendered)
        }
        IndexPredicate::All(parts) => parts
            .iter()
            .map(|part| match part {
                IndexPredicate::All(_) => format!("({})", predicate_sql(part)),
                _ => predicate_sql(part),
            })
            .collect::<Vec<_>>()
            .join(" AND "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::schema::GeometryKind;
    use serde_json::json;

    #[test]
    fn test_add_column_with_default_and_comment() {
        let def = ColumnDef::builder(ColumnType::Integer)
            .not_null()
            .default(1)
            .comment("Number of adult guests")
            .build()
            .unwrap();

        let mut builder = SchemaBuilder::new();
        builder.add_column("Listings", "adultGuests", &def);

        let sql = builder.to_sql();
        assert_eq!(
            sql[0],
            "ALTER TABLE \"Listings\" ADD COLUMN \"adultGuests\" INTEGER NOT NULL DEFAULT 1;"
        );
        assert_eq!(
            sql[1],
            "COMMENT ON COLUMN \"Listings\".\"adultGuests\" IS 'Number of adult guests';"
        );
    }

    #[test]
    fn test_json_default_is_cast() {
        let def = ColumnDef::builder(ColumnType::Json)
            .not_null()
            .default(json!({ "photos": false }))
            .build()
            .unwrap();

        let mut builder = SchemaBuilder::new();
        builder.add_column("Listings", "stepStatus", &def);

        assert!(builder
            .build()
            .contains("JSON NOT NULL DEFAULT '{\"photos\":false}'::json"));
    }

    #[test]
    fn test_change_column() {
        let def = ColumnDef::builder(ColumnType::Integer)
            .not_null()
            .default(365)
            .build()
            .unwrap();

        let mut builder = SchemaBuilder::new();
        builder.change_column("Listings", "maximumNights", &def);

        assert_eq!(
            builder.to_sql(),
            vec![
                "ALTER TABLE \"Listings\" ALTER COLUMN \"maximumNights\" TYPE INTEGER;",
                "ALTER TABLE \"Listings\" ALTER COLUMN \"maximumNights\" SET NOT NULL;",
                "ALTER TABLE \"Listings\" ALTER COLUMN \"maximumNights\" SET DEFAULT 365;",
            ]
        );
    }

    #[test]
    fn test_change_column_nullable_without_default() {
        let def = ColumnDef::builder(ColumnType::Text).build().unwrap();

        let mut builder = SchemaBuilder::new();
        builder.change_column("Amenities", "icon", &def);

        let sql = builder.build();
        assert!(sql.contains("TYPE TEXT;"));
        assert!(sql.contains("DROP NOT NULL;"));
        assert!(sql.contains("DROP DEFAULT;"));
    }

    #[test]
    fn test_partial_index() {
        let index = IndexDef::builder("Messages", &["conversationId"])
            .name("msg_unread_idx")
            .predicate(IndexPredicate::is_null("readAt"))
            .build()
            .unwrap();

        let mut builder = SchemaBuilder::new();
        builder.create_index(&index, true).drop_index("msg_unread_idx", true);

        assert_eq!(
            builder.to_sql(),
            vec![
                "CREATE INDEX IF NOT EXISTS \"msg_unread_idx\" ON \"Messages\" (\"conversationId\") WHERE \"readAt\" IS NULL;",
                "DROP INDEX IF EXISTS \"msg_unread_idx\";",
            ]
        );
    }

    #[test]
    fn test_composite_unique_index() {
        let index = IndexDef::builder("ConversationParticipants", &["userId", "lastReadAt"])
            .name("user_lastread_idx")
            .unique()
            .build()
            .unwrap();

        let mut builder = SchemaBuilder::new();
        builder.create_index(&index, false);

        assert_eq!(
            builder.build(),
            "CREATE UNIQUE INDEX \"user_lastread_idx\" ON \"ConversationParticipants\" (\"userId\", \"lastReadAt\");"
        );
    }

    #[test]
    fn test_types_and_quoting() {
        assert_eq!(column_type_sql(&ColumnType::String(255)), "VARCHAR(255)");
        assert_eq!(
            column_type_sql(&ColumnType::Geometry(GeometryKind::Point, Some(4326))),
            "GEOMETRY(POINT, 4326)"
        );
        assert_eq!(column_type_sql(&ColumnType::point(None)), "GEOMETRY(POINT)");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(literal(&json!("it's"), &ColumnType::Text), "'it''s'");
    }

    #[test]
    fn test_compound_predicate() {
        let predicate = IndexPredicate::All(vec![
            IndexPredicate::is_null("readAt"),
            IndexPredicate::Equals("archived".to_string(), json!(false)),
        ]);
        assert_eq!(
            predicate_sql(&predicate),
            "\"readAt\" IS NULL AND \"archived\" = FALSE"
        );
    }
}
