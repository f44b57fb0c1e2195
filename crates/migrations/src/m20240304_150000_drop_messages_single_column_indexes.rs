use hearth_schema::prelude::*;

use crate::tables::messages;

const INDEXED_COLUMNS: [&str; 2] = [messages::CONVERSATION_ID, messages::CREATED_AT];

/// The composite (conversationId, createdAt) index covers both lookups.
///
/// The dropped indexes carry the framework's derived names,
/// `idx_messages_conversationid` and `idx_messages_createdat`
/// (`idx_<table>_<columns>`, lowercased). `down` recreates them under the
/// same names.
pub struct DropMessagesSingleColumnIndexes;

#[async_trait]
impl Migration for DropMessagesSingleColumnIndexes {
    fn id(&self) -> &'static str {
        "20240304_150000_drop_messages_single_column_indexes"
    }

    async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        for column in INDEXED_COLUMNS {
            schema
                .remove_index(messages::TABLE, &IndexTarget::columns(&[column]))
                .await?;
        }
        Ok(())
    }

    async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        for column in INDEXED_COLUMNS {
            let index = IndexDef::builder(messages::TABLE, &[column]).build()?;
            schema.add_index(&index).await?;
        }
        Ok(())
    }
}
