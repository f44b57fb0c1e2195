use hearth_schema::prelude::*;

use crate::tables::messages;

pub const INDEX_NAME: &str = "msg_unread_idx";

/// Partial index over unread messages only. Safe to re-apply and to revert
/// when the index is already gone.
pub struct AddMessagesUnreadIndex;

#[async_trait]
impl Migration for AddMessagesUnreadIndex {
    fn id(&self) -> &'static str {
        "20240304_151000_add_messages_unread_index"
    }

    async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        let index = IndexDef::builder(messages::TABLE, &[messages::CONVERSATION_ID])
            .name(INDEX_NAME)
            .predicate(IndexPredicate::is_null(messages::READ_AT))
            .build()?;

        if !schema.add_index_if_absent(&index).await? {
            tracing::info!(index = INDEX_NAME, "index already present, nothing to do");
        }
        Ok(())
    }

    async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        if !schema
            .remove_index_if_present(messages::TABLE, INDEX_NAME)
            .await?
        {
            tracing::info!(index = INDEX_NAME, "index already absent, nothing to do");
        }
        Ok(())
    }
}
