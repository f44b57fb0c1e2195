use hearth_schema::prelude::*;

use crate::tables::conversation_participants as participants;

pub const INDEX_NAME: &str = "user_lastread_idx";

/// Speeds up the per-user unread conversation lookup
pub struct AddConversationParticipantsLastReadIndex;

#[async_trait]
impl Migration for AddConversationParticipantsLastReadIndex {
    fn id(&self) -> &'static str {
        "20240301_120000_add_conversation_participants_last_read_index"
    }

    async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        let index = IndexDef::builder(
            participants::TABLE,
            &[participants::USER_ID, participants::LAST_READ_AT],
        )
        .name(INDEX_NAME)
        .build()?;
        schema.add_index(&index).await
    }

    async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        schema
            .remove_index(participants::TABLE, &IndexTarget::name(INDEX_NAME))
            .await
    }
}
