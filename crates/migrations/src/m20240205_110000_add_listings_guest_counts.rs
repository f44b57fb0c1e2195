use hearth_schema::prelude::*;

use crate::tables::listings;

pub struct AddListingsGuestCounts;

#[async_trait]
impl Migration for AddListingsGuestCounts {
    fn id(&self) -> &'static str {
        "20240205_110000_add_listings_guest_counts"
    }

    async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        let adults = ColumnDef::builder(ColumnType::Integer)
            .not_null()
            .default(1)
            .after(listings::MAX_GUESTS)
            .comment("Adult guests allowed")
            .build()?;
        let children = ColumnDef::builder(ColumnType::Integer)
            .not_null()
            .default(0)
            .after(listings::ADULT_GUESTS)
            .comment("Child guests allowed")
            .build()?;

        schema
            .add_column(listings::TABLE, listings::ADULT_GUESTS, &adults)
            .await?;
        schema
            .add_column(listings::TABLE, listings::CHILD_GUESTS, &children)
            .await
    }

    async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        schema
            .remove_column(listings::TABLE, listings::CHILD_GUESTS)
            .await?;
        schema
            .remove_column(listings::TABLE, listings::ADULT_GUESTS)
            .await
    }
}
