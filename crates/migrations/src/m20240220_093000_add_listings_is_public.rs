use hearth_schema::prelude::*;

use crate::tables::listings;

pub struct AddListingsIsPublic;

#[async_trait]
impl Migration for AddListingsIsPublic {
    fn id(&self) -> &'static str {
        "20240220_093000_add_listings_is_public"
    }

    async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        let def = ColumnDef::builder(ColumnType::Boolean)
            .not_null()
            .default(false)
            .comment("Listed in search results")
            .build()?;
        schema
            .add_column(listings::TABLE, listings::IS_PUBLIC, &def)
            .await
    }

    async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        schema
            .remove_column(listings::TABLE, listings::IS_PUBLIC)
            .await
    }
}
