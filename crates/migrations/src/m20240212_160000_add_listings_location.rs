use hearth_schema::prelude::*;

use crate::tables::listings;

/// WGS 84, the SRID map clients send coordinates in
pub const LOCATION_SRID: i32 = 4326;

pub struct AddListingsLocation;

#[async_trait]
impl Migration for AddListingsLocation {
    fn id(&self) -> &'static str {
        "20240212_160000_add_listings_location"
    }

    async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        let def = ColumnDef::builder(ColumnType::point(Some(LOCATION_SRID)))
            .nullable(true)
            .build()?;
        schema
            .add_column(listings::TABLE, listings::LOCATION, &def)
            .await
    }

    async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        schema
            .remove_column(listings::TABLE, listings::LOCATION)
            .await
    }
}
