use hearth_schema::prelude::*;

use crate::tables::listings;

/// Raises the default stay limit from one night to a year
pub struct ChangeListingsMaximumNightsDefault;

fn maximum_nights(default: i64) -> SchemaResult<ColumnDef> {
    ColumnDef::builder(ColumnType::Integer)
        .not_null()
        .default(default)
        .build()
}

#[async_trait]
impl Migration for ChangeListingsMaximumNightsDefault {
    fn id(&self) -> &'static str {
        "20240115_090000_change_listings_maximum_nights_default"
    }

    async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        schema
            .change_column(listings::TABLE, listings::MAXIMUM_NIGHTS, &maximum_nights(365)?)
            .await
    }

    async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        schema
            .change_column(listings::TABLE, listings::MAXIMUM_NIGHTS, &maximum_nights(1)?)
            .await
    }
}
