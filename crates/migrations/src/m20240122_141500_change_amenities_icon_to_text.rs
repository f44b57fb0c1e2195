use hearth_schema::prelude::*;

use crate::tables::amenities;

/// Icons are stored as inline SVG, which outgrew VARCHAR(255)
pub struct ChangeAmenitiesIconToText;

#[async_trait]
impl Migration for ChangeAmenitiesIconToText {
    fn id(&self) -> &'static str {
        "20240122_141500_change_amenities_icon_to_text"
    }

    async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        let def = ColumnDef::builder(ColumnType::Text).nullable(true).build()?;
        schema
            .change_column(amenities::TABLE, amenities::ICON, &def)
            .await
    }

    // Fails if any stored icon is longer than 255 characters
    async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        let def = ColumnDef::builder(ColumnType::String(255))
            .nullable(true)
            .build()?;
        schema
            .change_column(amenities::TABLE, amenities::ICON, &def)
            .await
    }
}
