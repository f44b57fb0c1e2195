use hearth_schema::prelude::*;
use serde_json::Value;

use crate::tables::listings;

/// Listing wizard steps, in the order the host completes them
pub const STEPS: [&str; 7] = [
    "basicInfo",
    "location",
    "details",
    "pricing",
    "photos",
    "rules",
    "calendar",
];

/// Every step marked incomplete
pub fn initial_step_status() -> Value {
    Value::Object(
        STEPS
            .iter()
            .map(|step| (step.to_string(), Value::Bool(false)))
            .collect(),
    )
}

pub struct AddListingsStepStatus;

#[async_trait]
impl Migration for AddListingsStepStatus {
    fn id(&self) -> &'static str {
        "20240118_103000_add_listings_step_status"
    }

    async fn up(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        let def = ColumnDef::builder(ColumnType::Json)
            .not_null()
            .default(initial_step_status())
            .comment("Completion flags for each listing wizard step")
            .build()?;
        schema
            .add_column(listings::TABLE, listings::STEP_STATUS, &def)
            .await
    }

    async fn down(&self, schema: &mut dyn SchemaMutator) -> SchemaResult<()> {
        schema
            .remove_column(listings::TABLE, listings::STEP_STATUS)
            .await
    }
}
