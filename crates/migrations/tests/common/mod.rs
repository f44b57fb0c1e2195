//! Shared fixtures for the migration tests

#![allow(dead_code)]

use hearth_migrations::tables::{
    amenities, conversation_participants as participants, listings, messages,
};
use hearth_migrations::Migrator;
use hearth_schema::prelude::*;
use hearth_schema::{MemoryBackend, MemorySchema, MigrationRunner};
use serde_json::Value;

fn def(column_type: ColumnType, nullable: bool, default: Option<Value>) -> ColumnDef {
    let mut builder = ColumnDef::builder(column_type).nullable(nullable);
    if let Some(default) = default {
        builder = builder.default(default);
    }
    builder.build().unwrap()
}

/// The schema as it stood before the first unit, with a few rows
pub async fn baseline() -> MemorySchema {
    let mut schema = MemorySchema::new();

    schema
        .create_table(
            listings::TABLE,
            vec![
                (listings::ID, def(ColumnType::Integer, false, None)),
                (listings::TITLE, def(ColumnType::String(255), false, None)),
                (listings::MAX_GUESTS, def(ColumnType::Integer, false, Some(json!(1)))),
                (listings::MINIMUM_NIGHTS, def(ColumnType::Integer, false, Some(json!(1)))),
                (listings::MAXIMUM_NIGHTS, def(ColumnType::Integer, false, Some(json!(1)))),
                (listings::CREATED_AT, def(ColumnType::DateTime, false, None)),
            ],
        )
        .unwrap();
    schema
        .create_table(
            amenities::TABLE,
            vec![
                (amenities::ID, def(ColumnType::Integer, false, None)),
                (amenities::NAME, def(ColumnType::String(255), false, None)),
                (amenities::ICON, def(ColumnType::String(255), true, None)),
            ],
        )
        .unwrap();
    schema
        .create_table(
            participants::TABLE,
            vec![
                (participants::ID, def(ColumnType::Integer, false, None)),
                (participants::CONVERSATION_ID, def(ColumnType::Integer, false, None)),
                (participants::USER_ID, def(ColumnType::Integer, false, None)),
                (participants::LAST_READ_AT, def(ColumnType::DateTime, true, None)),
            ],
        )
        .unwrap();
    schema
        .create_table(
            messages::TABLE,
            vec![
                (messages::ID, def(ColumnType::Integer, false, None)),
                (messages::CONVERSATION_ID, def(ColumnType::Integer, false, None)),
                (messages::SENDER_ID, def(ColumnType::Integer, false, None)),
                (messages::BODY, def(ColumnType::Text, false, None)),
                (messages::READ_AT, def(ColumnType::DateTime, true, None)),
                (messages::CREATED_AT, def(ColumnType::DateTime, false, None)),
            ],
        )
        .unwrap();

    for column in [messages::CONVERSATION_ID, messages::CREATED_AT] {
        let index = IndexDef::builder(messages::TABLE, &[column]).build().unwrap();
        schema.add_index(&index).await.unwrap();
    }

    schema
        .insert_row(
            listings::TABLE,
            json!({
                "id": 1,
                "title": "Cabin by the lake",
                "maxGuests": 4,
                "createdAt": "2023-11-02T10:00:00Z"
            }),
        )
        .unwrap();
    schema
        .insert_row(
            listings::TABLE,
            json!({
                "id": 2,
                "title": "Loft downtown",
                "maximumNights": 30,
                "createdAt": "2023-12-14T08:30:00Z"
            }),
        )
        .unwrap();
    schema
        .insert_row(amenities::TABLE, json!({"id": 1, "name": "Wifi", "icon": "wifi.svg"}))
        .unwrap();
    schema
        .insert_row(
            participants::TABLE,
            json!({
                "id": 1,
                "conversationId": 7,
                "userId": 3,
                "lastReadAt": "2024-01-01T12:00:00Z"
            }),
        )
        .unwrap();
    schema
        .insert_row(
            messages::TABLE,
            json!({
                "id": 1,
                "conversationId": 7,
                "senderId": 3,
                "body": "Is the cabin free in May?",
                "createdAt": "2024-01-01T11:59:00Z"
            }),
        )
        .unwrap();

    schema
}

/// Runner over the baseline with every application unit
pub async fn runner() -> MigrationRunner<MemoryBackend> {
    MigrationRunner::new(MemoryBackend::new(baseline().await), Migrator::set().unwrap())
}
