//! Schema migrations for the hearth listings, booking and messaging database.
//!
//! Each `m<date>_<time>_<name>` module holds one unit. `Migrator` lists them
//! all; add new units to `Migrator::migrations` and never edit an applied one.

pub use hearth_schema::prelude::*;
use hearth_schema::MigrationSet;

pub mod tables;

pub mod m20240115_090000_change_listings_maximum_nights_default;
pub mod m20240118_103000_add_listings_step_status;
pub mod m20240122_141500_change_amenities_icon_to_text;
pub mod m20240205_110000_add_listings_guest_counts;
pub mod m20240212_160000_add_listings_location;
pub mod m20240220_093000_add_listings_is_public;
pub mod m20240301_120000_add_conversation_participants_last_read_index;
pub mod m20240304_150000_drop_messages_single_column_indexes;
pub mod m20240304_151000_add_messages_unread_index;

use m20240115_090000_change_listings_maximum_nights_default::ChangeListingsMaximumNightsDefault;
use m20240118_103000_add_listings_step_status::AddListingsStepStatus;
use m20240122_141500_change_amenities_icon_to_text::ChangeAmenitiesIconToText;
use m20240205_110000_add_listings_guest_counts::AddListingsGuestCounts;
use m20240212_160000_add_listings_location::AddListingsLocation;
use m20240220_093000_add_listings_is_public::AddListingsIsPublic;
use m20240301_120000_add_conversation_participants_last_read_index::{
    AddConversationParticipantsLastReadIndex,
};
use m20240304_150000_drop_messages_single_column_indexes::DropMessagesSingleColumnIndexes;
use m20240304_151000_add_messages_unread_index::AddMessagesUnreadIndex;

pub struct Migrator;

impl Migrator {
    pub fn migrations() -> Vec<Box<dyn Migration>> {
        vec![
            Box::new(ChangeListingsMaximumNightsDefault),
            Box::new(AddListingsStepStatus),
            Box::new(ChangeAmenitiesIconToText),
            Box::new(AddListingsGuestCounts),
            Box::new(AddListingsLocation),
            Box::new(AddListingsIsPublic),
            Box::new(AddConversationParticipantsLastReadIndex),
            Box::new(DropMessagesSingleColumnIndexes),
            Box::new(AddMessagesUnreadIndex),
        ]
    }

    /// The validated, ordered set
    pub fn set() -> SchemaResult<MigrationSet> {
        MigrationSet::new(Self::migrations())
    }
}
