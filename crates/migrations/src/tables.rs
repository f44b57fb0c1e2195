//! Table and column names touched by the migrations

pub mod listings {
    pub const TABLE: &str = "Listings";
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const MAX_GUESTS: &str = "maxGuests";
    pub const MINIMUM_NIGHTS: &str = "minimumNights";
    pub const MAXIMUM_NIGHTS: &str = "maximumNights";
    pub const STEP_STATUS: &str = "stepStatus";
    pub const ADULT_GUESTS: &str = "adultGuests";
    pub const CHILD_GUESTS: &str = "childGuests";
    pub const LOCATION: &str = "location";
    pub const IS_PUBLIC: &str = "isPublic";
    pub const CREATED_AT: &str = "createdAt";
}

pub mod amenities {
    pub const TABLE: &str = "Amenities";
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const ICON: &str = "icon";
}

pub mod conversation_participants {
    pub const TABLE: &str = "ConversationParticipants";
    pub const ID: &str = "id";
    pub const CONVERSATION_ID: &str = "conversationId";
    pub const USER_ID: &str = "userId";
    pub const LAST_READ_AT: &str = "lastReadAt";
}

pub mod messages {
    pub const TABLE: &str = "Messages";
    pub const ID: &str = "id";
    pub const CONVERSATION_ID: &str = "conversationId";
    pub const SENDER_ID: &str = "senderId";
    pub const BODY: &str = "body";
    pub const READ_AT: &str = "readAt";
    pub const CREATED_AT: &str = "createdAt";
}
