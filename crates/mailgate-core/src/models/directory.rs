//! Contact and calendar data structures

use serde::{Deserialize, Serialize};

/// An address-book entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Name of the address book the contact lives in
    pub address_book: String,
}

/// A calendar visible to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub read_only: bool,
}
