//! Message header and body data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message header as stored in a folder's local index.
///
/// `recipients` and `cc_list` keep the comma-separated display form the
/// store hands out; splitting into individual addresses happens only where
/// reply recipients are computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    /// RFC 5322 Message-ID without angle brackets
    pub id: String,
    pub subject: String,
    pub author: String,
    pub recipients: String,
    pub cc_list: String,
    pub date: Option<DateTime<Utc>>,
    pub read: bool,
    pub flagged: bool,
}

/// A search result leaving the search engine, camelCase on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHit {
    pub id: String,
    pub subject: String,
    pub author: String,
    pub recipients: String,
    pub date: Option<DateTime<Utc>>,
    /// Human-readable folder name
    pub folder: String,
    /// Folder path usable with getMessage
    pub folder_path: String,
    pub read: bool,
    pub flagged: bool,
}

/// Full message content returned by getMessage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullMessage {
    pub id: String,
    pub subject: String,
    pub author: String,
    pub recipients: String,
    pub cc_list: String,
    pub date: Option<DateTime<Utc>>,
    pub body: String,
}

/// An attachment already stored with a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAttachment {
    /// Storage URL of the attachment content
    pub url: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Plain-text body plus stored attachments, as fetched from the store
#[derive(Debug, Clone, Default)]
pub struct MessageBody {
    pub text: String,
    pub attachments: Vec<MessageAttachment>,
}

/// A hit from the external full-text index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullTextHit {
    pub id: String,
    pub subject: String,
    pub from: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub folder: Option<String>,
}
