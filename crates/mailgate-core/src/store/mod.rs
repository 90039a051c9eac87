//! Capability traits through which the gateway reaches the mail client
//!
//! One explicit interface per collaborator, injected into the gateway at
//! construction. The mail client's own persistence, MIME parsing, address
//! books, calendars and full-text index all live behind these traits; the
//! in-memory implementation in [`memory`] backs the test suite.

pub mod memory;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{
    AccountInfo, CalendarInfo, Contact, FullTextHit, MessageBody, MessageHeader, OutgoingMessage,
};

/// A node in an account's folder tree
#[derive(Debug, Clone)]
pub struct Folder {
    /// Human-readable folder name
    pub name: String,

    /// Folder path, unique across all accounts
    pub path: String,

    /// True when the folder is synced from a remote server and may be
    /// stale; search attempts a best-effort refresh before reading it
    pub remote: bool,

    pub children: Vec<Folder>,
}

/// Account, folder and message access plus the compose window
#[async_trait]
pub trait MailStore: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<AccountInfo>>;

    /// Root folders of an account, children nested
    async fn enumerate_folders(&self, account_id: &str) -> Result<Vec<Folder>>;

    /// Best-effort refresh of a remotely-synced folder; callers ignore
    /// failures
    async fn refresh_folder(&self, folder_path: &str) -> Result<()>;

    /// The folder's local message index
    async fn enumerate_messages(&self, folder_path: &str) -> Result<Vec<MessageHeader>>;

    /// Locate one header by message id: a linear scan of the folder's
    /// local index. Folder-not-found and message-not-found are distinct
    /// error conditions.
    async fn fetch_header(&self, folder_path: &str, message_id: &str) -> Result<MessageHeader> {
        let headers = self.enumerate_messages(folder_path).await?;
        headers
            .into_iter()
            .find(|h| h.id == message_id)
            .ok_or_else(|| Error::MessageNotFound(message_id.to_string()))
    }

    /// Plain-text body and stored attachments of one message
    async fn fetch_body(&self, folder_path: &str, message_id: &str) -> Result<MessageBody>;

    /// Open an interactive editor window pre-populated with the given
    /// fields. Never transmits anything.
    async fn open_compose_window(&self, message: &OutgoingMessage) -> Result<()>;
}

/// Address-book search
#[async_trait]
pub trait ContactsDirectory: Send + Sync {
    /// Case-insensitive match over email, display name, first and last
    /// name; mailing lists excluded; at most 50 results
    async fn search(&self, query: &str) -> Result<Vec<Contact>>;
}

/// Calendar listing
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// All calendars, or [`Error::CalendarUnavailable`] when the calendar
    /// subsystem is not present
    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>>;
}

/// External full-text index pass-through
#[async_trait]
pub trait FullTextIndex: Send + Sync {
    async fn query(&self, text: &str) -> Result<Vec<FullTextHit>>;
}
