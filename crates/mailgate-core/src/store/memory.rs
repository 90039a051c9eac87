//! In-memory capability implementation
//!
//! Backs the test suite and serves as the reference implementation for
//! hosts embedding the gateway. Compose windows are recorded rather than
//! opened so tests can assert on the field sets.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{
    AccountInfo, CalendarInfo, Contact, FullTextHit, MessageBody, MessageHeader, OutgoingMessage,
};
use crate::store::{CalendarProvider, ContactsDirectory, Folder, FullTextIndex, MailStore};

/// In-memory mail store, contacts directory, calendar and full-text index
#[derive(Default)]
pub struct MemoryStore {
    accounts: Vec<AccountInfo>,
    folders: HashMap<String, Vec<Folder>>,
    messages: HashMap<String, Vec<(MessageHeader, MessageBody)>>,
    contacts: Vec<Contact>,
    /// None models a client without the calendar subsystem
    calendars: Option<Vec<CalendarInfo>>,
    fulltext: Vec<FullTextHit>,
    opened: Mutex<Vec<OutgoingMessage>>,
    refreshed: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: AccountInfo, roots: Vec<Folder>) -> Self {
        self.folders.insert(account.id.clone(), roots);
        self.accounts.push(account);
        self
    }

    pub fn with_message(
        mut self,
        folder_path: &str,
        header: MessageHeader,
        body: MessageBody,
    ) -> Self {
        self.messages
            .entry(folder_path.to_string())
            .or_default()
            .push((header, body));
        self
    }

    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contacts.push(contact);
        self
    }

    pub fn with_calendars(mut self, calendars: Vec<CalendarInfo>) -> Self {
        self.calendars = Some(calendars);
        self
    }

    pub fn with_fulltext_hit(mut self, hit: FullTextHit) -> Self {
        self.fulltext.push(hit);
        self
    }

    /// Compose windows opened so far, in order
    pub fn opened_windows(&self) -> Vec<OutgoingMessage> {
        self.opened.lock().unwrap().clone()
    }

    /// Folder paths refreshed so far, in order
    pub fn refreshed_folders(&self) -> Vec<String> {
        self.refreshed.lock().unwrap().clone()
    }

    fn known_folder(&self, folder_path: &str) -> bool {
        fn walk(folders: &[Folder], path: &str) -> bool {
            folders
                .iter()
                .any(|f| f.path == path || walk(&f.children, path))
        }
        self.folders.values().any(|roots| walk(roots, folder_path))
    }
}

#[async_trait]
impl MailStore for MemoryStore {
    async fn list_accounts(&self) -> Result<Vec<AccountInfo>> {
        Ok(self.accounts.clone())
    }

    async fn enumerate_folders(&self, account_id: &str) -> Result<Vec<Folder>> {
        self.folders
            .get(account_id)
            .cloned()
            .ok_or_else(|| Error::AccountNotFound(account_id.to_string()))
    }

    async fn refresh_folder(&self, folder_path: &str) -> Result<()> {
        self.refreshed.lock().unwrap().push(folder_path.to_string());
        Ok(())
    }

    async fn enumerate_messages(&self, folder_path: &str) -> Result<Vec<MessageHeader>> {
        if !self.known_folder(folder_path) {
            return Err(Error::FolderNotFound(folder_path.to_string()));
        }
        Ok(self
            .messages
            .get(folder_path)
            .map(|m| m.iter().map(|(h, _)| h.clone()).collect())
            .unwrap_or_default())
    }

    async fn fetch_body(&self, folder_path: &str, message_id: &str) -> Result<MessageBody> {
        if !self.known_folder(folder_path) {
            return Err(Error::FolderNotFound(folder_path.to_string()));
        }
        self.messages
            .get(folder_path)
            .and_then(|m| m.iter().find(|(h, _)| h.id == message_id))
            .map(|(_, b)| b.clone())
            .ok_or_else(|| Error::MessageNotFound(message_id.to_string()))
    }

    async fn open_compose_window(&self, message: &OutgoingMessage) -> Result<()> {
        self.opened.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[async_trait]
impl ContactsDirectory for MemoryStore {
    async fn search(&self, query: &str) -> Result<Vec<Contact>> {
        let lower = query.to_lowercase();
        Ok(self
            .contacts
            .iter()
            .filter(|c| {
                c.email.to_lowercase().contains(&lower)
                    || c.display_name.to_lowercase().contains(&lower)
                    || c.first_name.to_lowercase().contains(&lower)
                    || c.last_name.to_lowercase().contains(&lower)
            })
            .take(50)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CalendarProvider for MemoryStore {
    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>> {
        self.calendars.clone().ok_or(Error::CalendarUnavailable)
    }
}

#[async_trait]
impl FullTextIndex for MemoryStore {
    async fn query(&self, text: &str) -> Result<Vec<FullTextHit>> {
        let lower = text.to_lowercase();
        Ok(self
            .fulltext
            .iter()
            .filter(|h| h.subject.to_lowercase().contains(&lower))
            .cloned()
            .collect())
    }
}
