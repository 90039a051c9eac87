//! Tool catalog and dispatch
//!
//! Ten tools, fixed at startup, dispatched by exact name. Soft mail
//! conditions (folder or message not found, calendar unavailable) come
//! back as successful results carrying an `error` field so the agent can
//! inspect and decide; only dispatch failures become JSON-RPC errors.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::compose::ComposeBuilder;
use crate::error::{Error, Result};
use crate::models::{ComposeRequest, ForwardRequest, FullMessage, ReplyRequest};
use crate::rpc::ToolDefinition;
use crate::search::{SearchEngine, SearchOptions};
use crate::store::{CalendarProvider, ContactsDirectory, FullTextIndex, MailStore};

/// The fixed tool catalog
pub fn tool_catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "listAccounts".to_string(),
            title: "List Accounts".to_string(),
            description: "List all email accounts and their identities".to_string(),
            input_schema: json!({ "type": "object", "properties": {}, "required": [] }),
        },
        ToolDefinition {
            name: "searchMessages".to_string(),
            title: "Search Messages (Headers)".to_string(),
            description: "Search message headers with date/sort/limit filtering. Returns IDs and folder paths for use with getMessage.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Text to search in subject, author, or recipients (empty string matches all)" },
                    "startDate": { "type": "string", "description": "Filter messages on or after this ISO 8601 date" },
                    "endDate": { "type": "string", "description": "Filter messages on or before this ISO 8601 date" },
                    "maxResults": { "type": "number", "description": "Maximum results to return (default 50, max 200)" },
                    "sortOrder": { "type": "string", "description": "Date sort: 'asc' (oldest first) or 'desc' (newest first, default)" }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "fullTextSearch".to_string(),
            title: "Full-Text Search".to_string(),
            description: "Search message bodies and headers using the mail client's full-text index. Faster than searchMessages for body content.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Text to search for across message bodies and headers" }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "getMessage".to_string(),
            title: "Get Message".to_string(),
            description: "Read the full content of an email message by its ID and folder path".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "messageId": { "type": "string", "description": "The message ID (from search results)" },
                    "folderPath": { "type": "string", "description": "The folder URI path (from search results)" }
                },
                "required": ["messageId", "folderPath"]
            }),
        },
        ToolDefinition {
            name: "sendMail".to_string(),
            title: "Send Mail".to_string(),
            description: "Open a compose window with the given email for user review before sending".to_string(),
            input_schema: compose_schema(),
        },
        ToolDefinition {
            name: "composeMail".to_string(),
            title: "Compose Mail".to_string(),
            description: "Open a compose window for user review before sending".to_string(),
            input_schema: compose_schema(),
        },
        ToolDefinition {
            name: "replyToMessage".to_string(),
            title: "Reply to Message".to_string(),
            description: "Open a reply compose window with quoted original and proper threading headers".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "messageId": { "type": "string", "description": "The message ID to reply to" },
                    "folderPath": { "type": "string", "description": "The folder URI path" },
                    "body": { "type": "string", "description": "Reply body text" },
                    "replyAll": { "type": "boolean", "description": "Reply to all recipients (default: false)" },
                    "isHtml": { "type": "boolean", "description": "Set true if body contains HTML" },
                    "to": { "type": "string", "description": "Override recipient (default: original sender)" },
                    "cc": { "type": "string", "description": "CC recipients (comma-separated)" },
                    "bcc": { "type": "string", "description": "BCC recipients (comma-separated)" },
                    "from": { "type": "string", "description": "Sender identity" },
                    "attachments": { "type": "array", "items": { "type": "string" }, "description": "File paths to attach" }
                },
                "required": ["messageId", "folderPath", "body"]
            }),
        },
        ToolDefinition {
            name: "forwardMessage".to_string(),
            title: "Forward Message".to_string(),
            description: "Open a forward compose window with original attachments preserved".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "messageId": { "type": "string", "description": "The message ID to forward" },
                    "folderPath": { "type": "string", "description": "The folder URI path" },
                    "to": { "type": "string", "description": "Recipient email address" },
                    "body": { "type": "string", "description": "Additional text to prepend (optional)" },
                    "isHtml": { "type": "boolean", "description": "Set true if body contains HTML" },
                    "cc": { "type": "string", "description": "CC recipients (comma-separated)" },
                    "bcc": { "type": "string", "description": "BCC recipients (comma-separated)" },
                    "from": { "type": "string", "description": "Sender identity" },
                    "attachments": { "type": "array", "items": { "type": "string" }, "description": "Additional file paths to attach" }
                },
                "required": ["messageId", "folderPath", "to"]
            }),
        },
        ToolDefinition {
            name: "searchContacts".to_string(),
            title: "Search Contacts".to_string(),
            description: "Find contacts by name or email across all address books".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Name or email address to search for" }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "listCalendars".to_string(),
            title: "List Calendars".to_string(),
            description: "Return the user's calendars".to_string(),
            input_schema: json!({ "type": "object", "properties": {}, "required": [] }),
        },
    ]
}

fn compose_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "to": { "type": "string", "description": "Recipient email address(es), comma-separated" },
            "subject": { "type": "string", "description": "Email subject line" },
            "body": { "type": "string", "description": "Email body text" },
            "cc": { "type": "string", "description": "CC recipients (comma-separated)" },
            "bcc": { "type": "string", "description": "BCC recipients (comma-separated)" },
            "isHtml": { "type": "boolean", "description": "Set true if body contains HTML (default: false)" },
            "from": { "type": "string", "description": "Sender identity (email or identity ID from listAccounts)" },
            "attachments": { "type": "array", "items": { "type": "string" }, "description": "Array of file paths to attach" }
        },
        "required": ["to", "subject", "body"]
    })
}

/// Tool execution handler
pub struct ToolHandler {
    store: Arc<dyn MailStore>,
    contacts: Arc<dyn ContactsDirectory>,
    calendar: Arc<dyn CalendarProvider>,
    fulltext: Arc<dyn FullTextIndex>,
    search: SearchEngine,
    compose: ComposeBuilder,
}

impl ToolHandler {
    pub fn new(
        store: Arc<dyn MailStore>,
        contacts: Arc<dyn ContactsDirectory>,
        calendar: Arc<dyn CalendarProvider>,
        fulltext: Arc<dyn FullTextIndex>,
    ) -> Self {
        let search = SearchEngine::new(store.clone());
        let compose = ComposeBuilder::new(store.clone());
        Self {
            store,
            contacts,
            calendar,
            fulltext,
            search,
            compose,
        }
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, arguments: &Value) -> Result<Value> {
        debug!("Executing tool: {} with args: {:?}", name, arguments);

        let result = match name {
            "listAccounts" => self.list_accounts().await,
            "searchMessages" => self.search_messages(arguments).await,
            "fullTextSearch" => self.full_text_search(arguments).await,
            "getMessage" => self.get_message(arguments).await,
            "sendMail" | "composeMail" => self.compose_mail(arguments).await,
            "replyToMessage" => self.reply_to_message(arguments).await,
            "forwardMessage" => self.forward_message(arguments).await,
            "searchContacts" => self.search_contacts(arguments).await,
            "listCalendars" => self.list_calendars().await,
            _ => Err(Error::ToolNotFound(name.to_string())),
        };

        match result {
            Err(e) if e.is_tool_condition() => Ok(json!({ "error": e.to_string() })),
            other => other,
        }
    }

    async fn list_accounts(&self) -> Result<Value> {
        let accounts = self.store.list_accounts().await?;
        Ok(serde_json::to_value(accounts)?)
    }

    async fn search_messages(&self, args: &Value) -> Result<Value> {
        let opts = SearchOptions::from_args(args);
        let hits = self.search.search(&opts).await?;
        Ok(serde_json::to_value(hits)?)
    }

    async fn full_text_search(&self, args: &Value) -> Result<Value> {
        let query = args["query"].as_str().unwrap_or("");
        let hits = self.fulltext.query(query).await?;
        Ok(serde_json::to_value(hits)?)
    }

    async fn get_message(&self, args: &Value) -> Result<Value> {
        let message_id = args["messageId"]
            .as_str()
            .ok_or_else(|| Error::InvalidRequest("Missing messageId".to_string()))?;
        let folder_path = args["folderPath"]
            .as_str()
            .ok_or_else(|| Error::InvalidRequest("Missing folderPath".to_string()))?;

        let header = self.store.fetch_header(folder_path, message_id).await?;
        let body = match self.store.fetch_body(folder_path, message_id).await {
            Ok(body) => body.text,
            Err(_) => "(Could not extract body text)".to_string(),
        };
        Ok(serde_json::to_value(FullMessage {
            id: header.id,
            subject: header.subject,
            author: header.author,
            recipients: header.recipients,
            cc_list: header.cc_list,
            date: header.date,
            body,
        })?)
    }

    async fn compose_mail(&self, args: &Value) -> Result<Value> {
        let req: ComposeRequest = serde_json::from_value(args.clone())?;
        self.compose.compose(&req).await
    }

    async fn reply_to_message(&self, args: &Value) -> Result<Value> {
        let req: ReplyRequest = serde_json::from_value(args.clone())?;
        if req.message_id.is_empty() || req.folder_path.is_empty() {
            return Err(Error::InvalidRequest(
                "Missing messageId or folderPath".to_string(),
            ));
        }
        self.compose.reply(&req).await
    }

    async fn forward_message(&self, args: &Value) -> Result<Value> {
        let req: ForwardRequest = serde_json::from_value(args.clone())?;
        if req.message_id.is_empty() || req.folder_path.is_empty() {
            return Err(Error::InvalidRequest(
                "Missing messageId or folderPath".to_string(),
            ));
        }
        self.compose.forward(&req).await
    }

    async fn search_contacts(&self, args: &Value) -> Result<Value> {
        let query = args["query"].as_str().unwrap_or("");
        let contacts = self.contacts.search(query).await?;
        Ok(serde_json::to_value(contacts)?)
    }

    async fn list_calendars(&self) -> Result<Value> {
        let calendars = self.calendar.list_calendars().await?;
        Ok(serde_json::to_value(calendars)?)
    }
}
