//! Compose request and outgoing message data structures

use serde::{Deserialize, Serialize};

/// Arguments for composeMail / sendMail
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposeRequest {
    /// Recipient address(es), comma-separated
    pub to: String,
    pub subject: String,
    pub body: String,
    pub cc: String,
    pub bcc: String,
    pub is_html: bool,
    /// Sender identity key or email
    pub from: Option<String>,
    /// File paths to attach
    pub attachments: Vec<String>,
}

/// Arguments for replyToMessage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplyRequest {
    pub message_id: String,
    pub folder_path: String,
    pub body: String,
    pub reply_all: bool,
    pub is_html: bool,
    /// Override recipient; defaults to the original author
    pub to: String,
    /// Override cc; with replyAll unset, defaults to the computed union
    pub cc: String,
    pub bcc: String,
    pub from: Option<String>,
    pub attachments: Vec<String>,
}

/// Arguments for forwardMessage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwardRequest {
    pub message_id: String,
    pub folder_path: String,
    pub to: String,
    /// Optional text prepended above the forwarded block
    pub body: String,
    pub is_html: bool,
    pub cc: String,
    pub bcc: String,
    pub from: Option<String>,
    /// Additional file paths to attach
    pub attachments: Vec<String>,
}

/// An attachment resolved for an outgoing message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingAttachment {
    pub url: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// The field set handed to the compose window.
///
/// Nothing here is ever transmitted by mailgate itself; the window is
/// opened pre-populated and the human decides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    /// Complete HTML document for the editor body
    pub body_html: String,
    /// Resolved sending identity key, if any
    pub identity_id: Option<String>,
    pub attachments: Vec<OutgoingAttachment>,
    /// References header for threading
    pub references: Option<String>,
    /// In-Reply-To header for threading
    pub in_reply_to: Option<String>,
}
