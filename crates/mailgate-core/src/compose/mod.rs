//! Outgoing message construction for compose, reply and forward
//!
//! Every operation here builds one field set and opens an interactive
//! editor window pre-populated with it. Nothing is ever transmitted
//! without the human pressing Send; that boundary is deliberate.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{json, Value};

use crate::error::Result;
use crate::models::{
    AccountInfo, ComposeRequest, ForwardRequest, MessageHeader, OutgoingAttachment,
    OutgoingMessage, ReplyRequest,
};
use crate::store::MailStore;

/// Builds outgoing field sets and opens compose windows via the store
pub struct ComposeBuilder {
    store: Arc<dyn MailStore>,
}

impl ComposeBuilder {
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self { store }
    }

    /// composeMail / sendMail: open a new-message window
    pub async fn compose(&self, req: &ComposeRequest) -> Result<Value> {
        let formatted = format_body_html(&req.body, req.is_html);
        let body_html = if req.is_html && formatted.contains("<html") {
            formatted
        } else {
            wrap_document(&formatted)
        };

        let (attachments, failed) = resolve_attachments(&req.attachments);
        let (identity_id, warning) = self.resolve_identity(req.from.as_deref(), None).await?;

        let outgoing = OutgoingMessage {
            to: req.to.clone(),
            cc: req.cc.clone(),
            bcc: req.bcc.clone(),
            subject: req.subject.clone(),
            body_html,
            identity_id,
            attachments,
            references: None,
            in_reply_to: None,
        };
        self.store.open_compose_window(&outgoing).await?;

        Ok(success_message("Compose window opened", &warning, &failed))
    }

    /// replyToMessage: quote the original and set threading headers
    pub async fn reply(&self, req: &ReplyRequest) -> Result<Value> {
        let header = self
            .store
            .fetch_header(&req.folder_path, &req.message_id)
            .await?;
        // Body extraction failure degrades to an empty quote
        let original_body = self
            .store
            .fetch_body(&req.folder_path, &req.message_id)
            .await
            .map(|b| b.text)
            .unwrap_or_default();

        let to = if req.to.is_empty() {
            header.author.clone()
        } else {
            req.to.clone()
        };

        let cc = if req.reply_all && req.cc.is_empty() {
            let own_email = self
                .account_for_folder(&req.folder_path)
                .await
                .and_then(|a| a.default_identity().map(|i| i.email.to_lowercase()));
            reply_all_cc(&header.recipients, &header.cc_list, own_email.as_deref())
        } else {
            req.cc.clone()
        };

        let quote = quote_block(&format_date(header.date), &header.author, &original_body);
        let body_html = wrap_document(&format!(
            "{}{}",
            format_body_html(&req.body, req.is_html),
            quote
        ));

        let (attachments, failed) = resolve_attachments(&req.attachments);
        let (identity_id, warning) = self
            .resolve_identity(req.from.as_deref(), Some(&req.folder_path))
            .await?;

        let outgoing = OutgoingMessage {
            to,
            cc,
            bcc: req.bcc.clone(),
            subject: reply_subject(&header.subject),
            body_html,
            identity_id,
            attachments,
            references: Some(format!("<{}>", req.message_id)),
            in_reply_to: Some(format!("<{}>", req.message_id)),
        };
        self.store.open_compose_window(&outgoing).await?;

        Ok(success_message("Reply window opened", &warning, &failed))
    }

    /// forwardMessage: quote beneath a header block, carry attachments over
    pub async fn forward(&self, req: &ForwardRequest) -> Result<Value> {
        let header = self
            .store
            .fetch_header(&req.folder_path, &req.message_id)
            .await?;
        let body = self
            .store
            .fetch_body(&req.folder_path, &req.message_id)
            .await
            .unwrap_or_default();

        let block = forward_block(&header, &body.text);
        let intro = if req.body.is_empty() {
            String::new()
        } else {
            format!("{}<br><br>", format_body_html(&req.body, req.is_html))
        };
        let body_html = wrap_document(&format!("{intro}{block}"));

        // Original attachments first, then the newly supplied paths
        let mut attachments: Vec<OutgoingAttachment> = body
            .attachments
            .iter()
            .map(|a| OutgoingAttachment {
                url: a.url.clone(),
                name: a.name.clone(),
                content_type: a.content_type.clone(),
            })
            .collect();
        let original_count = attachments.len();
        let (added, failed) = resolve_attachments(&req.attachments);
        let added_count = added.len();
        attachments.extend(added);

        let (identity_id, warning) = self
            .resolve_identity(req.from.as_deref(), Some(&req.folder_path))
            .await?;

        let outgoing = OutgoingMessage {
            to: req.to.clone(),
            cc: req.cc.clone(),
            bcc: req.bcc.clone(),
            subject: forward_subject(&header.subject),
            body_html,
            identity_id,
            attachments,
            references: None,
            in_reply_to: None,
        };
        self.store.open_compose_window(&outgoing).await?;

        Ok(success_message(
            &format!(
                "Forward window opened with {} attachment(s)",
                original_count + added_count
            ),
            &warning,
            &failed,
        ))
    }

    /// Resolve the sending identity: explicit key or email match first,
    /// then the account owning the folder context, then the default
    /// account. An unresolved explicit sender degrades to a warning.
    async fn resolve_identity(
        &self,
        from: Option<&str>,
        folder_path: Option<&str>,
    ) -> Result<(Option<String>, String)> {
        let from = from.filter(|s| !s.is_empty());
        let accounts = self.store.list_accounts().await?;

        if let Some(from) = from {
            let lower = from.to_lowercase();
            for account in &accounts {
                for identity in &account.identities {
                    if identity.id == from || identity.email.to_lowercase() == lower {
                        return Ok((Some(identity.id.clone()), String::new()));
                    }
                }
            }
        }

        let fallback_account = match folder_path {
            Some(path) => self.account_for_folder(path).await,
            None => None,
        };
        let identity_id = fallback_account
            .as_ref()
            .or(accounts.first())
            .and_then(|a| a.default_identity())
            .map(|i| i.id.clone());

        let warning = match from {
            Some(from) => format!("unknown identity: {from}, using default"),
            None => String::new(),
        };
        Ok((identity_id, warning))
    }

    /// The account whose folder tree contains the given path, resolved by
    /// root-folder path-prefix match
    async fn account_for_folder(&self, folder_path: &str) -> Option<AccountInfo> {
        let accounts = self.store.list_accounts().await.ok()?;
        for account in accounts {
            let Ok(roots) = self.store.enumerate_folders(&account.id).await else {
                continue;
            };
            if roots.iter().any(|r| folder_path.starts_with(&r.path)) {
                return Some(account);
            }
        }
        None
    }
}

fn success_message(base: &str, warning: &str, failed: &[String]) -> Value {
    let mut msg = base.to_string();
    if !warning.is_empty() {
        msg.push_str(&format!(" ({warning})"));
    }
    if !failed.is_empty() {
        msg.push_str(&format!(" (failed to attach: {})", failed.join(", ")));
    }
    json!({ "success": true, "message": msg })
}

/// Escape the three characters that matter in HTML text
pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Format a body for the HTML editor. Plain text is escaped with line
/// breaks preserved; HTML keeps its markup but every non-ASCII code point
/// becomes a numeric character reference so the markup survives a
/// single-byte transport.
pub(crate) fn format_body_html(body: &str, is_html: bool) -> String {
    if is_html {
        body.chars()
            .filter(|&c| c != '\n')
            .map(|c| {
                if (c as u32) > 127 {
                    format!("&#{};", c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect()
    } else {
        escape_html(body).replace('\n', "<br>")
    }
}

/// Wrap editor content in a minimal UTF-8 document shell
pub(crate) fn wrap_document(content: &str) -> String {
    format!("<html><head><meta charset=\"UTF-8\"></head><body>{content}</body></html>")
}

pub(crate) fn reply_subject(original: &str) -> String {
    if original.starts_with("Re:") {
        original.to_string()
    } else {
        format!("Re: {original}")
    }
}

pub(crate) fn forward_subject(original: &str) -> String {
    if original.starts_with("Fwd:") {
        original.to_string()
    } else {
        format!("Fwd: {original}")
    }
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%b %d, %Y %I:%M %p").to_string())
        .unwrap_or_default()
}

/// The quoted-original block appended to a reply body
pub(crate) fn quote_block(date: &str, author: &str, original_body: &str) -> String {
    let quoted: Vec<String> = original_body
        .split('\n')
        .map(|line| format!("&gt; {}", escape_html(line)))
        .collect();
    format!(
        "<br><br>On {}, {} wrote:<br>{}",
        date,
        escape_html(author),
        quoted.join("<br>")
    )
}

/// The header block prepended to a forwarded body
pub(crate) fn forward_block(header: &MessageHeader, original_body: &str) -> String {
    format!(
        "-------- Forwarded Message --------<br>\
         Subject: {}<br>\
         Date: {}<br>\
         From: {}<br>\
         To: {}<br><br>{}",
        escape_html(&header.subject),
        format_date(header.date),
        escape_html(&header.author),
        escape_html(&header.recipients),
        escape_html(original_body).replace('\n', "<br>")
    )
}

/// Split an address header on commas outside double quotes
pub(crate) fn split_addresses(header: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in header.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                parts.push(current.clone());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Lowercased bare address: the part inside angle brackets, else the
/// whole trimmed entry
pub(crate) fn bare_address(entry: &str) -> String {
    // Compile-time-known pattern
    let angle = Regex::new(r"<([^>]+)>").unwrap();
    angle
        .captures(entry)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| entry.trim().to_string())
        .to_lowercase()
}

/// The reply-all cc list: original To plus Cc, own address excluded,
/// de-duplicated by bare address with first occurrence kept
pub(crate) fn reply_all_cc(
    recipients: &str,
    cc_list: &str,
    own_email: Option<&str>,
) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::new();
    for entry in split_addresses(recipients)
        .into_iter()
        .chain(split_addresses(cc_list))
    {
        let bare = bare_address(&entry);
        if let Some(own) = own_email {
            if !own.is_empty() && bare == own {
                continue;
            }
        }
        if seen.insert(bare) {
            unique.push(entry);
        }
    }
    unique.join(", ")
}

/// Check each path for existence; missing paths are reported, not fatal
pub(crate) fn resolve_attachments(paths: &[String]) -> (Vec<OutgoingAttachment>, Vec<String>) {
    let mut attached = Vec::new();
    let mut failed = Vec::new();
    for path in paths {
        let p = Path::new(path);
        if p.is_file() {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.clone());
            attached.push(OutgoingAttachment {
                url: format!("file://{path}"),
                name,
                content_type: None,
            });
        } else {
            failed.push(path.clone());
        }
    }
    (attached, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{Identity, MessageAttachment, MessageBody};
    use crate::store::memory::MemoryStore;
    use crate::store::Folder;
    use std::io::Write;

    fn identity(id: &str, email: &str, default: bool) -> Identity {
        Identity {
            id: id.to_string(),
            email: email.to_string(),
            name: email.to_string(),
            is_default: default,
        }
    }

    fn account(id: &str, identities: Vec<Identity>) -> AccountInfo {
        AccountInfo {
            id: id.to_string(),
            name: id.to_string(),
            kind: "imap".to_string(),
            identities,
        }
    }

    fn folder(name: &str, path: &str, children: Vec<Folder>) -> Folder {
        Folder {
            name: name.to_string(),
            path: path.to_string(),
            remote: false,
            children,
        }
    }

    fn original_header() -> MessageHeader {
        MessageHeader {
            id: "orig-1".to_string(),
            subject: "Quarterly numbers".to_string(),
            author: "Carol <carol@example.com>".to_string(),
            recipients: "me@example.com, Bob <bob@example.com>".to_string(),
            cc_list: "dave@example.com, Bob <BOB@example.com>".to_string(),
            date: Some("2024-03-05T10:00:00Z".parse().unwrap()),
            read: true,
            flagged: false,
        }
    }

    fn fixture() -> Arc<MemoryStore> {
        let store = MemoryStore::new()
            .with_account(
                account("a1", vec![identity("id1", "me@example.com", true)]),
                vec![folder(
                    "Root",
                    "m://a1",
                    vec![folder("Inbox", "m://a1/INBOX", vec![])],
                )],
            )
            .with_message(
                "m://a1/INBOX",
                original_header(),
                MessageBody {
                    text: "line one\nline two".to_string(),
                    attachments: vec![MessageAttachment {
                        url: "m://a1/INBOX/orig-1/part1".to_string(),
                        name: "report.pdf".to_string(),
                        content_type: Some("application/pdf".to_string()),
                    }],
                },
            );
        let store = store.with_account(
            account("a2", vec![identity("id9", "other@example.org", true)]),
            vec![folder(
                "Root2",
                "m://a2",
                vec![folder("Inbox", "m://a2/INBOX", vec![])],
            )],
        );
        let store = store.with_message(
            "m://a2/INBOX",
            MessageHeader {
                id: "other-1".to_string(),
                subject: "Re: ping".to_string(),
                author: "x@example.org".to_string(),
                recipients: String::new(),
                cc_list: String::new(),
                date: None,
                read: false,
                flagged: false,
            },
            MessageBody::default(),
        );
        Arc::new(store)
    }

    #[test]
    fn plain_text_bodies_are_escaped_with_breaks() {
        assert_eq!(
            format_body_html("a < b\n& more", false),
            "a &lt; b<br>&amp; more"
        );
    }

    #[test]
    fn html_bodies_use_numeric_references() {
        assert_eq!(format_body_html("<b>café</b>\n", true), "<b>caf&#233;</b>");
    }

    #[test]
    fn subject_prefixes_are_idempotent() {
        assert_eq!(reply_subject("Hello"), "Re: Hello");
        assert_eq!(reply_subject("Re: Hello"), "Re: Hello");
        assert_eq!(forward_subject("Hello"), "Fwd: Hello");
        assert_eq!(forward_subject("Fwd: Hello"), "Fwd: Hello");
    }

    #[test]
    fn splits_on_commas_outside_quotes() {
        let parts = split_addresses(r#""Smith, Jane" <jane@example.com>, bob@example.com"#);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], "bob@example.com");
    }

    #[test]
    fn reply_all_excludes_self_and_duplicates() {
        let cc = reply_all_cc(
            "me@example.com, Bob <bob@example.com>",
            "dave@example.com, Bob <BOB@example.com>",
            Some("me@example.com"),
        );
        assert_eq!(cc, "Bob <bob@example.com>, dave@example.com");
    }

    #[tokio::test]
    async fn compose_opens_window_with_wrapped_body() {
        let store = fixture();
        let builder = ComposeBuilder::new(store.clone());
        let req = ComposeRequest {
            to: "x@example.com".to_string(),
            subject: "Hi".to_string(),
            body: "Hello\nthere".to_string(),
            ..Default::default()
        };
        let result = builder.compose(&req).await.unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["message"], "Compose window opened");

        let windows = store.opened_windows();
        assert_eq!(windows.len(), 1);
        assert!(windows[0].body_html.starts_with("<html>"));
        assert!(windows[0].body_html.contains("Hello<br>there"));
        assert_eq!(windows[0].identity_id.as_deref(), Some("id1"));
    }

    #[tokio::test]
    async fn unknown_sender_warns_but_succeeds() {
        let store = fixture();
        let builder = ComposeBuilder::new(store.clone());
        let req = ComposeRequest {
            to: "x@example.com".to_string(),
            subject: "Hi".to_string(),
            body: "b".to_string(),
            from: Some("ghost@example.com".to_string()),
            ..Default::default()
        };
        let result = builder.compose(&req).await.unwrap();
        assert_eq!(result["success"], true);
        assert!(result["message"]
            .as_str()
            .unwrap()
            .contains("unknown identity: ghost@example.com, using default"));
        // Fell back to the default account's identity
        assert_eq!(store.opened_windows()[0].identity_id.as_deref(), Some("id1"));
    }

    #[tokio::test]
    async fn sender_matches_by_email_case_insensitively() {
        let store = fixture();
        let builder = ComposeBuilder::new(store.clone());
        let req = ComposeRequest {
            to: "x@example.com".to_string(),
            subject: "Hi".to_string(),
            body: "b".to_string(),
            from: Some("OTHER@example.org".to_string()),
            ..Default::default()
        };
        let result = builder.compose(&req).await.unwrap();
        assert_eq!(result["message"], "Compose window opened");
        assert_eq!(store.opened_windows()[0].identity_id.as_deref(), Some("id9"));
    }

    #[tokio::test]
    async fn reply_sets_threading_and_quotes_original() {
        let store = fixture();
        let builder = ComposeBuilder::new(store.clone());
        let req = ReplyRequest {
            message_id: "orig-1".to_string(),
            folder_path: "m://a1/INBOX".to_string(),
            body: "Thanks!".to_string(),
            ..Default::default()
        };
        let result = builder.reply(&req).await.unwrap();
        assert_eq!(result["success"], true);

        let window = &store.opened_windows()[0];
        assert_eq!(window.to, "Carol <carol@example.com>");
        assert_eq!(window.subject, "Re: Quarterly numbers");
        assert_eq!(window.references.as_deref(), Some("<orig-1>"));
        assert_eq!(window.in_reply_to.as_deref(), Some("<orig-1>"));
        assert!(window.body_html.contains("wrote:<br>&gt; line one<br>&gt; line two"));
        assert_eq!(window.cc, "");
    }

    #[tokio::test]
    async fn reply_all_computes_cc_without_self() {
        let store = fixture();
        let builder = ComposeBuilder::new(store.clone());
        let req = ReplyRequest {
            message_id: "orig-1".to_string(),
            folder_path: "m://a1/INBOX".to_string(),
            body: "Thanks!".to_string(),
            reply_all: true,
            ..Default::default()
        };
        builder.reply(&req).await.unwrap();

        let window = &store.opened_windows()[0];
        assert_eq!(window.cc, "Bob <bob@example.com>, dave@example.com");
    }

    #[tokio::test]
    async fn reply_to_missing_message_is_a_distinct_error() {
        let builder = ComposeBuilder::new(fixture());
        let req = ReplyRequest {
            message_id: "nope".to_string(),
            folder_path: "m://a1/INBOX".to_string(),
            body: "b".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            builder.reply(&req).await.unwrap_err(),
            Error::MessageNotFound(_)
        ));

        let req = ReplyRequest {
            message_id: "orig-1".to_string(),
            folder_path: "m://a1/Missing".to_string(),
            body: "b".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            builder.reply(&req).await.unwrap_err(),
            Error::FolderNotFound(_)
        ));
    }

    #[tokio::test]
    async fn forward_counts_original_and_new_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let attach_path = dir.path().join("notes.txt");
        writeln!(std::fs::File::create(&attach_path).unwrap(), "hi").unwrap();

        let store = fixture();
        let builder = ComposeBuilder::new(store.clone());
        let req = ForwardRequest {
            message_id: "orig-1".to_string(),
            folder_path: "m://a1/INBOX".to_string(),
            to: "dst@example.com".to_string(),
            attachments: vec![
                attach_path.to_string_lossy().to_string(),
                "/no/such/file.bin".to_string(),
            ],
            ..Default::default()
        };
        let result = builder.forward(&req).await.unwrap();
        assert_eq!(result["success"], true);
        let msg = result["message"].as_str().unwrap();
        assert!(msg.contains("Forward window opened with 2 attachment(s)"));
        assert!(msg.contains("failed to attach: /no/such/file.bin"));

        let window = &store.opened_windows()[0];
        assert_eq!(window.subject, "Fwd: Quarterly numbers");
        assert_eq!(window.attachments.len(), 2);
        assert_eq!(window.attachments[0].name, "report.pdf");
        assert_eq!(window.attachments[1].name, "notes.txt");
        assert!(window.body_html.contains("-------- Forwarded Message --------"));
        assert!(window
            .body_html
            .contains("From: Carol &lt;carol@example.com&gt;"));
    }

    #[tokio::test]
    async fn forward_keeps_existing_fwd_prefix() {
        let store = fixture();
        let builder = ComposeBuilder::new(store.clone());
        let req = ForwardRequest {
            message_id: "other-1".to_string(),
            folder_path: "m://a2/INBOX".to_string(),
            to: "dst@example.com".to_string(),
            ..Default::default()
        };
        builder.forward(&req).await.unwrap();
        // "Re: ping" is not Fwd-prefixed yet
        assert_eq!(store.opened_windows()[0].subject, "Fwd: Re: ping");
    }
}
