//! Bounded recursive header search
//!
//! Depth-first walk of every account's folder tree with text and date
//! filtering. Matches accumulate up to a global ceiling, then one sort
//! pass and a truncation. Collect-then-sort is a deliberate scalability
//! compromise carried over from the host client; the ceiling keeps it
//! bounded.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::models::{MessageHeader, MessageHit};
use crate::store::{Folder, MailStore};

/// Results returned when the caller does not ask for a count
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Hard ceiling on the requested result count
pub const MAX_RESULTS_CAP: usize = 200;

/// Global accumulation ceiling across all folders and accounts
pub const COLLECTION_CAP: usize = 1000;

/// Date sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Parsed searchMessages arguments
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Lowercased free-text query; empty matches everything
    pub query: String,

    /// Inclusive lower date bound, microseconds since the epoch
    pub start: Option<i64>,

    /// Inclusive upper date bound, microseconds since the epoch
    pub end: Option<i64>,

    /// Effective result cap
    pub limit: usize,

    pub order: SortOrder,
}

impl SearchOptions {
    /// Parse tool-call arguments. Unparseable dates are ignored rather
    /// than rejected; a non-positive or missing maxResults falls back to
    /// the default; anything but "asc" sorts descending.
    pub fn from_args(args: &Value) -> Self {
        let query = args["query"].as_str().unwrap_or("").to_lowercase();

        let start = args["startDate"]
            .as_str()
            .and_then(parse_bound)
            .map(|d| d.timestamp_micros());

        let end = args["endDate"].as_str().and_then(|s| {
            let parsed = parse_bound(s)?;
            // A date-only bound is inclusive through end-of-day
            let adjusted = if s.contains('T') {
                parsed
            } else {
                parsed + chrono::Duration::seconds(86_400)
            };
            Some(adjusted.timestamp_micros())
        });

        let requested = match &args["maxResults"] {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        };
        let limit = requested
            .filter(|n| n.is_finite() && *n > 0.0)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .min(MAX_RESULTS_CAP);

        let order = match args["sortOrder"].as_str() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };

        Self {
            query,
            start,
            end,
            limit,
            order,
        }
    }
}

fn parse_bound(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// A match carrying its sort key; the key never leaves the engine
struct Scored {
    hit: MessageHit,
    ts: i64,
}

/// Header search over every account's folder tree
pub struct SearchEngine {
    store: Arc<dyn MailStore>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self { store }
    }

    pub async fn search(&self, opts: &SearchOptions) -> Result<Vec<MessageHit>> {
        let mut acc: Vec<Scored> = Vec::new();

        'accounts: for account in self.store.list_accounts().await? {
            if acc.len() >= COLLECTION_CAP {
                break;
            }
            let roots = self.store.enumerate_folders(&account.id).await?;
            // Depth-first, preorder; the accumulator length bounds the walk
            let mut stack: Vec<Folder> = roots.into_iter().rev().collect();
            while let Some(folder) = stack.pop() {
                if acc.len() >= COLLECTION_CAP {
                    break 'accounts;
                }
                self.collect_folder(&folder, opts, &mut acc).await;
                for child in folder.children.into_iter().rev() {
                    stack.push(child);
                }
            }
        }

        match opts.order {
            SortOrder::Asc => acc.sort_by_key(|s| s.ts),
            SortOrder::Desc => acc.sort_by_key(|s| std::cmp::Reverse(s.ts)),
        }
        acc.truncate(opts.limit);
        Ok(acc.into_iter().map(|s| s.hit).collect())
    }

    async fn collect_folder(&self, folder: &Folder, opts: &SearchOptions, acc: &mut Vec<Scored>) {
        if folder.remote {
            // Best-effort; a stale index is still searchable
            let _ = self.store.refresh_folder(&folder.path).await;
        }
        let headers = match self.store.enumerate_messages(&folder.path).await {
            Ok(headers) => headers,
            Err(e) => {
                debug!("Skipping folder {}: {}", folder.path, e);
                return;
            }
        };
        for header in headers {
            if acc.len() >= COLLECTION_CAP {
                break;
            }
            let ts = header.date.map(|d| d.timestamp_micros()).unwrap_or(0);
            if let Some(start) = opts.start {
                if ts < start {
                    continue;
                }
            }
            if let Some(end) = opts.end {
                if ts > end {
                    continue;
                }
            }
            if !matches_query(&header, &opts.query) {
                continue;
            }
            acc.push(Scored {
                hit: MessageHit {
                    id: header.id,
                    subject: header.subject,
                    author: header.author,
                    recipients: header.recipients,
                    date: header.date,
                    folder: folder.name.clone(),
                    folder_path: folder.path.clone(),
                    read: header.read,
                    flagged: header.flagged,
                },
                ts,
            });
        }
    }
}

fn matches_query(header: &MessageHeader, lower_query: &str) -> bool {
    if lower_query.is_empty() {
        return true;
    }
    header.subject.to_lowercase().contains(lower_query)
        || header.author.to_lowercase().contains(lower_query)
        || header.recipients.to_lowercase().contains(lower_query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountInfo, MessageBody};
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn account(id: &str) -> AccountInfo {
        AccountInfo {
            id: id.to_string(),
            name: id.to_string(),
            kind: "imap".to_string(),
            identities: vec![],
        }
    }

    fn folder(name: &str, path: &str, remote: bool, children: Vec<Folder>) -> Folder {
        Folder {
            name: name.to_string(),
            path: path.to_string(),
            remote,
            children,
        }
    }

    fn header(id: &str, subject: &str, date: &str) -> MessageHeader {
        MessageHeader {
            id: id.to_string(),
            subject: subject.to_string(),
            author: "Alice <alice@example.com>".to_string(),
            recipients: "bob@example.com".to_string(),
            cc_list: String::new(),
            date: Some(date.parse().unwrap()),
            read: false,
            flagged: false,
        }
    }

    fn fixture() -> Arc<MemoryStore> {
        let store = MemoryStore::new()
            .with_account(
                account("a1"),
                vec![folder(
                    "Root",
                    "m://a1",
                    false,
                    vec![
                        folder("Inbox", "m://a1/INBOX", true, vec![]),
                        folder("Archive", "m://a1/Archive", false, vec![]),
                    ],
                )],
            )
            .with_message(
                "m://a1/INBOX",
                header("m1", "Invoice March", "2024-03-05T10:00:00Z"),
                MessageBody::default(),
            )
            .with_message(
                "m://a1/INBOX",
                header("m2", "Lunch plans", "2024-03-06T09:00:00Z"),
                MessageBody::default(),
            )
            .with_message(
                "m://a1/Archive",
                header("m3", "Old INVOICE", "2023-12-31T08:00:00Z"),
                MessageBody::default(),
            );
        Arc::new(store)
    }

    #[tokio::test]
    async fn empty_query_matches_all_sorted_descending() {
        let engine = SearchEngine::new(fixture());
        let opts = SearchOptions::from_args(&json!({"query": ""}));
        let hits = engine.search(&opts).await.unwrap();
        assert_eq!(hits.len(), 3);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["m2", "m1", "m3"]);
    }

    #[tokio::test]
    async fn query_is_case_insensitive_across_folders() {
        let engine = SearchEngine::new(fixture());
        let opts = SearchOptions::from_args(&json!({"query": "invoice"}));
        let hits = engine.search(&opts).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m3"]);
        assert_eq!(hits[0].folder_path, "m://a1/INBOX");
    }

    #[tokio::test]
    async fn date_only_end_bound_is_inclusive() {
        let engine = SearchEngine::new(fixture());
        let opts = SearchOptions::from_args(&json!({
            "query": "",
            "startDate": "2024-03-01",
            "endDate": "2024-03-05"
        }));
        let hits = engine.search(&opts).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "m1");
    }

    #[tokio::test]
    async fn unparseable_dates_are_ignored() {
        let engine = SearchEngine::new(fixture());
        let opts = SearchOptions::from_args(&json!({
            "query": "",
            "startDate": "not-a-date"
        }));
        assert!(opts.start.is_none());
        let hits = engine.search(&opts).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn ascending_sort_and_limit() {
        let engine = SearchEngine::new(fixture());
        let opts = SearchOptions::from_args(&json!({
            "query": "",
            "sortOrder": "asc",
            "maxResults": 2
        }));
        let hits = engine.search(&opts).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["m3", "m1"]);
    }

    #[test]
    fn max_results_is_capped_and_defaulted() {
        let opts = SearchOptions::from_args(&json!({"query": "", "maxResults": 999}));
        assert_eq!(opts.limit, MAX_RESULTS_CAP);
        let opts = SearchOptions::from_args(&json!({"query": "", "maxResults": -3}));
        assert_eq!(opts.limit, DEFAULT_MAX_RESULTS);
        let opts = SearchOptions::from_args(&json!({"query": ""}));
        assert_eq!(opts.limit, DEFAULT_MAX_RESULTS);
    }

    #[tokio::test]
    async fn refreshes_remote_folders_only() {
        let store = fixture();
        let engine = SearchEngine::new(store.clone());
        let opts = SearchOptions::from_args(&json!({"query": ""}));
        engine.search(&opts).await.unwrap();
        assert_eq!(store.refreshed_folders(), vec!["m://a1/INBOX".to_string()]);
    }

    #[tokio::test]
    async fn accumulator_never_exceeds_collection_cap() {
        let mut store = MemoryStore::new().with_account(
            account("big"),
            vec![folder("Inbox", "m://big/INBOX", false, vec![])],
        );
        for i in 0..1500 {
            store = store.with_message(
                "m://big/INBOX",
                header(&format!("m{i}"), "bulk", "2024-01-01T00:00:00Z"),
                MessageBody::default(),
            );
        }
        let engine = SearchEngine::new(Arc::new(store));
        let opts = SearchOptions::from_args(&json!({"query": "", "maxResults": 200}));
        let hits = engine.search(&opts).await.unwrap();
        // Requested cap applies after the global ceiling
        assert_eq!(hits.len(), MAX_RESULTS_CAP);
    }

    #[tokio::test]
    async fn headers_without_dates_are_excluded_by_start_bound() {
        let store = MemoryStore::new()
            .with_account(
                account("a1"),
                vec![folder("Inbox", "m://a1/INBOX", false, vec![])],
            )
            .with_message(
                "m://a1/INBOX",
                MessageHeader {
                    id: "nodate".to_string(),
                    subject: "s".to_string(),
                    author: String::new(),
                    recipients: String::new(),
                    cc_list: String::new(),
                    date: None,
                    read: false,
                    flagged: false,
                },
                MessageBody::default(),
            );
        let engine = SearchEngine::new(Arc::new(store));
        let opts = SearchOptions::from_args(&json!({"query": "", "startDate": "2020-01-01"}));
        assert!(engine.search(&opts).await.unwrap().is_empty());
    }
}
