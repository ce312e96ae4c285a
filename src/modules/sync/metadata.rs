// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use ahash::AHashSet;
use chrono::{TimeZone, Utc};
use itertools::Itertools;

use crate::modules::gmail::model::threads::{GmailMessage, ThreadDetail};

pub const LABEL_INBOX: &str = "INBOX";
// Gmail exposes the "Primary" tab as the personal category label.
pub const LABEL_CATEGORY_PRIMARY: &str = "CATEGORY_PERSONAL";
pub const LABEL_CHAT: &str = "CHAT";
pub const LABEL_UNREAD: &str = "UNREAD";

/// Everything the index needs about one thread, distilled from a
/// `threads.get` response.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ThreadMetadata {
    pub thread_id: String,
    pub history_id: Option<String>,
    pub subject: Option<String>,
    pub participants: Vec<String>,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub snippet: Option<String>,
    pub last_message_id: String,
    pub last_message_date: i64,
    pub unread_count: u32,
    pub label_ids: Vec<String>,
    pub content_version: String,
}

impl ThreadMetadata {
    pub fn in_primary_inbox(&self) -> bool {
        self.label_ids.iter().any(|l| l == LABEL_INBOX)
            && self.label_ids.iter().any(|l| l == LABEL_CATEGORY_PRIMARY)
            && !self.label_ids.iter().any(|l| l == LABEL_CHAT)
    }
}

/// Distill a fetched thread into index metadata. Returns `None` for a thread
/// with no messages, which Gmail can produce transiently around deletion.
pub fn extract_thread_metadata(detail: &ThreadDetail) -> Option<ThreadMetadata> {
    if detail.messages.is_empty() {
        return None;
    }
    let mut messages: Vec<&GmailMessage> = detail.messages.iter().collect();
    messages.sort_by_key(|m| m.internal_date_ms());
    let newest = *messages.last()?;

    let (from_name, from_email) = newest
        .header("From")
        .map(parse_address)
        .unwrap_or((None, None));

    let mut participants: AHashSet<String> = AHashSet::new();
    for message in &messages {
        for header in ["From", "To", "Cc"] {
            if let Some(value) = message.header(header) {
                for (_, email) in parse_address_list(value) {
                    if let Some(email) = email {
                        participants.insert(email.to_lowercase());
                    }
                }
            }
        }
    }

    let unread_count = messages
        .iter()
        .filter(|m| m.label_ids.iter().any(|l| l == LABEL_UNREAD))
        .count() as u32;

    let label_ids: Vec<String> = messages
        .iter()
        .flat_map(|m| m.label_ids.iter().cloned())
        .unique()
        .collect();

    let last_message_date = newest.internal_date_ms();
    Some(ThreadMetadata {
        thread_id: detail.id.clone(),
        history_id: if detail.history_id.is_empty() {
            None
        } else {
            Some(detail.history_id.clone())
        },
        subject: newest.header("Subject").map(str::to_string),
        participants: participants.into_iter().sorted().collect(),
        from_name,
        from_email,
        snippet: newest.snippet.clone(),
        last_message_id: newest.id.clone(),
        last_message_date,
        unread_count,
        label_ids,
        content_version: content_version(last_message_date, &newest.id),
    })
}

/// Fingerprint of the newest message. Stable for a given (date, id) pair, so
/// a stored score can be compared against it to decide staleness.
pub fn content_version(date_ms: i64, message_id: &str) -> String {
    let stamp = Utc
        .timestamp_millis_opt(date_ms)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| date_ms.to_string());
    format!("{}:{}", stamp, message_id)
}

/// Parse one RFC 5322-ish mailbox, `"Display Name" <addr>` or a bare
/// address. Lossy on purpose; display output, not routing.
pub fn parse_address(value: &str) -> (Option<String>, Option<String>) {
    let value = value.trim();
    if value.is_empty() {
        return (None, None);
    }
    if let (Some(open), Some(close)) = (value.rfind('<'), value.rfind('>')) {
        if open < close {
            let email = value[open + 1..close].trim();
            let name = value[..open].trim().trim_matches('"').trim();
            return (
                (!name.is_empty()).then(|| name.to_string()),
                (!email.is_empty()).then(|| email.to_string()),
            );
        }
    }
    if value.contains('@') {
        return (None, Some(value.to_string()));
    }
    (Some(value.trim_matches('"').to_string()), None)
}

pub fn parse_address_list(value: &str) -> Vec<(Option<String>, Option<String>)> {
    split_addresses(value)
        .iter()
        .map(|part| parse_address(part))
        .collect()
}

// Split on commas outside double quotes. Gmail headers put display names in
// quotes when they contain commas.
fn split_addresses(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in value.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::gmail::model::threads::Header;

    fn message(id: &str, date_ms: i64, labels: &[&str], headers: &[(&str, &str)]) -> GmailMessage {
        GmailMessage {
            id: id.into(),
            thread_id: "t1".into(),
            internal_date: date_ms.to_string(),
            label_ids: labels.iter().map(|l| l.to_string()).collect(),
            payload: crate::modules::gmail::model::threads::MessagePart {
                headers: headers
                    .iter()
                    .map(|(name, value)| Header {
                        name: name.to_string(),
                        value: value.to_string(),
                    })
                    .collect(),
                ..Default::default()
            },
            snippet: Some(format!("snippet of {}", id)),
            ..Default::default()
        }
    }

    #[test]
    fn parses_display_name_and_address() {
        assert_eq!(
            parse_address("Ada Lovelace <ada@example.com>"),
            (Some("Ada Lovelace".into()), Some("ada@example.com".into()))
        );
        assert_eq!(parse_address("ada@example.com"), (None, Some("ada@example.com".into())));
        assert_eq!(
            parse_address("\"Lovelace, Ada\" <ada@example.com>"),
            (Some("Lovelace, Ada".into()), Some("ada@example.com".into()))
        );
    }

    #[test]
    fn splits_quoted_address_lists() {
        let parsed = parse_address_list("\"Doe, Jane\" <jane@example.com>, bob@example.com");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].1.as_deref(), Some("jane@example.com"));
        assert_eq!(parsed[1].1.as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn extracts_metadata_from_newest_message() {
        let detail = ThreadDetail {
            id: "t1".into(),
            history_id: "4242".into(),
            messages: vec![
                message(
                    "m2",
                    2_000,
                    &[LABEL_INBOX, LABEL_CATEGORY_PRIMARY, LABEL_UNREAD],
                    &[
                        ("Subject", "Re: quarterly numbers"),
                        ("From", "Bob <bob@example.com>"),
                        ("To", "ada@example.com"),
                    ],
                ),
                message(
                    "m1",
                    1_000,
                    &[LABEL_INBOX, LABEL_CATEGORY_PRIMARY],
                    &[
                        ("Subject", "quarterly numbers"),
                        ("From", "Ada <ada@example.com>"),
                        ("To", "bob@example.com"),
                    ],
                ),
            ],
        };
        let meta = extract_thread_metadata(&detail).unwrap();
        assert_eq!(meta.last_message_id, "m2");
        assert_eq!(meta.last_message_date, 2_000);
        assert_eq!(meta.subject.as_deref(), Some("Re: quarterly numbers"));
        assert_eq!(meta.from_email.as_deref(), Some("bob@example.com"));
        assert_eq!(meta.unread_count, 1);
        assert_eq!(
            meta.participants,
            vec!["ada@example.com".to_string(), "bob@example.com".to_string()]
        );
        assert!(meta.in_primary_inbox());
        assert!(meta.content_version.ends_with(":m2"));
        assert_eq!(meta.history_id.as_deref(), Some("4242"));
    }

    #[test]
    fn empty_thread_yields_none() {
        let detail = ThreadDetail {
            id: "t1".into(),
            ..Default::default()
        };
        assert!(extract_thread_metadata(&detail).is_none());
    }

    #[test]
    fn chat_thread_is_not_primary() {
        let detail = ThreadDetail {
            id: "t1".into(),
            history_id: "1".into(),
            messages: vec![message(
                "m1",
                1_000,
                &[LABEL_INBOX, LABEL_CATEGORY_PRIMARY, LABEL_CHAT],
                &[("From", "ada@example.com")],
            )],
        };
        let meta = extract_thread_metadata(&detail).unwrap();
        assert!(!meta.in_primary_inbox());
    }
}
