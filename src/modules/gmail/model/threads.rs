// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThreadIndexEntry {
    pub id: String,
    #[serde(rename = "historyId")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThreadList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<Vec<ThreadIndexEntry>>,
    #[serde(rename = "nextPageToken")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(rename = "resultSizeEstimate")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_size_estimate: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartBody {
    Attachment {
        #[serde(rename = "attachmentId")]
        attachment_id: String,
        size: u32,
    },
    Body {
        data: String,
        size: u32,
    },
    Empty {
        size: u32,
    },
}

impl Default for PartBody {
    fn default() -> Self {
        PartBody::Empty { size: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessagePart {
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub filename: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,
    #[serde(rename = "mimeType")]
    #[serde(default)]
    pub mime_type: String,
    #[serde(rename = "partId")]
    #[serde(default)]
    pub part_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

/// One message inside a `threads.get` response. With `format=metadata` the
/// payload carries headers only; with `format=full` it also carries body
/// parts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GmailMessage {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    #[serde(rename = "historyId")]
    #[serde(default)]
    pub history_id: String,
    #[serde(rename = "internalDate")]
    #[serde(default)]
    pub internal_date: String,
    #[serde(rename = "labelIds")]
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub payload: MessagePart,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl GmailMessage {
    pub fn internal_date_ms(&self) -> i64 {
        self.internal_date.parse().unwrap_or(0)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThreadDetail {
    pub id: String,
    #[serde(rename = "historyId")]
    #[serde(default)]
    pub history_id: String,
    #[serde(default)]
    pub messages: Vec<GmailMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    #[serde(rename = "emailAddress")]
    pub email_address: String,
    #[serde(rename = "historyId")]
    pub history_id: String,
}
