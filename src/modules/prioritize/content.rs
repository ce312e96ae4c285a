// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use scraper::Html;

use crate::base64_decode_url_safe;
use crate::modules::gmail::model::threads::{GmailMessage, MessagePart, PartBody, ThreadDetail};
use crate::modules::utils::truncate_chars;

/// Flatten a fetched thread into the text blob handed to the scorer: the
/// newest `max_messages` messages, oldest first, each reduced to plain text,
/// the whole thing capped at `max_chars`.
pub fn normalize_thread_content(
    detail: &ThreadDetail,
    max_messages: usize,
    max_chars: usize,
) -> String {
    let mut messages: Vec<&GmailMessage> = detail.messages.iter().collect();
    messages.sort_by_key(|m| m.internal_date_ms());
    let skip = messages.len().saturating_sub(max_messages);

    let mut blocks = Vec::new();
    for message in messages.into_iter().skip(skip) {
        let from = message.header("From").unwrap_or("(unknown)");
        let body = message_text(message);
        let body = if body.is_empty() {
            message.snippet.clone().unwrap_or_default()
        } else {
            body
        };
        blocks.push(format!("From: {}\n{}", from, body.trim()));
    }
    truncate_chars(&blocks.join("\n\n---\n\n"), max_chars)
}

/// Best text rendering of one message: text/plain if any part carries it,
/// otherwise text/html stripped of markup.
fn message_text(message: &GmailMessage) -> String {
    if let Some(text) = find_part_text(&message.payload, "text/plain") {
        return text;
    }
    if let Some(html) = find_part_text(&message.payload, "text/html") {
        return html_to_text(&html);
    }
    String::new()
}

fn find_part_text(part: &MessagePart, mime_type: &str) -> Option<String> {
    if part.mime_type.eq_ignore_ascii_case(mime_type) {
        if let PartBody::Body { data, .. } = &part.body {
            if let Ok(bytes) = base64_decode_url_safe!(data) {
                return Some(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }
    part.parts
        .iter()
        .find_map(|child| find_part_text(child, mime_type))
}

fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    let joined = text.join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
