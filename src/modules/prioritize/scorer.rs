// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;

use crate::modules::error::code::ErrorCode;
use crate::modules::error::InboxdResult;
use crate::modules::gmail::http::HttpClient;
use crate::modules::index::thread::{ExtractedFacts, SuggestedAction};
use crate::modules::settings::cli::SETTINGS;
use crate::raise_error;

/// Everything the scoring function sees about one thread.
#[derive(Clone, Debug)]
pub struct ScoreInput {
    pub thread_id: String,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub participants: Vec<String>,
    pub unread_count: u32,
    pub content: String,
}

#[derive(Clone, Debug)]
pub struct ScoreOutcome {
    pub score: u8,
    pub reason: String,
    pub action: SuggestedAction,
    pub extracted: ExtractedFacts,
}

/// Pluggable scoring function. The worker owns ordering, guardrails, and
/// persistence; implementations only turn one thread into one score.
pub trait ThreadScorer: Send + Sync {
    fn score<'a>(&'a self, input: ScoreInput) -> BoxFuture<'a, InboxdResult<ScoreOutcome>>;
}

const SYSTEM_PROMPT: &str = "You are an email triage assistant. Given one email thread, \
reply with a single JSON object: {\"score\": 0-100 urgency, \"reason\": one sentence, \
\"action\": one of \"reply\"|\"review\"|\"schedule\"|\"task\"|\"ignore\", \
\"deadlines\": [strings], \"asks\": [strings], \"people\": [strings]}. No other text.";

/// Scores threads through an OpenAI-compatible chat-completions endpoint.
pub struct LlmScorer;

impl ThreadScorer for LlmScorer {
    fn score<'a>(&'a self, input: ScoreInput) -> BoxFuture<'a, InboxdResult<ScoreOutcome>> {
        Box::pin(async move {
            let api_key = SETTINGS.inboxd_scorer_api_key.as_deref().ok_or_else(|| {
                raise_error!(
                    "inboxd_scorer_api_key is not configured".into(),
                    ErrorCode::MissingConfiguration
                )
            })?;
            let url = format!(
                "{}/chat/completions",
                SETTINGS.inboxd_scorer_url.trim_end_matches('/')
            );
            let payload = json!({
                "model": SETTINGS.inboxd_scorer_model,
                "temperature": 0,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": render_prompt(&input) },
                ],
            });
            let response = HttpClient::new()?
                .post_json(&url, api_key, &payload)
                .await
                .map_err(|e| {
                    raise_error!(
                        format!("Scorer call failed: {}", e),
                        ErrorCode::ScorerCallFailed
                    )
                })?;
            let content = response["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| {
                    raise_error!(
                        format!("Scorer response has no content: {}", response),
                        ErrorCode::ScorerResponseInvalid
                    )
                })?;
            parse_score_response(content)
        })
    }
}

fn render_prompt(input: &ScoreInput) -> String {
    format!(
        "Subject: {}\nFrom: {}\nParticipants: {}\nUnread messages: {}\n\n{}",
        input.subject.as_deref().unwrap_or("(no subject)"),
        input.from.as_deref().unwrap_or("(unknown)"),
        input.participants.join(", "),
        input.unread_count,
        input.content
    )
}

#[derive(Deserialize)]
struct RawScore {
    score: i64,
    reason: String,
    action: SuggestedAction,
    #[serde(default)]
    deadlines: Vec<String>,
    #[serde(default)]
    asks: Vec<String>,
    #[serde(default)]
    people: Vec<String>,
}

/// Parse the model's JSON reply, tolerating markdown code fences and
/// clamping the score into 0..=100.
pub fn parse_score_response(content: &str) -> InboxdResult<ScoreOutcome> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let raw: RawScore = serde_json::from_str(trimmed).map_err(|e| {
        raise_error!(
            format!("Unparseable scorer reply: {:#?}", e),
            ErrorCode::ScorerResponseInvalid
        )
    })?;
    Ok(ScoreOutcome {
        score: raw.score.clamp(0, 100) as u8,
        reason: raw.reason,
        action: raw.action,
        extracted: ExtractedFacts {
            deadlines: raw.deadlines,
            asks: raw.asks,
            people: raw.people,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_reply() {
        let outcome = parse_score_response(
            r#"{"score": 85, "reason": "boss asks for numbers", "action": "reply",
                "deadlines": ["friday"], "asks": ["send report"], "people": ["Bob"]}"#,
        )
        .unwrap();
        assert_eq!(outcome.score, 85);
        assert_eq!(outcome.action, SuggestedAction::Reply);
        assert_eq!(outcome.extracted.deadlines, vec!["friday"]);
    }

    #[test]
    fn strips_code_fences_and_clamps_score() {
        let outcome = parse_score_response(
            "```json\n{\"score\": 250, \"reason\": \"x\", \"action\": \"ignore\"}\n```",
        )
        .unwrap();
        assert_eq!(outcome.score, 100);
        assert_eq!(outcome.action, SuggestedAction::Ignore);
        assert!(outcome.extracted.asks.is_empty());
    }

    #[test]
    fn rejects_non_json_reply() {
        let err = parse_score_response("I cannot score this email.").unwrap_err();
        assert!(matches!(err.code(), ErrorCode::ScorerResponseInvalid));
    }
}
