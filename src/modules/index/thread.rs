// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use ahash::AHashSet;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

use crate::{
    modules::{
        database::{
            async_find_impl, batch_update_impl, filter_by_secondary_key_impl, manager::DB_MANAGER,
            update_impl, upsert_impl,
        },
        error::{code::ErrorCode, InboxdResult},
        sync::metadata::ThreadMetadata,
    },
    raise_error, utc_now,
};

/// Action the scorer suggests for a thread.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedAction {
    Reply,
    Review,
    Schedule,
    Task,
    Ignore,
}

/// Structured facts pulled out of the thread content by the scorer.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct ExtractedFacts {
    #[serde(default)]
    pub deadlines: Vec<String>,
    #[serde(default)]
    pub asks: Vec<String>,
    #[serde(default)]
    pub people: Vec<String>,
}

/// The local materialized view of one Gmail thread, unique per
/// (account, thread). Identity and descriptive fields are owned by the sync
/// engine and overwritten wholesale on every sync touch; the scoring fields
/// are written only by the prioritization worker.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[native_model(id = 3, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct ThreadIndexRecord {
    #[secondary_key]
    pub account_id: u64,
    pub thread_id: String,
    pub subject: Option<String>,
    /// Union of From/To/Cc addresses across all messages in the thread.
    pub participants: Vec<String>,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub snippet: Option<String>,
    /// Gmail message id of the newest message in the thread.
    pub last_message_id: String,
    /// `internalDate` of the newest message, epoch milliseconds.
    pub last_message_date: i64,
    pub unread_count: u32,
    pub label_ids: Vec<String>,
    pub in_primary_inbox: bool,
    /// Fingerprint of the newest message, `"<rfc3339>:<message_id>"`. Any
    /// write that moves `last_message_id` or `last_message_date` recomputes
    /// this in the same write.
    pub content_version: String,
    pub priority_score: Option<u8>,
    pub priority_reason: Option<String>,
    pub suggested_action: Option<SuggestedAction>,
    pub extracted: Option<ExtractedFacts>,
    pub last_scored_at: Option<i64>,
    pub score_version: Option<String>,
    /// `content_version` at the time the stored score was computed.
    pub scored_content_version: Option<String>,
    /// Informational snapshot of the thread's `historyId` at last sync.
    pub last_history_id_seen: Option<String>,
}

impl ThreadIndexRecord {
    pub fn pk(&self) -> String {
        record_pk(self.account_id, &self.thread_id)
    }

    pub async fn find(account_id: u64, thread_id: &str) -> InboxdResult<Option<ThreadIndexRecord>> {
        async_find_impl(DB_MANAGER.index_db(), record_pk(account_id, thread_id)).await
    }

    pub async fn upsert(record: ThreadIndexRecord) -> InboxdResult<()> {
        upsert_impl(DB_MANAGER.index_db(), record).await
    }

    pub async fn list_account(account_id: u64) -> InboxdResult<Vec<ThreadIndexRecord>> {
        filter_by_secondary_key_impl(
            DB_MANAGER.index_db(),
            ThreadIndexRecordKey::account_id,
            account_id,
        )
        .await
    }

    pub async fn count_account(account_id: u64) -> InboxdResult<usize> {
        Ok(Self::list_account(account_id).await?.len())
    }

    /// Write freshly synced metadata, carrying the scoring fields over from
    /// any existing row. Returns the previous `in_primary_inbox` value, or
    /// `None` when the thread was not indexed before.
    pub async fn upsert_from_sync(
        account_id: u64,
        meta: &ThreadMetadata,
        in_primary_inbox: bool,
    ) -> InboxdResult<Option<bool>> {
        let previous = Self::find(account_id, &meta.thread_id).await?;
        let was_primary = previous.as_ref().map(|r| r.in_primary_inbox);
        let mut record = ThreadIndexRecord {
            account_id,
            thread_id: meta.thread_id.clone(),
            subject: meta.subject.clone(),
            participants: meta.participants.clone(),
            from_name: meta.from_name.clone(),
            from_email: meta.from_email.clone(),
            snippet: meta.snippet.clone(),
            last_message_id: meta.last_message_id.clone(),
            last_message_date: meta.last_message_date,
            unread_count: meta.unread_count,
            label_ids: meta.label_ids.clone(),
            in_primary_inbox,
            content_version: meta.content_version.clone(),
            last_history_id_seen: meta.history_id.clone(),
            ..Default::default()
        };
        if let Some(previous) = previous {
            record.priority_score = previous.priority_score;
            record.priority_reason = previous.priority_reason;
            record.suggested_action = previous.suggested_action;
            record.extracted = previous.extracted;
            record.last_scored_at = previous.last_scored_at;
            record.score_version = previous.score_version;
            record.scored_content_version = previous.scored_content_version;
        }
        Self::upsert(record).await?;
        Ok(was_primary)
    }

    /// Reconcile after an initial sync page-walk: every row still flagged as
    /// primary whose thread id was not seen remotely leaves the primary set.
    /// Returns how many rows were flipped.
    pub async fn demote_missing(
        account_id: u64,
        fetched_ids: AHashSet<String>,
    ) -> InboxdResult<usize> {
        let targets = batch_update_impl(
            DB_MANAGER.index_db(),
            move |rw| {
                let records: Vec<ThreadIndexRecord> = rw
                    .scan()
                    .secondary::<ThreadIndexRecord>(ThreadIndexRecordKey::account_id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .start_with(account_id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .filter_map(Result::ok)
                    .filter(|r: &ThreadIndexRecord| {
                        r.in_primary_inbox && !fetched_ids.contains(&r.thread_id)
                    })
                    .collect();
                Ok(records)
            },
            |targets| {
                Ok(targets
                    .iter()
                    .map(|old| {
                        let mut updated = old.clone();
                        updated.in_primary_inbox = false;
                        (old.clone(), updated)
                    })
                    .collect())
            },
        )
        .await?;
        Ok(targets.len())
    }

    /// Persist one scoring result. The score, its version tag, and the
    /// content version it was computed against land in a single update.
    pub async fn write_score(
        account_id: u64,
        thread_id: &str,
        score: u8,
        reason: String,
        action: SuggestedAction,
        extracted: Option<ExtractedFacts>,
        score_version: String,
    ) -> InboxdResult<()> {
        let pk = record_pk(account_id, thread_id);
        update_impl(
            DB_MANAGER.index_db(),
            move |rw| {
                rw.get()
                    .primary::<ThreadIndexRecord>(pk)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            "thread index record missing during score write".into(),
                            ErrorCode::InternalError
                        )
                    })
            },
            move |current| {
                let mut updated = current.clone();
                updated.priority_score = Some(score);
                updated.priority_reason = Some(reason);
                updated.suggested_action = Some(action);
                updated.extracted = extracted;
                updated.last_scored_at = Some(utc_now!());
                updated.score_version = Some(score_version);
                updated.scored_content_version = Some(current.content_version.clone());
                Ok(updated)
            },
        )
        .await?;
        Ok(())
    }
}

pub fn record_pk(account_id: u64, thread_id: &str) -> String {
    format!("{}_{}", account_id, thread_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(account_id: u64, thread_id: &str, in_primary_inbox: bool) {
        ThreadIndexRecord::upsert(ThreadIndexRecord {
            account_id,
            thread_id: thread_id.into(),
            in_primary_inbox,
            ..Default::default()
        })
        .await
        .unwrap();
    }

    async fn is_primary(account_id: u64, thread_id: &str) -> bool {
        ThreadIndexRecord::find(account_id, thread_id)
            .await
            .unwrap()
            .unwrap()
            .in_primary_inbox
    }

    #[tokio::test]
    async fn demote_missing_flips_exactly_the_unfetched_primary_rows() {
        let account_id = 7001;
        seed(account_id, "a", true).await;
        seed(account_id, "b", true).await;
        seed(account_id, "c", true).await;
        // Already out of the primary set; must not be counted again.
        seed(account_id, "d", false).await;

        let fetched: AHashSet<String> = ["a".to_string()].into_iter().collect();
        let flipped = ThreadIndexRecord::demote_missing(account_id, fetched)
            .await
            .unwrap();
        assert_eq!(flipped, 2);

        assert!(is_primary(account_id, "a").await);
        assert!(!is_primary(account_id, "b").await);
        assert!(!is_primary(account_id, "c").await);
        assert!(!is_primary(account_id, "d").await);

        // A second reconcile with the same fetched set has nothing to flip.
        let fetched: AHashSet<String> = ["a".to_string()].into_iter().collect();
        let flipped = ThreadIndexRecord::demote_missing(account_id, fetched)
            .await
            .unwrap();
        assert_eq!(flipped, 0);
    }
}
