// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use itertools::Itertools;
use tracing::{info, warn};

use crate::modules::error::{InboxdError, InboxdResult};
use crate::modules::gmail::client::GmailClient;
use crate::modules::index::batch::{BatchStatus, BatchTrigger, PrioritizationBatch};
use crate::modules::index::content::ThreadContentCache;
use crate::modules::index::deferred::DeferredPrioritization;
use crate::modules::index::thread::ThreadIndexRecord;
use crate::modules::oauth2::token::OAuth2AccessToken;
use crate::modules::prioritize::content::normalize_thread_content;
use crate::modules::prioritize::queue::BatchRunner;
use crate::modules::prioritize::scorer::{ScoreInput, ThreadScorer};
use crate::modules::settings::cli::SETTINGS;

/// What one batch run did.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchSummary {
    pub planned: u32,
    pub processed: u32,
    pub deferred: u32,
    pub skipped_fresh: u32,
}

pub struct PrioritizationWorker {
    scorer: Arc<dyn ThreadScorer>,
}

impl BatchRunner for PrioritizationWorker {
    fn run(
        self: Arc<Self>,
        account_id: u64,
        thread_ids: Vec<String>,
        trigger: BatchTrigger,
    ) -> BoxFuture<'static, InboxdResult<BatchSummary>> {
        Box::pin(async move { self.run_batch(account_id, thread_ids, trigger).await })
    }
}

impl PrioritizationWorker {
    pub fn new(scorer: Arc<dyn ThreadScorer>) -> Self {
        Self { scorer }
    }

    /// Score one batch of candidate threads under the configured guardrails.
    /// Candidates are the requested ids merged with the durable deferred
    /// backlog; anything admitted but not processed lands back in that
    /// backlog, so work survives restarts and partial failures.
    pub async fn run_batch(
        &self,
        account_id: u64,
        thread_ids: Vec<String>,
        trigger: BatchTrigger,
    ) -> InboxdResult<BatchSummary> {
        match OAuth2AccessToken::get(account_id).await? {
            Some(token) if token.usable_for_scoring() => {}
            _ => {
                warn!(account_id, "skipping prioritization batch, credential unusable");
                return Ok(BatchSummary::default());
            }
        }

        let deferred_rows = DeferredPrioritization::list_account(account_id).await?;
        let candidate_ids: Vec<String> = thread_ids
            .into_iter()
            .chain(deferred_rows.into_iter().map(|d| d.thread_id))
            .unique()
            .collect();

        // Ids whose deferred marker can be dropped at the end of the run.
        let mut settled_ids: Vec<String> = Vec::new();
        let mut records = Vec::new();
        for thread_id in &candidate_ids {
            match ThreadIndexRecord::find(account_id, thread_id).await? {
                Some(record) if record.in_primary_inbox => records.push(record),
                // Gone or demoted threads no longer need scoring.
                _ => settled_ids.push(thread_id.clone()),
            }
        }

        let ordered = order_candidates(records);
        let planned = ordered.len() as u32;
        if planned == 0 {
            // No audit row is written for a run that admits no candidates.
            DeferredPrioritization::delete_processed(account_id, &settled_ids).await?;
            return Ok(BatchSummary::default());
        }

        let batch = PrioritizationBatch::start(account_id, trigger, planned).await?;
        info!(
            account_id,
            planned,
            trigger = trigger.as_str(),
            "prioritization batch started"
        );

        let max_threads = SETTINGS.inboxd_max_threads_per_batch;
        let max_total_chars = SETTINGS.inboxd_max_total_chars_per_batch;
        let time_budget = Duration::from_secs(SETTINGS.inboxd_batch_time_budget_secs);
        let started = Instant::now();

        let mut summary = BatchSummary {
            planned,
            ..Default::default()
        };
        let mut total_chars = 0usize;
        let mut to_defer: Vec<String> = Vec::new();
        let mut failure: Option<InboxdError> = None;

        let mut candidates = ordered.into_iter();
        while let Some(record) = candidates.next() {
            if count_budget_exhausted(summary.processed as usize, max_threads)
                || started.elapsed() >= time_budget
            {
                to_defer.push(record.thread_id);
                to_defer.extend(candidates.map(|r| r.thread_id));
                break;
            }

            if is_fresh(&record, &SETTINGS.inboxd_score_version) {
                summary.processed += 1;
                summary.skipped_fresh += 1;
                settled_ids.push(record.thread_id);
                continue;
            }

            let content = match self.thread_content(account_id, &record).await {
                Ok(content) => content,
                Err(e) => {
                    // One thread's fetch failing never sinks the batch.
                    warn!(account_id, thread_id = %record.thread_id, error = %e, "content fetch failed, deferring thread");
                    to_defer.push(record.thread_id);
                    continue;
                }
            };

            let content_chars = content.chars().count();
            if !size_budget_allows(total_chars, content_chars, max_total_chars) {
                to_defer.push(record.thread_id);
                continue;
            }

            let input = ScoreInput {
                thread_id: record.thread_id.clone(),
                subject: record.subject.clone(),
                from: record.from_email.clone().or_else(|| record.from_name.clone()),
                participants: record.participants.clone(),
                unread_count: record.unread_count,
                content,
            };
            // Scoring or persisting a score failing aborts the rest of the
            // loop; bookkeeping and finalization below still run.
            let scored = match self.scorer.score(input).await {
                Ok(outcome) => ThreadIndexRecord::write_score(
                    account_id,
                    &record.thread_id,
                    outcome.score,
                    outcome.reason,
                    outcome.action,
                    Some(outcome.extracted),
                    SETTINGS.inboxd_score_version.clone(),
                )
                .await,
                Err(e) => Err(e),
            };
            match scored {
                Ok(()) => {
                    summary.processed += 1;
                    total_chars += content_chars;
                    settled_ids.push(record.thread_id);
                }
                Err(e) => {
                    failure = Some(e);
                    to_defer.push(record.thread_id);
                    to_defer.extend(candidates.map(|r| r.thread_id));
                    break;
                }
            }
        }

        summary.deferred = to_defer.len() as u32;
        DeferredPrioritization::upsert_many(
            to_defer
                .into_iter()
                .map(|thread_id| DeferredPrioritization::guardrail(account_id, thread_id))
                .collect(),
        )
        .await?;
        DeferredPrioritization::delete_processed(account_id, &settled_ids).await?;

        let status = if failure.is_some() {
            BatchStatus::Failed
        } else {
            BatchStatus::Completed
        };
        batch
            .finalize(
                status,
                summary.processed,
                summary.deferred,
                failure.as_ref().map(|e| e.to_string()),
            )
            .await?;

        match failure {
            Some(e) => {
                warn!(account_id, error = %e, "prioritization batch failed");
                Err(e)
            }
            None => {
                info!(
                    account_id,
                    processed = summary.processed,
                    deferred = summary.deferred,
                    skipped_fresh = summary.skipped_fresh,
                    "prioritization batch finished"
                );
                Ok(summary)
            }
        }
    }

    /// Cached content when the fingerprint still matches, otherwise a fresh
    /// fetch that overwrites the cache.
    async fn thread_content(
        &self,
        account_id: u64,
        record: &ThreadIndexRecord,
    ) -> InboxdResult<String> {
        if let Some(cache) = ThreadContentCache::find(account_id, &record.thread_id).await? {
            if cache.content_version == record.content_version {
                return Ok(cache.content);
            }
        }
        let detail = GmailClient::get_thread_full(account_id, &record.thread_id).await?;
        let content = normalize_thread_content(
            &detail,
            SETTINGS.inboxd_max_messages_per_thread,
            SETTINGS.inboxd_max_chars_per_thread,
        );
        ThreadContentCache::new(
            account_id,
            record.thread_id.clone(),
            record.content_version.clone(),
            content.clone(),
        )
        .save()
        .await?;
        Ok(content)
    }
}

/// Never-scored threads first, then newest activity first, unread threads
/// ahead of read ones on equal dates.
pub fn order_candidates(mut records: Vec<ThreadIndexRecord>) -> Vec<ThreadIndexRecord> {
    records.sort_by_key(|r| {
        (
            r.priority_score.is_some(),
            Reverse(r.last_message_date),
            Reverse(r.unread_count > 0),
        )
    });
    records
}

pub fn count_budget_exhausted(processed: usize, max_threads: usize) -> bool {
    processed >= max_threads
}

pub fn size_budget_allows(total_chars: usize, next_chars: usize, max_total: usize) -> bool {
    total_chars + next_chars <= max_total
}

/// A stored score is still valid when it was computed under the current
/// score version against the record's current content.
pub fn is_fresh(record: &ThreadIndexRecord, score_version: &str) -> bool {
    record.priority_score.is_some()
        && record.last_scored_at.is_some()
        && record.score_version.as_deref() == Some(score_version)
        && record.scored_content_version.as_deref() == Some(record.content_version.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::index::thread::{ExtractedFacts, SuggestedAction};
    use crate::modules::prioritize::scorer::ScoreOutcome;
    use crate::utc_now;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn candidate(thread_id: &str, score: Option<u8>, date: i64, unread: u32) -> ThreadIndexRecord {
        ThreadIndexRecord {
            account_id: 1,
            thread_id: thread_id.into(),
            priority_score: score,
            last_message_date: date,
            unread_count: unread,
            in_primary_inbox: true,
            ..Default::default()
        }
    }

    #[test]
    fn unscored_threads_sort_ahead_of_scored_ones() {
        let ordered = order_candidates(vec![
            candidate("old-scored", Some(50), 1_000, 0),
            candidate("new-unscored", None, 4_000, 0),
            candidate("unread-unscored", None, 3_000, 2),
            candidate("new-scored", Some(10), 5_000, 3),
        ]);
        let ids: Vec<&str> = ordered.iter().map(|r| r.thread_id.as_str()).collect();
        assert!(ids[..2].contains(&"new-unscored"));
        assert!(ids[..2].contains(&"unread-unscored"));
        assert_eq!(ids[2], "new-scored");
        assert_eq!(ids[3], "old-scored");
    }

    #[test]
    fn equal_dates_put_unread_first() {
        let ordered = order_candidates(vec![
            candidate("read", None, 1_000, 0),
            candidate("unread", None, 1_000, 1),
        ]);
        assert_eq!(ordered[0].thread_id, "unread");
    }

    #[test]
    fn size_budget_admits_exact_fit_only() {
        assert!(size_budget_allows(0, 100, 100));
        assert!(!size_budget_allows(100, 10, 100));
        assert!(size_budget_allows(50, 50, 100));
    }

    #[test]
    fn fresh_requires_version_and_content_match() {
        let mut record = candidate("t", Some(40), 1_000, 0);
        record.last_scored_at = Some(utc_now!());
        record.score_version = Some("v1".into());
        record.content_version = "2026:m9".into();
        record.scored_content_version = Some("2026:m9".into());
        assert!(is_fresh(&record, "v1"));
        assert!(!is_fresh(&record, "v2"));

        record.scored_content_version = Some("2025:m8".into());
        assert!(!is_fresh(&record, "v1"));
    }

    struct CountingScorer {
        calls: AtomicUsize,
    }

    impl CountingScorer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ThreadScorer for CountingScorer {
        fn score<'a>(&'a self, _input: ScoreInput) -> BoxFuture<'a, InboxdResult<ScoreOutcome>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {
                Ok(ScoreOutcome {
                    score: 50,
                    reason: "test".into(),
                    action: SuggestedAction::Review,
                    extracted: ExtractedFacts::default(),
                })
            })
        }
    }

    async fn seed_account(account_id: u64) {
        use crate::modules::oauth2::token::{OAuth2AccessToken, GMAIL_READONLY_SCOPE};
        OAuth2AccessToken::new(
            account_id,
            Some("at".into()),
            Some("rt".into()),
            vec![GMAIL_READONLY_SCOPE.into()],
        )
        .save()
        .await
        .unwrap();
    }

    async fn seed_thread(account_id: u64, thread_id: &str, date: i64, content: &str) {
        let record = ThreadIndexRecord {
            account_id,
            thread_id: thread_id.into(),
            subject: Some(format!("subject {}", thread_id)),
            last_message_id: format!("msg-{}", thread_id),
            last_message_date: date,
            in_primary_inbox: true,
            content_version: format!("v:{}", thread_id),
            ..Default::default()
        };
        ThreadIndexRecord::upsert(record).await.unwrap();
        ThreadContentCache::new(
            account_id,
            thread_id.into(),
            format!("v:{}", thread_id),
            content.into(),
        )
        .save()
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn second_run_on_unchanged_index_is_a_no_op() {
        let account_id = 9001;
        seed_account(account_id).await;
        seed_thread(account_id, "ta", 1_000, "hello a").await;
        seed_thread(account_id, "tb", 2_000, "hello b").await;

        let scorer = CountingScorer::new();
        let worker = PrioritizationWorker::new(scorer.clone());
        let ids = vec!["ta".to_string(), "tb".to_string()];

        let first = worker
            .run_batch(account_id, ids.clone(), BatchTrigger::InitialSync)
            .await
            .unwrap();
        assert_eq!(first.processed, 2);
        assert_eq!(first.skipped_fresh, 0);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 2);

        let second = worker
            .run_batch(account_id, ids, BatchTrigger::HistoryDelta)
            .await
            .unwrap();
        assert_eq!(second.processed, 2);
        assert_eq!(second.skipped_fresh, 2);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oversized_batch_defers_the_overflow() {
        let account_id = 9002;
        seed_account(account_id).await;
        let max = SETTINGS.inboxd_max_threads_per_batch;
        let mut ids = Vec::new();
        for i in 0..=max {
            let thread_id = format!("t{}", i);
            seed_thread(account_id, &thread_id, i as i64, "x").await;
            ids.push(thread_id);
        }

        let worker = PrioritizationWorker::new(CountingScorer::new());
        let summary = worker
            .run_batch(account_id, ids, BatchTrigger::InitialSync)
            .await
            .unwrap();
        assert_eq!(summary.processed as usize, max);
        assert_eq!(summary.deferred, 1);
        assert_eq!(
            DeferredPrioritization::count_account(account_id)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn first_candidate_can_consume_the_whole_size_budget() {
        let account_id = 9003;
        seed_account(account_id).await;
        let max_total = SETTINGS.inboxd_max_total_chars_per_batch;
        // Newer date, so the big thread is admitted first.
        seed_thread(account_id, "big", 2_000, &"x".repeat(max_total)).await;
        seed_thread(account_id, "small", 1_000, "tiny").await;

        let scorer = CountingScorer::new();
        let worker = PrioritizationWorker::new(scorer.clone());
        let summary = worker
            .run_batch(
                account_id,
                vec!["big".into(), "small".into()],
                BatchTrigger::HistoryDelta,
            )
            .await
            .unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.deferred, 1);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
        assert!(ThreadIndexRecord::find(account_id, "big")
            .await
            .unwrap()
            .unwrap()
            .priority_score
            .is_some());
        assert!(ThreadIndexRecord::find(account_id, "small")
            .await
            .unwrap()
            .unwrap()
            .priority_score
            .is_none());
    }

    #[tokio::test]
    async fn fetch_failure_defers_only_the_failing_thread() {
        let account_id = 9005;
        seed_account(account_id).await;
        // Stale cache forces a remote fetch, which has nowhere to go here.
        seed_thread(account_id, "bad", 2_000, "old text").await;
        ThreadContentCache::new(account_id, "bad".into(), "stale".into(), "old text".into())
            .save()
            .await
            .unwrap();
        seed_thread(account_id, "good", 1_000, "hello").await;

        let scorer = CountingScorer::new();
        let worker = PrioritizationWorker::new(scorer.clone());
        let summary = worker
            .run_batch(
                account_id,
                vec!["bad".into(), "good".into()],
                BatchTrigger::HistoryDelta,
            )
            .await
            .unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.deferred, 1);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
        assert!(ThreadIndexRecord::find(account_id, "good")
            .await
            .unwrap()
            .unwrap()
            .priority_score
            .is_some());
        let deferred = DeferredPrioritization::list_account(account_id).await.unwrap();
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].thread_id, "bad");
    }

    struct VanishingScorer {
        account_id: u64,
        target: String,
    }

    impl ThreadScorer for VanishingScorer {
        fn score<'a>(&'a self, input: ScoreInput) -> BoxFuture<'a, InboxdResult<ScoreOutcome>> {
            Box::pin(async move {
                if input.thread_id == self.target {
                    delete_thread_record(self.account_id, &input.thread_id).await;
                }
                Ok(ScoreOutcome {
                    score: 50,
                    reason: "test".into(),
                    action: SuggestedAction::Review,
                    extracted: ExtractedFacts::default(),
                })
            })
        }
    }

    async fn delete_thread_record(account_id: u64, thread_id: &str) {
        use crate::modules::database::{batch_delete_impl, manager::DB_MANAGER};
        use crate::modules::error::code::ErrorCode;
        let pk = crate::modules::index::thread::record_pk(account_id, thread_id);
        batch_delete_impl::<ThreadIndexRecord>(DB_MANAGER.index_db(), move |rw| {
            let record = rw
                .get()
                .primary::<ThreadIndexRecord>(pk)
                .map_err(|e| crate::raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
            Ok(record.into_iter().collect())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn score_write_failure_still_finalizes_the_batch() {
        use crate::modules::database::{filter_by_secondary_key_impl, manager::DB_MANAGER};
        use crate::modules::index::batch::{PrioritizationBatch, PrioritizationBatchKey};

        let account_id = 9006;
        seed_account(account_id).await;
        seed_thread(account_id, "vanish", 2_000, "hello v").await;
        seed_thread(account_id, "later", 1_000, "hello l").await;

        // The record disappears between scoring and the score write.
        let worker = PrioritizationWorker::new(Arc::new(VanishingScorer {
            account_id,
            target: "vanish".into(),
        }));
        let result = worker
            .run_batch(
                account_id,
                vec!["vanish".into(), "later".into()],
                BatchTrigger::HistoryDelta,
            )
            .await;
        assert!(result.is_err());

        let deferred = DeferredPrioritization::list_account(account_id).await.unwrap();
        let mut deferred_ids: Vec<&str> =
            deferred.iter().map(|d| d.thread_id.as_str()).collect();
        deferred_ids.sort();
        assert_eq!(deferred_ids, vec!["later", "vanish"]);

        let batches: Vec<PrioritizationBatch> = filter_by_secondary_key_impl(
            DB_MANAGER.index_db(),
            PrioritizationBatchKey::account_id,
            account_id,
        )
        .await
        .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].status, BatchStatus::Failed);
        assert_eq!(batches[0].processed, 0);
        assert_eq!(batches[0].deferred, 2);
        assert!(batches[0].finished_at.is_some());
        assert!(batches[0].error.is_some());
    }

    #[tokio::test]
    async fn unusable_credential_skips_the_batch() {
        let account_id = 9004;
        seed_thread(account_id, "ta", 1_000, "hello").await;

        let scorer = CountingScorer::new();
        let worker = PrioritizationWorker::new(scorer.clone());
        let summary = worker
            .run_batch(account_id, vec!["ta".into()], BatchTrigger::HistoryDelta)
            .await
            .unwrap();
        assert_eq!(summary, BatchSummary::default());
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }
}
