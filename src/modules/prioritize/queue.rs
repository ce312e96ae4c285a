// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use ahash::AHashSet;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::modules::error::InboxdResult;
use crate::modules::index::batch::BatchTrigger;
use crate::modules::index::deferred::DeferredPrioritization;
use crate::modules::prioritize::worker::BatchSummary;
use crate::modules::settings::cli::SETTINGS;

static QUEUE: OnceLock<Arc<PrioritizationQueue>> = OnceLock::new();

/// Executes one prioritization batch. Split out so the scheduler can be
/// driven by a stub in tests.
pub trait BatchRunner: Send + Sync + 'static {
    fn run(
        self: Arc<Self>,
        account_id: u64,
        thread_ids: Vec<String>,
        trigger: BatchTrigger,
    ) -> BoxFuture<'static, InboxdResult<BatchSummary>>;
}

struct PendingBatch {
    thread_ids: AHashSet<String>,
    trigger: BatchTrigger,
}

struct QueueInner {
    runner: Arc<dyn BatchRunner>,
    debounce_ms: u64,
    followup_delay_ms: u64,
    /// Accounts with an armed debounce timer; new ids merge into the entry
    /// without resetting the timer.
    pending: DashMap<u64, PendingBatch>,
    /// Accounts with a batch in flight. Membership here, not a lock, is what
    /// keeps batches per-account exclusive.
    running: DashSet<u64>,
    /// Accounts with a follow-up drain already scheduled.
    followups: DashSet<u64>,
}

/// Debounces per-account bursts of thread-change events into single batch
/// runs, keeps at most one batch running per account, and drains the durable
/// deferred backlog with delayed follow-up runs.
pub struct PrioritizationQueue {
    inner: Arc<QueueInner>,
}

impl PrioritizationQueue {
    pub fn initialize(runner: Arc<dyn BatchRunner>) {
        let queue = Arc::new(PrioritizationQueue::new(
            runner,
            SETTINGS.inboxd_debounce_ms,
            SETTINGS.inboxd_followup_delay_ms,
        ));
        if QUEUE.set(queue).is_err() {
            warn!("prioritization queue initialized twice");
        }
    }

    pub fn get() -> Option<Arc<PrioritizationQueue>> {
        QUEUE.get().cloned()
    }

    pub fn new(runner: Arc<dyn BatchRunner>, debounce_ms: u64, followup_delay_ms: u64) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                runner,
                debounce_ms,
                followup_delay_ms,
                pending: DashMap::new(),
                running: DashSet::new(),
                followups: DashSet::new(),
            }),
        }
    }

    /// Fire-and-forget: record the changed threads and arm the debounce
    /// timer if none is armed yet. Nothing changed means nothing to do;
    /// deferred-backlog drains go through `enqueue_deferred` instead.
    pub fn enqueue(&self, account_id: u64, thread_ids: Vec<String>, trigger: BatchTrigger) {
        if thread_ids.is_empty() {
            return;
        }
        self.enqueue_with_delay(account_id, thread_ids, trigger, self.inner.debounce_ms);
    }

    /// Kick a drain cycle purely off the deferred backlog, no new ids.
    pub fn enqueue_deferred(&self, account_id: u64, trigger: BatchTrigger, delay_ms: u64) {
        self.enqueue_with_delay(account_id, Vec::new(), trigger, delay_ms);
    }

    fn enqueue_with_delay(
        &self,
        account_id: u64,
        thread_ids: Vec<String>,
        trigger: BatchTrigger,
        delay_ms: u64,
    ) {
        let mut armed = false;
        match self.inner.pending.entry(account_id) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().thread_ids.extend(thread_ids);
            }
            Entry::Vacant(entry) => {
                entry.insert(PendingBatch {
                    thread_ids: thread_ids.into_iter().collect(),
                    trigger,
                });
                armed = true;
            }
        }
        if armed {
            arm_timer(self.inner.clone(), account_id, delay_ms);
        }
    }
}

fn arm_timer(inner: Arc<QueueInner>, account_id: u64, delay_ms: u64) {
    tokio::spawn(async move {
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        flush(inner, account_id).await;
    });
}

async fn flush(inner: Arc<QueueInner>, account_id: u64) {
    let Some((_, pending)) = inner.pending.remove(&account_id) else {
        return;
    };
    if !inner.running.insert(account_id) {
        // A batch for this account is in flight. Put the ids back and try
        // again after another debounce window.
        debug!(account_id, "batch already running, re-scheduling");
        match inner.pending.entry(account_id) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().thread_ids.extend(pending.thread_ids);
            }
            Entry::Vacant(entry) => {
                entry.insert(pending);
                arm_timer(inner.clone(), account_id, inner.debounce_ms);
            }
        }
        return;
    }

    let result = inner
        .runner
        .clone()
        .run(
            account_id,
            pending.thread_ids.into_iter().collect(),
            pending.trigger,
        )
        .await;
    inner.running.remove(&account_id);
    if let Err(e) = result {
        warn!(account_id, error = %e, "prioritization batch run failed");
    }

    schedule_followup(inner, account_id).await;
}

/// Arm one delayed drain run when deferred rows remain for the account. The
/// durable table, not the in-memory queue, decides whether more work exists.
async fn schedule_followup(inner: Arc<QueueInner>, account_id: u64) {
    let backlog = match DeferredPrioritization::count_account(account_id).await {
        Ok(count) => count,
        Err(e) => {
            warn!(account_id, error = %e, "failed to read deferred backlog");
            return;
        }
    };
    if backlog == 0 || !inner.followups.insert(account_id) {
        return;
    }
    debug!(account_id, backlog, "scheduling deferred follow-up");
    let delay = inner.followup_delay_ms;
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        inner.followups.remove(&account_id);
        if let Some(queue) = PrioritizationQueue::get() {
            queue.enqueue_deferred(account_id, BatchTrigger::HistoryDelta, 0);
        } else {
            flush_deferred_fallback(inner, account_id);
        }
    });
}

// Test queues are never installed in the global slot; route the follow-up
// through the same inner state instead.
fn flush_deferred_fallback(inner: Arc<QueueInner>, account_id: u64) {
    let mut armed = false;
    match inner.pending.entry(account_id) {
        Entry::Occupied(_) => {}
        Entry::Vacant(entry) => {
            entry.insert(PendingBatch {
                thread_ids: AHashSet::new(),
                trigger: BatchTrigger::HistoryDelta,
            });
            armed = true;
        }
    }
    if armed {
        arm_timer(inner, account_id, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingRunner {
        calls: Mutex<Vec<(u64, Vec<String>, BatchTrigger)>>,
        delay_ms: u64,
    }

    impl RecordingRunner {
        fn new(delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                delay_ms,
            })
        }

        fn calls(&self) -> Vec<(u64, Vec<String>, BatchTrigger)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl BatchRunner for RecordingRunner {
        fn run(
            self: Arc<Self>,
            account_id: u64,
            mut thread_ids: Vec<String>,
            trigger: BatchTrigger,
        ) -> BoxFuture<'static, InboxdResult<BatchSummary>> {
            Box::pin(async move {
                if self.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
                }
                thread_ids.sort();
                self.calls.lock().unwrap().push((account_id, thread_ids, trigger));
                Ok(BatchSummary::default())
            })
        }
    }

    #[tokio::test]
    async fn burst_of_events_coalesces_into_one_run() {
        let runner = RecordingRunner::new(0);
        let queue = PrioritizationQueue::new(runner.clone(), 50, 10_000);

        queue.enqueue(7, vec!["a".into()], BatchTrigger::HistoryDelta);
        queue.enqueue(7, vec!["b".into(), "a".into()], BatchTrigger::HistoryDelta);
        queue.enqueue(7, vec!["c".into()], BatchTrigger::HistoryDelta);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, 7);
        assert_eq!(calls[0].1, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn enqueue_during_run_waits_for_the_running_batch() {
        // Runner slow enough that the second flush fires mid-run.
        let runner = RecordingRunner::new(150);
        let queue = PrioritizationQueue::new(runner.clone(), 20, 10_000);

        queue.enqueue(8, vec!["a".into()], BatchTrigger::HistoryDelta);
        tokio::time::sleep(Duration::from_millis(60)).await;
        // First batch is running now.
        queue.enqueue(8, vec!["b".into()], BatchTrigger::HistoryDelta);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(runner.calls().len(), 1);

        tokio::time::sleep(Duration::from_millis(400)).await;
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].1, vec!["b"]);
    }

    #[tokio::test]
    async fn empty_enqueue_is_a_no_op() {
        let runner = RecordingRunner::new(0);
        let queue = PrioritizationQueue::new(runner.clone(), 20, 10_000);

        queue.enqueue(9, Vec::new(), BatchTrigger::InitialSync);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(runner.calls().is_empty());

        // The deferred kick stays allowed with no ids.
        queue.enqueue_deferred(9, BatchTrigger::HistoryDelta, 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runner.calls().len(), 1);
        assert!(runner.calls()[0].1.is_empty());
    }

    #[tokio::test]
    async fn accounts_are_debounced_independently() {
        let runner = RecordingRunner::new(0);
        let queue = PrioritizationQueue::new(runner.clone(), 30, 10_000);

        queue.enqueue(1, vec!["a".into()], BatchTrigger::InitialSync);
        queue.enqueue(2, vec!["b".into()], BatchTrigger::HistoryDelta);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        let accounts: Vec<u64> = calls.iter().map(|c| c.0).collect();
        assert!(accounts.contains(&1));
        assert!(accounts.contains(&2));
    }
}
