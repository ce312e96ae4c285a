// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use itertools::Itertools;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::modules::account::Account;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::{InboxdError, InboxdResult};
use crate::modules::gmail::client::GmailClient;
use crate::modules::gmail::model::history::HistoryList;
use crate::modules::index::batch::BatchTrigger;
use crate::modules::index::thread::ThreadIndexRecord;
use crate::modules::prioritize::queue::PrioritizationQueue;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::sync::metadata::extract_thread_metadata;
use crate::modules::sync::{initial, max_history_id, SyncMode, SyncOutcome};
use crate::raise_error;

/// What the refetch of one affected thread concluded.
enum ThreadRefresh {
    /// Row rewritten; `left_primary` when the thread dropped out of the
    /// primary set with this change.
    Updated { left_primary: bool },
    /// Gmail no longer has the thread.
    Gone { left_primary: bool },
}

/// Apply the change log accumulated since the stored cursor. Falls back to a
/// full rebuild when Gmail reports the cursor as expired.
pub(crate) async fn incremental_sync(account: &Account) -> InboxdResult<SyncOutcome> {
    let cursor = account.history_cursor.clone().ok_or_else(|| {
        raise_error!(
            format!("Account {} has no history cursor", account.id),
            ErrorCode::InternalError
        )
    })?;

    let mut pages: Vec<HistoryList> = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = match GmailClient::list_history(
            account.id,
            &cursor,
            page_token.as_deref(),
            SETTINGS.inboxd_history_page_size,
        )
        .await
        {
            Ok(page) => page,
            Err(e) if matches!(e.code(), ErrorCode::GmailApiInvalidHistoryId) => {
                warn!(
                    account_id = account.id,
                    %cursor,
                    "history cursor expired, rebuilding index"
                );
                return initial::initial_sync(account).await;
            }
            Err(e) => return Err(e),
        };
        let next = page.next_page_token.clone();
        pages.push(page);
        match next {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    let affected = collect_affected_thread_ids(&pages);
    let fetched = affected.len();

    let semaphore = Arc::new(Semaphore::new(SETTINGS.inboxd_metadata_concurrency));
    let mut handles = Vec::with_capacity(affected.len());
    for thread_id in affected.clone() {
        let semaphore = semaphore.clone();
        let account_id = account.id;
        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
            refresh_thread(account_id, &thread_id).await
        }));
    }

    let mut updated = 0usize;
    let mut removed = 0usize;
    for handle in handles {
        match handle
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
        {
            Ok(ThreadRefresh::Updated { left_primary }) => {
                updated += 1;
                if left_primary {
                    removed += 1;
                }
            }
            Ok(ThreadRefresh::Gone { left_primary }) => {
                if left_primary {
                    removed += 1;
                }
            }
            Err(e) => {
                warn!(account_id = account.id, error = %e, "thread refresh failed during incremental sync");
            }
        }
    }

    let history_cursor =
        max_history_id(pages.iter().map(|p| p.history_id.as_str())).unwrap_or(cursor);
    Account::record_sync(account.id, history_cursor.clone(), false).await?;

    if !affected.is_empty() {
        if let Some(queue) = PrioritizationQueue::get() {
            queue.enqueue(account.id, affected.clone(), BatchTrigger::HistoryDelta);
        }
    }

    info!(
        account_id = account.id,
        fetched, updated, removed, cursor = %history_cursor,
        "incremental sync finished"
    );
    Ok(SyncOutcome {
        mode: SyncMode::Incremental,
        fetched,
        updated,
        removed,
        affected_thread_ids: affected,
        history_cursor,
    })
}

async fn refresh_thread(account_id: u64, thread_id: &str) -> Result<ThreadRefresh, InboxdError> {
    let detail = match GmailClient::get_thread_metadata(account_id, thread_id).await {
        Ok(detail) => detail,
        Err(e) if matches!(e.code(), ErrorCode::ResourceNotFound) => {
            return Ok(ThreadRefresh::Gone {
                left_primary: demote_gone_thread(account_id, thread_id).await?,
            });
        }
        Err(e) => return Err(e),
    };
    let meta = match extract_thread_metadata(&detail) {
        Some(meta) => meta,
        None => {
            return Ok(ThreadRefresh::Gone {
                left_primary: demote_gone_thread(account_id, thread_id).await?,
            });
        }
    };
    let now_primary = meta.in_primary_inbox();
    let was_primary = ThreadIndexRecord::upsert_from_sync(account_id, &meta, now_primary).await?;
    Ok(ThreadRefresh::Updated {
        left_primary: was_primary == Some(true) && !now_primary,
    })
}

async fn demote_gone_thread(account_id: u64, thread_id: &str) -> InboxdResult<bool> {
    match ThreadIndexRecord::find(account_id, thread_id).await? {
        Some(record) if record.in_primary_inbox => {
            let mut updated = record;
            updated.in_primary_inbox = false;
            ThreadIndexRecord::upsert(updated).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Union of the thread ids named anywhere in the change log. Every record
/// source contributes; a thread touched by several records appears once.
pub fn collect_affected_thread_ids(pages: &[HistoryList]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|page| page.history.iter())
        .flat_map(|record| {
            record
                .messages
                .iter()
                .map(|m| m.thread_id.clone())
                .chain(record.messages_added.iter().map(|m| m.message.thread_id.clone()))
                .chain(record.messages_deleted.iter().map(|m| m.message.thread_id.clone()))
                .chain(record.labels_added.iter().map(|l| l.message.thread_id.clone()))
                .chain(record.labels_removed.iter().map(|l| l.message.thread_id.clone()))
        })
        .unique()
        .sorted()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::gmail::model::history::{
        History, LabelMessageObject, MessageIndex, MessageObject,
    };

    fn index(thread_id: &str) -> MessageIndex {
        MessageIndex {
            id: format!("m-{}", thread_id),
            label_ids: vec![],
            thread_id: thread_id.into(),
        }
    }

    #[test]
    fn unions_thread_ids_across_all_record_sources() {
        let pages = vec![HistoryList {
            history: vec![
                History {
                    id: "1".into(),
                    messages: vec![index("a")],
                    messages_added: vec![MessageObject { message: index("b") }],
                    ..Default::default()
                },
                History {
                    id: "2".into(),
                    messages_deleted: vec![MessageObject { message: index("c") }],
                    labels_added: vec![LabelMessageObject {
                        label_ids: Some(vec!["INBOX".into()]),
                        message: index("d"),
                    }],
                    labels_removed: vec![LabelMessageObject {
                        label_ids: Some(vec!["INBOX".into()]),
                        message: index("e"),
                    }],
                    ..Default::default()
                },
                History {
                    id: "3".into(),
                    messages: vec![index("a"), index("b")],
                    ..Default::default()
                },
            ],
            history_id: "3".into(),
            next_page_token: None,
        }];
        assert_eq!(
            collect_affected_thread_ids(&pages),
            vec!["a", "b", "c", "d", "e"]
        );
    }

    #[test]
    fn empty_change_log_yields_no_ids() {
        assert!(collect_affected_thread_ids(&[]).is_empty());
        assert!(collect_affected_thread_ids(&[HistoryList::default()]).is_empty());
    }
}
