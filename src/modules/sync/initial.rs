// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use ahash::AHashSet;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::modules::account::Account;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::InboxdResult;
use crate::modules::gmail::client::GmailClient;
use crate::modules::index::batch::BatchTrigger;
use crate::modules::index::thread::ThreadIndexRecord;
use crate::modules::prioritize::queue::PrioritizationQueue;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::sync::metadata::extract_thread_metadata;
use crate::modules::sync::{SyncMode, SyncOutcome};
use crate::raise_error;

const LIST_PAGE_SIZE: u32 = 100;

/// Rebuild the primary-inbox view from a bounded listing. Runs when no
/// incremental baseline exists, and as the fallback when the change-log
/// cursor has expired.
pub(crate) async fn initial_sync(account: &Account) -> InboxdResult<SyncOutcome> {
    let query = primary_inbox_query(Utc::now(), SETTINGS.inboxd_lookback_days);
    let cap = SETTINGS.inboxd_initial_sync_max_threads;
    info!(account_id = account.id, %query, cap, "starting initial sync");

    let mut thread_ids: Vec<String> = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page =
            GmailClient::list_threads(account.id, &query, page_token.as_deref(), LIST_PAGE_SIZE)
                .await?;
        for entry in page.threads.unwrap_or_default() {
            if thread_ids.len() >= cap {
                break;
            }
            thread_ids.push(entry.id);
        }
        if thread_ids.len() >= cap {
            break;
        }
        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    let fetched = thread_ids.len();
    let semaphore = Arc::new(Semaphore::new(SETTINGS.inboxd_metadata_concurrency));
    let mut handles = Vec::with_capacity(thread_ids.len());
    for thread_id in thread_ids {
        let semaphore = semaphore.clone();
        let account_id = account.id;
        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
            let detail = GmailClient::get_thread_metadata(account_id, &thread_id).await?;
            match extract_thread_metadata(&detail) {
                Some(meta) => {
                    // The listing query already scoped to the primary tab.
                    ThreadIndexRecord::upsert_from_sync(account_id, &meta, true).await?;
                    Ok::<Option<String>, crate::modules::error::InboxdError>(Some(meta.thread_id))
                }
                None => Ok(None),
            }
        }));
    }

    let mut indexed: AHashSet<String> = AHashSet::new();
    for handle in handles {
        match handle
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
        {
            Ok(Some(thread_id)) => {
                indexed.insert(thread_id);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(account_id = account.id, error = %e, "thread fetch failed during initial sync");
            }
        }
    }

    let updated = indexed.len();
    let removed = ThreadIndexRecord::demote_missing(account.id, indexed.clone()).await?;

    let profile = GmailClient::get_profile(account.id).await?;
    let history_cursor = profile.history_id;
    Account::record_sync(account.id, history_cursor.clone(), true).await?;

    let affected_thread_ids: Vec<String> = indexed.into_iter().collect();
    if let Some(queue) = PrioritizationQueue::get() {
        queue.enqueue(
            account.id,
            affected_thread_ids.clone(),
            BatchTrigger::InitialSync,
        );
    }

    info!(
        account_id = account.id,
        fetched, updated, removed, cursor = %history_cursor,
        "initial sync finished"
    );
    Ok(SyncOutcome {
        mode: SyncMode::Initial,
        fetched,
        updated,
        removed,
        affected_thread_ids,
        history_cursor,
    })
}

/// Gmail search query scoping the rebuild to recent primary-tab mail.
pub fn primary_inbox_query(now: DateTime<Utc>, lookback_days: u32) -> String {
    let after = now - Duration::days(lookback_days as i64);
    format!(
        "in:inbox category:primary -in:chats after:{}",
        after.format("%Y/%m/%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn query_applies_lookback_window() {
        let now = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap();
        assert_eq!(
            primary_inbox_query(now, 30),
            "in:inbox category:primary -in:chats after:2026/07/30"
        );
    }
}
