// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::Account;
use crate::modules::error::InboxdResult;
use crate::modules::index::thread::ThreadIndexRecord;

pub mod history;
pub mod initial;
pub mod metadata;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncMode {
    Initial,
    Incremental,
}

/// What one sync pass did, for logging and for the scheduler.
#[derive(Clone, Debug)]
pub struct SyncOutcome {
    pub mode: SyncMode,
    /// Threads listed or named by history records.
    pub fetched: usize,
    /// Index rows written.
    pub updated: usize,
    /// Rows that left the primary set.
    pub removed: usize,
    pub affected_thread_ids: Vec<String>,
    pub history_cursor: String,
}

/// Run one sync pass for an account, picking the mode from local state.
pub async fn sync_primary_inbox(account_id: u64) -> InboxdResult<SyncOutcome> {
    let account = Account::get(account_id).await?;
    match determine_sync_mode(&account).await? {
        SyncMode::Initial => initial::initial_sync(&account).await,
        SyncMode::Incremental => history::incremental_sync(&account).await,
    }
}

async fn determine_sync_mode(account: &Account) -> InboxdResult<SyncMode> {
    let local_rows = ThreadIndexRecord::count_account(account.id).await?;
    Ok(select_mode(account.history_cursor.is_some(), local_rows))
}

/// Incremental sync needs both a change-log baseline and something local to
/// apply the deltas to. Anything less gets a rebuild.
pub fn select_mode(has_cursor: bool, local_rows: usize) -> SyncMode {
    if has_cursor && local_rows > 0 {
        SyncMode::Incremental
    } else {
        SyncMode::Initial
    }
}

/// Pick the numerically largest history id among the candidates. Ids that do
/// not parse as integers are kept as a positional fallback so a cursor is
/// still produced when Gmail returns something unexpected.
pub fn max_history_id<I, S>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<(u64, String)> = None;
    let mut last_seen: Option<String> = None;
    for candidate in candidates {
        let value = candidate.as_ref();
        if value.is_empty() {
            continue;
        }
        last_seen = Some(value.to_string());
        if let Ok(numeric) = value.parse::<u64>() {
            if best.as_ref().map_or(true, |(b, _)| numeric > *b) {
                best = Some((numeric, value.to_string()));
            }
        }
    }
    best.map(|(_, value)| value).or(last_seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_unless_cursor_and_rows_exist() {
        assert_eq!(select_mode(false, 0), SyncMode::Initial);
        assert_eq!(select_mode(true, 0), SyncMode::Initial);
        assert_eq!(select_mode(false, 12), SyncMode::Initial);
        assert_eq!(select_mode(true, 12), SyncMode::Incremental);
    }

    #[test]
    fn picks_numerically_largest_history_id() {
        assert_eq!(
            max_history_id(["99", "100", "2"]),
            Some("100".to_string())
        );
        // Lexicographic order would pick "99" here.
        assert_eq!(max_history_id(["99", "100"]), Some("100".to_string()));
    }

    #[test]
    fn falls_back_to_last_non_numeric_candidate() {
        assert_eq!(max_history_id(["abc", "def"]), Some("def".to_string()));
        assert_eq!(max_history_id(Vec::<&str>::new()), None);
        assert_eq!(max_history_id(["", ""]), None);
    }
}
