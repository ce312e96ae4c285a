// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

use crate::{
    modules::{
        database::{async_find_impl, list_all_impl, manager::DB_MANAGER, update_impl, upsert_impl},
        error::{code::ErrorCode, InboxdResult},
    },
    raise_error, utc_now,
};

/// One row per synced mailbox owner.
///
/// `history_cursor` is the Gmail change-log position used as `startHistoryId`
/// on the next incremental sync. `None` means no incremental baseline exists
/// yet and the next sync must run in initial mode.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct Account {
    #[primary_key]
    pub id: u64,
    pub email: String,
    pub history_cursor: Option<String>,
    pub last_initial_sync_at: Option<i64>,
    pub last_sync_at: Option<i64>,
    pub created_at: i64,
}

impl Account {
    pub fn new(id: u64, email: String) -> Self {
        Self {
            id,
            email,
            history_cursor: None,
            last_initial_sync_at: None,
            last_sync_at: None,
            created_at: utc_now!(),
        }
    }

    pub async fn get(id: u64) -> InboxdResult<Account> {
        Self::find(id).await?.ok_or_else(|| {
            raise_error!(
                format!("Account not found for id={}", id),
                ErrorCode::ResourceNotFound
            )
        })
    }

    pub async fn find(id: u64) -> InboxdResult<Option<Account>> {
        async_find_impl(DB_MANAGER.meta_db(), id).await
    }

    pub async fn list_all() -> InboxdResult<Vec<Account>> {
        list_all_impl(DB_MANAGER.meta_db()).await
    }

    pub async fn save(&self) -> InboxdResult<()> {
        upsert_impl(DB_MANAGER.meta_db(), self.to_owned()).await
    }

    /// Advance the change-log cursor and sync timestamps after a successful
    /// sync. The cursor only ever moves forward here; the initial-mode
    /// fallback is the one path allowed to replace it wholesale.
    pub async fn record_sync(id: u64, cursor: String, initial: bool) -> InboxdResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .primary::<Account>(id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("Account not found for id={}", id),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            move |current| {
                let mut updated = current.clone();
                let now = utc_now!();
                updated.history_cursor = Some(cursor);
                updated.last_sync_at = Some(now);
                if initial {
                    updated.last_initial_sync_at = Some(now);
                }
                Ok(updated)
            },
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_sync_advances_cursor_and_timestamps() {
        let account = Account::new(4242, "ada@example.com".into());
        assert!(account.history_cursor.is_none());
        account.save().await.unwrap();

        Account::record_sync(4242, "100".into(), true).await.unwrap();
        let after_initial = Account::get(4242).await.unwrap();
        assert_eq!(after_initial.history_cursor.as_deref(), Some("100"));
        assert!(after_initial.last_initial_sync_at.is_some());
        assert!(after_initial.last_sync_at.is_some());

        Account::record_sync(4242, "250".into(), false).await.unwrap();
        let after_delta = Account::get(4242).await.unwrap();
        assert_eq!(after_delta.history_cursor.as_deref(), Some("250"));
        assert_eq!(
            after_delta.last_initial_sync_at,
            after_initial.last_initial_sync_at
        );
    }

    #[tokio::test]
    async fn missing_account_is_a_not_found_error() {
        let err = Account::get(999_999).await.unwrap_err();
        assert!(matches!(err.code(), ErrorCode::ResourceNotFound));
    }
}
