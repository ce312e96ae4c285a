// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

use crate::{
    modules::{
        database::{async_find_impl, manager::DB_MANAGER, upsert_impl},
        error::InboxdResult,
        index::thread::record_pk,
    },
    utc_now,
};

/// Cached normalized thread text, keyed by the `content_version` it was
/// fetched under. A row is only valid while that version still matches the
/// index record; the worker treats anything else as a miss and overwrites.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[native_model(id = 4, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct ThreadContentCache {
    #[secondary_key]
    pub account_id: u64,
    pub thread_id: String,
    pub content_version: String,
    pub content: String,
    pub fetched_at: i64,
}

impl ThreadContentCache {
    pub fn pk(&self) -> String {
        record_pk(self.account_id, &self.thread_id)
    }

    pub fn new(account_id: u64, thread_id: String, content_version: String, content: String) -> Self {
        Self {
            account_id,
            thread_id,
            content_version,
            content,
            fetched_at: utc_now!(),
        }
    }

    pub async fn find(account_id: u64, thread_id: &str) -> InboxdResult<Option<ThreadContentCache>> {
        async_find_impl(DB_MANAGER.index_db(), record_pk(account_id, thread_id)).await
    }

    pub async fn save(&self) -> InboxdResult<()> {
        upsert_impl(DB_MANAGER.index_db(), self.to_owned()).await
    }
}
