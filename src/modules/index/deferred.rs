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
            batch_delete_impl, batch_upsert_impl, filter_by_secondary_key_impl, manager::DB_MANAGER,
        },
        error::{code::ErrorCode, InboxdResult},
        index::thread::record_pk,
    },
    raise_error, utc_now,
};

pub const DEFER_REASON_GUARDRAIL: &str = "guardrail";

/// Durable overflow of the prioritization queue: one marker per
/// (account, thread) that still needs a scoring pass. Rows survive restarts
/// and are deleted only when the thread is processed in a later batch.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[native_model(id = 5, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct DeferredPrioritization {
    #[secondary_key]
    pub account_id: u64,
    pub thread_id: String,
    pub reason: String,
    pub created_at: i64,
}

impl DeferredPrioritization {
    pub fn pk(&self) -> String {
        record_pk(self.account_id, &self.thread_id)
    }

    pub fn guardrail(account_id: u64, thread_id: String) -> Self {
        Self {
            account_id,
            thread_id,
            reason: DEFER_REASON_GUARDRAIL.into(),
            created_at: utc_now!(),
        }
    }

    pub async fn list_account(account_id: u64) -> InboxdResult<Vec<DeferredPrioritization>> {
        filter_by_secondary_key_impl(
            DB_MANAGER.index_db(),
            DeferredPrioritizationKey::account_id,
            account_id,
        )
        .await
    }

    pub async fn count_account(account_id: u64) -> InboxdResult<usize> {
        Ok(Self::list_account(account_id).await?.len())
    }

    pub async fn upsert_many(rows: Vec<DeferredPrioritization>) -> InboxdResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        batch_upsert_impl(DB_MANAGER.index_db(), rows).await
    }

    /// Drop the markers for threads that were successfully processed.
    pub async fn delete_processed(
        account_id: u64,
        thread_ids: &[String],
    ) -> InboxdResult<usize> {
        if thread_ids.is_empty() {
            return Ok(0);
        }
        let ids: AHashSet<String> = thread_ids.iter().cloned().collect();
        batch_delete_impl(DB_MANAGER.index_db(), move |rw| {
            let rows: Vec<DeferredPrioritization> = rw
                .scan()
                .secondary::<DeferredPrioritization>(DeferredPrioritizationKey::account_id)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                .start_with(account_id)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                .filter_map(Result::ok)
                .filter(|r: &DeferredPrioritization| ids.contains(&r.thread_id))
                .collect();
            Ok(rows)
        })
        .await
    }
}
