// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

use crate::{
    id,
    modules::{
        database::{insert_impl, manager::DB_MANAGER, update_impl},
        error::{code::ErrorCode, InboxdResult},
    },
    raise_error, utc_now,
};

/// What caused a prioritization batch to be scheduled.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum BatchTrigger {
    InitialSync,
    #[default]
    HistoryDelta,
}

impl BatchTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchTrigger::InitialSync => "initial_sync",
            BatchTrigger::HistoryDelta => "history_delta",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum BatchStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

/// Audit record for one worker run. Created `Running` before the first
/// candidate is examined, finalized exactly once, never touched afterward.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[native_model(id = 6, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct PrioritizationBatch {
    #[secondary_key]
    pub account_id: u64,
    pub id: u64,
    pub trigger: BatchTrigger,
    pub status: BatchStatus,
    pub planned: u32,
    pub processed: u32,
    pub deferred: u32,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub error: Option<String>,
}

impl PrioritizationBatch {
    // Timestamp-first primary key keeps batches in chronological order.
    pub fn pk(&self) -> String {
        format!("{}_{}", self.started_at, self.id)
    }

    pub async fn start(
        account_id: u64,
        trigger: BatchTrigger,
        planned: u32,
    ) -> InboxdResult<PrioritizationBatch> {
        let batch = PrioritizationBatch {
            account_id,
            id: id!(64),
            trigger,
            status: BatchStatus::Running,
            planned,
            processed: 0,
            deferred: 0,
            started_at: utc_now!(),
            finished_at: None,
            error: None,
        };
        insert_impl(DB_MANAGER.index_db(), batch.clone()).await?;
        Ok(batch)
    }

    pub async fn finalize(
        &self,
        status: BatchStatus,
        processed: u32,
        deferred: u32,
        error: Option<String>,
    ) -> InboxdResult<()> {
        let pk = self.pk();
        update_impl(
            DB_MANAGER.index_db(),
            move |rw| {
                rw.get()
                    .primary::<PrioritizationBatch>(pk)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            "prioritization batch record missing".into(),
                            ErrorCode::InternalError
                        )
                    })
            },
            move |current| {
                let mut updated = current.clone();
                updated.status = status;
                updated.processed = processed;
                updated.deferred = deferred;
                updated.finished_at = Some(utc_now!());
                updated.error = error;
                Ok(updated)
            },
        )
        .await?;
        Ok(())
    }
}
