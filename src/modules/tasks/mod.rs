// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use tracing::{error, info};

use crate::modules::account::Account;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::sync::sync_primary_inbox;

pub struct PeriodicTasks;

impl PeriodicTasks {
    /// Drive a sync pass over every account on a fixed interval. One failing
    /// account never blocks the others.
    pub fn start_background_tasks() {
        let interval = Duration::from_secs(SETTINGS.inboxd_sync_interval_secs);
        info!(interval_secs = interval.as_secs(), "starting periodic sync driver");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let accounts = match Account::list_all().await {
                    Ok(accounts) => accounts,
                    Err(e) => {
                        error!(error = %e, "failed to list accounts for periodic sync");
                        continue;
                    }
                };
                for account in accounts {
                    match sync_primary_inbox(account.id).await {
                        Ok(outcome) => {
                            info!(
                                account_id = account.id,
                                mode = ?outcome.mode,
                                updated = outcome.updated,
                                removed = outcome.removed,
                                "periodic sync pass done"
                            );
                        }
                        Err(e) => {
                            error!(account_id = account.id, error = %e, "periodic sync pass failed");
                        }
                    }
                }
            }
        });
    }
}
