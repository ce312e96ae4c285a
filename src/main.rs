// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use tracing::info;

use crate::modules::account::Account;
use crate::modules::database::manager::DB_MANAGER;
use crate::modules::logger::initialize_logging;
use crate::modules::prioritize::queue::PrioritizationQueue;
use crate::modules::prioritize::scorer::LlmScorer;
use crate::modules::prioritize::worker::PrioritizationWorker;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::settings::dir::DATA_DIR_MANAGER;
use crate::modules::tasks::PeriodicTasks;

pub mod modules;

#[tokio::main]
async fn main() {
    initialize_logging();
    info!(
        version = inboxd_version!(),
        data_dir = %DATA_DIR_MANAGER.root.display(),
        "inboxd starting"
    );

    // Open the embedded databases before anything can race to use them.
    let _ = DB_MANAGER.meta_db();
    let _ = DB_MANAGER.index_db();

    register_configured_account().await;

    let worker = Arc::new(PrioritizationWorker::new(Arc::new(LlmScorer)));
    PrioritizationQueue::initialize(worker);

    PeriodicTasks::start_background_tasks();

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("inboxd shutting down");
}

/// Make sure the configured mailbox has an account row. Token provisioning
/// happens outside this process; sync stays idle until a credential exists.
async fn register_configured_account() {
    let Some(email) = SETTINGS.inboxd_account_email.clone() else {
        return;
    };
    let account_id = calculate_hash!(&email);
    match Account::find(account_id).await {
        Ok(Some(_)) => {}
        Ok(None) => match Account::new(account_id, email.clone()).save().await {
            Ok(()) => info!(account_id, %email, "registered account"),
            Err(e) => tracing::error!(account_id, error = %e, "failed to register account"),
        },
        Err(e) => tracing::error!(account_id, error = %e, "failed to look up account"),
    }
}
