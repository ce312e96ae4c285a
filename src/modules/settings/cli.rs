// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::Parser;
use std::sync::LazyLock;

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "inboxd",
    about = "Keeps a local index of a Gmail primary inbox in sync and schedules \
    bounded, resumable priority scoring over the indexed threads.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// inboxd log level (default: "info")
    #[clap(long, default_value = "info", env, help = "Set the log level for inboxd")]
    pub inboxd_log_level: String,

    /// Enable ANSI formatted logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub inboxd_ansi_logs: bool,

    /// Mailbox to register on startup when not already present
    #[clap(long, env, help = "Gmail address of the mailbox to sync")]
    pub inboxd_account_email: Option<String>,

    /// Directory holding the embedded databases
    #[clap(
        long,
        default_value = "./inboxd_data",
        env,
        help = "Set the data directory for inboxd"
    )]
    pub inboxd_data_dir: String,

    /// Interval between periodic sync passes over all accounts
    #[clap(
        long,
        default_value = "300",
        env,
        help = "Seconds between periodic sync passes"
    )]
    pub inboxd_sync_interval_secs: u64,

    /// Only threads newer than this many days are pulled on an initial sync
    #[clap(
        long,
        default_value = "30",
        env,
        help = "Lookback window in days for the initial sync query"
    )]
    pub inboxd_lookback_days: u32,

    #[clap(
        long,
        default_value = "500",
        env,
        help = "Maximum number of threads fetched during an initial sync"
    )]
    pub inboxd_initial_sync_max_threads: usize,

    #[clap(
        long,
        default_value = "6",
        env,
        help = "Concurrent thread-metadata fetches during sync"
    )]
    pub inboxd_metadata_concurrency: usize,

    #[clap(
        long,
        default_value = "500",
        env,
        help = "Page size for Gmail history.list requests"
    )]
    pub inboxd_history_page_size: u32,

    /// Debounce window before a burst of thread-change events becomes one batch
    #[clap(
        long,
        default_value = "90000",
        env,
        help = "Prioritization debounce window in milliseconds"
    )]
    pub inboxd_debounce_ms: u64,

    /// Delay before a follow-up drain of the deferred backlog
    #[clap(
        long,
        default_value = "30000",
        env,
        help = "Deferred-backlog follow-up delay in milliseconds"
    )]
    pub inboxd_followup_delay_ms: u64,

    #[clap(
        long,
        default_value = "200",
        env,
        help = "Maximum threads scored in one prioritization batch"
    )]
    pub inboxd_max_threads_per_batch: usize,

    #[clap(
        long,
        default_value = "1200000",
        env,
        help = "Maximum total content characters scored in one batch"
    )]
    pub inboxd_max_total_chars_per_batch: usize,

    #[clap(
        long,
        default_value = "25000",
        env,
        help = "Maximum content characters per thread"
    )]
    pub inboxd_max_chars_per_thread: usize,

    #[clap(
        long,
        default_value = "10",
        env,
        help = "Number of most recent messages included in thread content"
    )]
    pub inboxd_max_messages_per_thread: usize,

    #[clap(
        long,
        default_value = "60",
        env,
        help = "Wall-clock budget in seconds for one prioritization batch"
    )]
    pub inboxd_batch_time_budget_secs: u64,

    /// Bumping this tag invalidates every stored score on the next batch
    #[clap(
        long,
        default_value = "v1",
        env,
        help = "Version tag recorded with every priority score"
    )]
    pub inboxd_score_version: String,

    #[clap(
        long,
        default_value = "https://api.openai.com/v1",
        env,
        help = "Base URL of the OpenAI-compatible scoring endpoint"
    )]
    pub inboxd_scorer_url: String,

    #[clap(long, env, help = "API key for the scoring endpoint")]
    pub inboxd_scorer_api_key: Option<String>,

    #[clap(
        long,
        default_value = "gpt-4o-mini",
        env,
        help = "Model name sent to the scoring endpoint"
    )]
    pub inboxd_scorer_model: String,
}

impl Settings {
    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Settings::parse_from(["inboxd"])
    }
}
