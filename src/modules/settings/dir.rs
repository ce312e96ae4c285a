// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::PathBuf;
use std::sync::LazyLock;

use crate::modules::settings::cli::SETTINGS;

pub static DATA_DIR_MANAGER: LazyLock<DataDirManager> = LazyLock::new(DataDirManager::new);

pub struct DataDirManager {
    pub root: PathBuf,
    pub meta_db: PathBuf,
    pub index_db: PathBuf,
}

impl DataDirManager {
    fn new() -> Self {
        let root = PathBuf::from(&SETTINGS.inboxd_data_dir);
        std::fs::create_dir_all(&root).unwrap_or_else(|e| {
            panic!(
                "Failed to create data directory {:?}: {e}. Check inboxd_data_dir.",
                root
            )
        });
        let meta_db = root.join("meta.db");
        let index_db = root.join("index.db");
        DataDirManager {
            root,
            meta_db,
            index_db,
        }
    }
}
