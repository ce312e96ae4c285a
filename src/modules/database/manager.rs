// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::database::{INDEX_MODELS, META_MODELS};
use native_db::{Builder, Database};
use std::sync::{Arc, LazyLock};

pub static DB_MANAGER: LazyLock<DatabaseManager> = LazyLock::new(DatabaseManager::new);

pub struct DatabaseManager {
    /// Accounts and OAuth tokens
    meta_db: Arc<Database<'static>>,
    /// Thread index, content cache, deferred work, batch audit records
    index_db: Arc<Database<'static>>,
}

impl DatabaseManager {
    #[cfg(not(test))]
    fn new() -> Self {
        use crate::modules::settings::dir::DATA_DIR_MANAGER;
        let meta_db = Builder::new()
            .create(&META_MODELS, DATA_DIR_MANAGER.meta_db.clone())
            .expect("Failed to initialize metadata database");
        let index_db = Builder::new()
            .create(&INDEX_MODELS, DATA_DIR_MANAGER.index_db.clone())
            .expect("Failed to initialize index database");
        DatabaseManager {
            meta_db: Arc::new(meta_db),
            index_db: Arc::new(index_db),
        }
    }

    #[cfg(test)]
    fn new() -> Self {
        let meta_db = Builder::new()
            .create_in_memory(&META_MODELS)
            .expect("Failed to initialize in-memory metadata database");
        let index_db = Builder::new()
            .create_in_memory(&INDEX_MODELS)
            .expect("Failed to initialize in-memory index database");
        DatabaseManager {
            meta_db: Arc::new(meta_db),
            index_db: Arc::new(index_db),
        }
    }

    pub fn meta_db(&self) -> &Arc<Database<'static>> {
        &self.meta_db
    }

    pub fn index_db(&self) -> &Arc<Database<'static>> {
        &self.index_db
    }
}
