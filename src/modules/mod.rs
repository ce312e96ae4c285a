// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod account;
pub mod database;
pub mod error;
pub mod gmail;
pub mod index;
pub mod logger;
pub mod oauth2;
pub mod prioritize;
pub mod settings;
pub mod sync;
pub mod tasks;
pub mod utils;
