// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod batch;
pub mod content;
pub mod deferred;
pub mod thread;
