// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

use crate::{
    modules::database::{async_find_impl, manager::DB_MANAGER, upsert_impl},
    modules::error::InboxdResult,
    utc_now,
};

pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Stored OAuth2 credential for one account. Token exchange and refresh are
/// handled outside this crate; sync and scoring only read what is stored here.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct OAuth2AccessToken {
    #[primary_key]
    pub account_id: u64,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub scopes: Vec<String>,
    pub updated_at: i64,
}

impl OAuth2AccessToken {
    pub fn new(
        account_id: u64,
        access_token: Option<String>,
        refresh_token: Option<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            account_id,
            access_token,
            refresh_token,
            scopes,
            updated_at: utc_now!(),
        }
    }

    pub async fn get(account_id: u64) -> InboxdResult<Option<OAuth2AccessToken>> {
        async_find_impl(DB_MANAGER.meta_db(), account_id).await
    }

    pub async fn save(&self) -> InboxdResult<()> {
        upsert_impl(DB_MANAGER.meta_db(), self.to_owned()).await
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// A batch may only run with a refreshable credential carrying the Gmail
    /// readonly scope.
    pub fn usable_for_scoring(&self) -> bool {
        self.refresh_token.is_some() && self.has_scope(GMAIL_READONLY_SCOPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoring_requires_refresh_token_and_scope() {
        let mut token = OAuth2AccessToken::new(
            1,
            Some("at".into()),
            Some("rt".into()),
            vec![GMAIL_READONLY_SCOPE.into()],
        );
        assert!(token.usable_for_scoring());

        token.refresh_token = None;
        assert!(!token.usable_for_scoring());

        token.refresh_token = Some("rt".into());
        token.scopes = vec!["https://www.googleapis.com/auth/calendar".into()];
        assert!(!token.usable_for_scoring());
    }
}
