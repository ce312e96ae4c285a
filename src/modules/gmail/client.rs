// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::Value;

use crate::modules::error::code::ErrorCode;
use crate::modules::error::InboxdResult;
use crate::modules::gmail::http::HttpClient;
use crate::modules::gmail::model::history::HistoryList;
use crate::modules::gmail::model::threads::{Profile, ThreadDetail, ThreadList};
use crate::modules::oauth2::token::OAuth2AccessToken;
use crate::raise_error;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

const METADATA_HEADERS: &[&str] = &["Subject", "From", "To", "Cc", "Date", "Message-ID"];

pub struct GmailClient;

impl GmailClient {
    async fn access_token(account_id: u64) -> InboxdResult<String> {
        let token = OAuth2AccessToken::get(account_id).await?.ok_or_else(|| {
            raise_error!(
                format!("No OAuth2 token stored for account {}", account_id),
                ErrorCode::PermissionDenied
            )
        })?;
        token.access_token.clone().ok_or_else(|| {
            raise_error!(
                format!("OAuth2 token for account {} has no access token", account_id),
                ErrorCode::MissingRefreshToken
            )
        })
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> InboxdResult<T> {
        serde_json::from_value(value)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::GmailApiCallFailed))
    }

    pub async fn list_threads(
        account_id: u64,
        query: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> InboxdResult<ThreadList> {
        let access_token = Self::access_token(account_id).await?;
        let mut url = format!(
            "{}/threads?maxResults={}&q={}",
            GMAIL_API_BASE,
            max_results,
            urlencoding::encode(query)
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }
        let value = HttpClient::new()?.get(&url, &access_token).await?;
        Self::decode(value)
    }

    pub async fn get_thread_metadata(account_id: u64, thread_id: &str) -> InboxdResult<ThreadDetail> {
        let access_token = Self::access_token(account_id).await?;
        let headers = METADATA_HEADERS
            .iter()
            .map(|h| format!("metadataHeaders={}", h))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!(
            "{}/threads/{}?format=metadata&{}",
            GMAIL_API_BASE, thread_id, headers
        );
        let value = HttpClient::new()?.get(&url, &access_token).await?;
        Self::decode(value)
    }

    pub async fn get_thread_full(account_id: u64, thread_id: &str) -> InboxdResult<ThreadDetail> {
        let access_token = Self::access_token(account_id).await?;
        let url = format!("{}/threads/{}?format=full", GMAIL_API_BASE, thread_id);
        let value = HttpClient::new()?.get(&url, &access_token).await?;
        Self::decode(value)
    }

    /// Pull one page of history records after `start_history_id`. A cursor
    /// that Gmail no longer retains comes back as 404, surfaced here as
    /// `GmailApiInvalidHistoryId` so the caller can fall back to a rebuild.
    pub async fn list_history(
        account_id: u64,
        start_history_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> InboxdResult<HistoryList> {
        let access_token = Self::access_token(account_id).await?;
        let mut url = format!(
            "{}/history?startHistoryId={}&maxResults={}\
            &historyTypes=messageAdded&historyTypes=messageDeleted\
            &historyTypes=labelAdded&historyTypes=labelRemoved",
            GMAIL_API_BASE, start_history_id, max_results
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }
        let value = HttpClient::new()?
            .get(&url, &access_token)
            .await
            .map_err(|e| {
                if matches!(e.code(), ErrorCode::ResourceNotFound) {
                    raise_error!(
                        format!("History cursor {} expired", start_history_id),
                        ErrorCode::GmailApiInvalidHistoryId
                    )
                } else {
                    e
                }
            })?;
        Self::decode(value)
    }

    pub async fn get_profile(account_id: u64) -> InboxdResult<Profile> {
        let access_token = Self::access_token(account_id).await?;
        let url = format!("{}/profile", GMAIL_API_BASE);
        let value = HttpClient::new()?.get(&url, &access_token).await?;
        Self::decode(value)
    }
}
