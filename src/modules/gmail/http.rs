// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use crate::inboxd_version;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::InboxdResult;
use crate::raise_error;

pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> InboxdResult<HttpClient> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(format!("inboxd/{}", inboxd_version!()))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                raise_error!(
                    format!("Failed to build HTTP client: {:#?}", e),
                    ErrorCode::InternalError
                )
            })?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: &str, access_token: &str) -> InboxdResult<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?;
        Self::json_body(response).await
    }

    pub async fn post_json(
        &self,
        url: &str,
        access_token: &str,
        payload: &serde_json::Value,
    ) -> InboxdResult<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?;
        Self::json_body(response).await
    }

    async fn json_body(response: reqwest::Response) -> InboxdResult<serde_json::Value> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(raise_error!(
                format!("Remote returned 404: {}", body),
                ErrorCode::ResourceNotFound
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(raise_error!(
                format!("Remote returned {}: {}", status, body),
                ErrorCode::HttpResponseError
            ));
        }
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::HttpResponseError))
    }
}
