// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Social-analytics verification client.
//!
//! Calls the external analytics service that confirms a creator owns a
//! handle and reports its follower and engagement numbers. One GET per
//! verification; the response is snapshotted into storage and the tier is
//! recomputed from the snapshots, so a flaky analytics call never leaves
//! partial tier state behind.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::storage::SocialPlatform;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Stats returned by the analytics service for one account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountStats {
    /// Handle as canonicalized by the service
    pub handle: String,
    /// Current follower count
    pub followers: u64,
    /// Average engagement rate (0.0..=1.0)
    pub engagement_rate: f64,
    /// Whether ownership was confirmed
    pub verified: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SocialVerifyError {
    #[error("social verification configuration missing: {0}")]
    MissingConfig(String),

    #[error("social verification request failed: {0}")]
    Request(String),

    #[error("social verification response was invalid: {0}")]
    InvalidResponse(String),

    #[error("account not found on {platform}: {handle}")]
    AccountNotFound {
        platform: SocialPlatform,
        handle: String,
    },
}

#[derive(Debug, Clone)]
pub struct SocialVerifyClient {
    api_base_url: String,
    api_key: String,
    http: Client,
}

impl SocialVerifyClient {
    pub fn is_configured() -> bool {
        env_optional("SOCIAL_VERIFY_API_URL").is_some()
            && env_optional("SOCIAL_VERIFY_API_KEY").is_some()
    }

    pub fn from_env() -> Result<Self, SocialVerifyError> {
        let api_base_url = env_required("SOCIAL_VERIFY_API_URL")?;
        let api_key = env_required("SOCIAL_VERIFY_API_KEY")?;

        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SocialVerifyError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url,
            api_key,
            http,
        })
    }

    /// Fetch current stats for a handle on a platform.
    pub async fn fetch_account_stats(
        &self,
        platform: SocialPlatform,
        handle: &str,
    ) -> Result<AccountStats, SocialVerifyError> {
        let handle_path = handle.trim_start_matches('@');
        let url = format!(
            "{}/v1/{}/accounts/{}/stats",
            self.api_base_url.trim_end_matches('/'),
            platform.as_str(),
            handle_path,
        );

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| SocialVerifyError::Request(format!("GET {url} failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SocialVerifyError::AccountNotFound {
                platform,
                handle: handle.to_string(),
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SocialVerifyError::Request(format!(
                "GET {url} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SocialVerifyError::InvalidResponse(format!("invalid stats JSON: {e}")))
    }
}

fn env_required(name: &str) -> Result<String, SocialVerifyError> {
    env_optional(name).ok_or_else(|| SocialVerifyError::MissingConfig(name.to_string()))
}

fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}
