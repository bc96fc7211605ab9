// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Creator social-account and tier endpoints.
//!
//! Every verify or disconnect recomputes the tier from scratch over the
//! snapshots on disk; there is no incremental tier state to drift. The
//! recompute result is cached per creator and the cache is invalidated on
//! every recompute.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::CreatorOnly,
    error::{ApiError, ApiOk},
    ratelimit::RateClass,
    social::{compute_tier, SocialVerifyClient, TierAssessment},
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, AuditRepository, SocialAccountRepository, SocialPlatform,
        StoredSocialAccount,
    },
};

use super::properties::map_storage_error;

/// Request body for verifying a social account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyAccountRequest {
    /// Platform handle (e.g. `@hearthhomes`).
    pub handle: String,
}

/// A social-account snapshot as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SocialAccountResponse {
    /// Platform.
    pub platform: SocialPlatform,
    /// Handle.
    pub handle: String,
    /// Follower count at verification time.
    pub followers: u64,
    /// Engagement rate at verification time.
    pub engagement_rate: f64,
    /// When the snapshot was fetched.
    pub fetched_at: String,
}

fn account_response(account: &StoredSocialAccount) -> SocialAccountResponse {
    SocialAccountResponse {
        platform: account.platform,
        handle: account.handle.clone(),
        followers: account.followers,
        engagement_rate: account.engagement_rate,
        fetched_at: account.fetched_at.to_rfc3339(),
    }
}

/// Tier state returned to clients. `tier` is null until a verified
/// account earns one.
#[derive(Debug, Serialize, ToSchema)]
pub struct TierResponse {
    /// Current assessment, if any.
    pub tier: Option<TierAssessment>,
}

/// Verify result: the stored snapshot plus the recomputed tier.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyAccountResponse {
    /// The stored snapshot.
    pub account: SocialAccountResponse,
    /// Tier after recomputation.
    pub tier: Option<TierAssessment>,
}

/// List response for social accounts.
#[derive(Debug, Serialize, ToSchema)]
pub struct SocialAccountListResponse {
    /// Linked accounts.
    pub accounts: Vec<SocialAccountResponse>,
    /// Total count.
    pub total: usize,
}

fn parse_platform(raw: &str) -> Result<SocialPlatform, ApiError> {
    SocialPlatform::from_str(raw)
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported platform `{raw}`")))
}

/// Current tier for a creator, via the cache.
pub(super) fn current_tier(
    state: &AppState,
    creator_user_id: &str,
) -> Result<Option<TierAssessment>, ApiError> {
    if let Some(cached) = state.tier_cache.get(creator_user_id) {
        return Ok(cached);
    }

    let storage = state.storage();
    let accounts = SocialAccountRepository::new(&storage)
        .list_by_creator(creator_user_id)
        .map_err(map_storage_error)?;
    let assessment = compute_tier(&accounts);
    state.tier_cache.put(creator_user_id, assessment);
    Ok(assessment)
}

/// Recompute the tier from disk, refresh the cache, and append the
/// analytics history event.
fn recompute_tier(
    state: &AppState,
    creator_user_id: &str,
) -> Result<Option<TierAssessment>, ApiError> {
    let storage = state.storage();
    let accounts = SocialAccountRepository::new(&storage)
        .list_by_creator(creator_user_id)
        .map_err(map_storage_error)?;
    let assessment = compute_tier(&accounts);

    state.tier_cache.invalidate(creator_user_id);
    state.tier_cache.put(creator_user_id, assessment);

    let details = match assessment {
        Some(a) => serde_json::json!({
            "tier": a.tier,
            "score": a.score,
            "commission_rate_bps": a.commission_rate_bps,
            "platforms": accounts.len(),
        }),
        None => serde_json::json!({
            "tier": null,
            "platforms": accounts.len(),
        }),
    };
    let event = AuditEvent::new(AuditEventType::TierRecomputed)
        .with_user(creator_user_id)
        .with_resource("creator", creator_user_id)
        .with_details(details);
    let _ = AuditRepository::new(&storage).log(&event);

    Ok(assessment)
}

/// Verify a social account through the analytics service.
#[utoipa::path(
    post,
    path = "/api/creators/social-accounts/{platform}/verify",
    tag = "Creators",
    params(
        ("platform" = String, Path, description = "instagram | tiktok | youtube | twitter")
    ),
    request_body = VerifyAccountRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account verified; tier recomputed", body = VerifyAccountResponse),
        (status = 400, description = "Bad request or ownership not confirmed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a creator"),
        (status = 404, description = "Account not found on platform"),
        (status = 429, description = "Rate limited"),
        (status = 502, description = "Analytics service error"),
        (status = 503, description = "Analytics service not configured")
    )
)]
pub async fn verify_social_account(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Json(request): Json<VerifyAccountRequest>,
) -> Result<ApiOk<VerifyAccountResponse>, ApiError> {
    state
        .rate_limits
        .check(RateClass::SocialVerify, &user.user_id)?;

    let platform = parse_platform(&platform)?;
    let handle = request.handle.trim();
    if handle.is_empty() {
        return Err(ApiError::bad_request("handle is required"));
    }

    if !SocialVerifyClient::is_configured() {
        return Err(ApiError::service_unavailable(
            "Social verification is not configured. Set SOCIAL_VERIFY_* environment variables.",
        ));
    }
    let client = SocialVerifyClient::from_env()
        .map_err(|e| ApiError::service_unavailable(e.to_string()))?;

    let stats = client
        .fetch_account_stats(platform, handle)
        .await
        .map_err(|e| match e {
            crate::social::SocialVerifyError::AccountNotFound { .. } => {
                ApiError::not_found(e.to_string())
            }
            other => ApiError::bad_gateway(format!("Analytics service error: {other}")),
        })?;

    if !stats.verified {
        return Err(ApiError::bad_request(
            "Account ownership could not be confirmed",
        ));
    }

    let snapshot = StoredSocialAccount {
        creator_user_id: user.user_id.clone(),
        platform,
        handle: stats.handle.clone(),
        followers: stats.followers,
        engagement_rate: stats.engagement_rate,
        verified: true,
        fetched_at: Utc::now(),
    };

    let storage = state.storage();
    SocialAccountRepository::new(&storage)
        .upsert(&snapshot)
        .map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::SocialAccountVerified,
        &user,
        "social_account",
        platform.as_str()
    );

    let tier = recompute_tier(&state, &user.user_id)?;

    Ok(ApiOk::new(VerifyAccountResponse {
        account: account_response(&snapshot),
        tier,
    }))
}

/// Disconnect a social account and recompute the tier.
#[utoipa::path(
    delete,
    path = "/api/creators/social-accounts/{platform}",
    tag = "Creators",
    params(
        ("platform" = String, Path, description = "instagram | tiktok | youtube | twitter")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account disconnected; tier recomputed", body = TierResponse),
        (status = 400, description = "Unsupported platform"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a creator"),
        (status = 404, description = "No linked account for platform")
    )
)]
pub async fn disconnect_social_account(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> Result<ApiOk<TierResponse>, ApiError> {
    let platform = parse_platform(&platform)?;

    let storage = state.storage();
    SocialAccountRepository::new(&storage)
        .delete(&user.user_id, platform)
        .map_err(|_| ApiError::not_found("No linked account for this platform"))?;

    audit_log!(
        &storage,
        AuditEventType::SocialAccountDisconnected,
        &user,
        "social_account",
        platform.as_str()
    );

    let tier = recompute_tier(&state, &user.user_id)?;
    Ok(ApiOk::new(TierResponse { tier }))
}

/// List the caller's linked social accounts.
#[utoipa::path(
    get,
    path = "/api/creators/social-accounts",
    tag = "Creators",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Linked accounts", body = SocialAccountListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a creator")
    )
)]
pub async fn list_social_accounts(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
) -> Result<ApiOk<SocialAccountListResponse>, ApiError> {
    let storage = state.storage();
    let accounts = SocialAccountRepository::new(&storage)
        .list_by_creator(&user.user_id)
        .map_err(map_storage_error)?;

    let mapped: Vec<SocialAccountResponse> = accounts.iter().map(account_response).collect();
    Ok(ApiOk::new(SocialAccountListResponse {
        total: mapped.len(),
        accounts: mapped,
    }))
}

/// Get the caller's current commission tier.
#[utoipa::path(
    get,
    path = "/api/creators/tier",
    tag = "Creators",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current tier (null when none)", body = TierResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a creator")
    )
)]
pub async fn get_tier(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
) -> Result<ApiOk<TierResponse>, ApiError> {
    let tier = current_tier(&state, &user.user_id)?;
    Ok(ApiOk::new(TierResponse { tier }))
}
