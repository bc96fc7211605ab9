// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Promotion (tracking link) endpoints.
//!
//! All transitions go through the table in
//! `storage::repository::promotions`; every read observes lazy expiry so
//! a past-due link is never served as active, and the background sweeper
//! (`crate::sweeper`) flips the ones nobody reads.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{AuthenticatedUser, CreatorOnly},
    error::{ApiError, ApiOk},
    ratelimit::RateClass,
    state::AppState,
    storage::{
        AuditEventType, DocumentStore, OwnershipEnforcer, PromotionRepository, PromotionStatus,
        PromotionTransitionError, PropertyRepository, PropertyStatus, StoredPromotion,
    },
};

use super::creators::current_tier;
use super::properties::map_storage_error;

/// Default promotion lifetime when no expiry is given.
const DEFAULT_LIFETIME_DAYS: i64 = 30;

/// Request body for creating a promotion link.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePromotionRequest {
    /// Property to promote (must be listed).
    pub property_id: String,
    /// Optional custom code; generated when omitted.
    pub code: Option<String>,
    /// Optional expiry; defaults to 30 days out.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request body for extending a promotion's expiry.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtendPromotionRequest {
    /// New expiry; must be in the future and later than the current one.
    pub expires_at: DateTime<Utc>,
}

/// A promotion as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PromotionResponse {
    /// Promotion unique identifier.
    pub promotion_id: String,
    /// Promoted property.
    pub property_id: String,
    /// Public code.
    pub code: String,
    /// Commission rate snapshot in basis points.
    pub commission_rate_bps: u32,
    /// Current status.
    pub status: PromotionStatus,
    /// Expiry timestamp.
    pub expires_at: String,
    /// Resolved clicks.
    pub clicks: u64,
    /// Creation time.
    pub created_at: String,
    /// Last update time.
    pub updated_at: String,
}

fn promotion_response(promotion: &StoredPromotion) -> PromotionResponse {
    PromotionResponse {
        promotion_id: promotion.promotion_id.clone(),
        property_id: promotion.property_id.clone(),
        code: promotion.code.clone(),
        commission_rate_bps: promotion.commission_rate_bps,
        status: promotion.status,
        expires_at: promotion.expires_at.to_rfc3339(),
        clicks: promotion.clicks,
        created_at: promotion.created_at.to_rfc3339(),
        updated_at: promotion.updated_at.to_rfc3339(),
    }
}

/// List response for promotions.
#[derive(Debug, Serialize, ToSchema)]
pub struct PromotionListResponse {
    /// The creator's promotion links.
    pub promotions: Vec<PromotionResponse>,
    /// Total count.
    pub total: usize,
}

/// Resolution of a public promotion code.
#[derive(Debug, Serialize, ToSchema)]
pub struct PromotionResolveResponse {
    /// Promotion code.
    pub code: String,
    /// The promoted property.
    pub property_id: String,
}

fn map_transition_error(error: PromotionTransitionError) -> ApiError {
    match error {
        PromotionTransitionError::Stopped => ApiError::conflict(error.to_string()),
        PromotionTransitionError::Expired => ApiError::conflict(error.to_string()),
        PromotionTransitionError::InvalidState { .. } => ApiError::conflict(error.to_string()),
    }
}

fn validate_code(code: &str) -> Result<String, ApiError> {
    let code = code.trim().to_ascii_lowercase();
    let valid_len = (3..=32).contains(&code.len());
    let valid_chars = code
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid_len || !valid_chars {
        return Err(ApiError::bad_request(
            "code must be 3-32 characters of a-z, 0-9 or '-'",
        ));
    }
    Ok(code)
}

fn generate_code() -> String {
    // First UUID block is enough entropy for a short link code
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Load an own promotion, observing lazy expiry (persisted when it flips).
fn load_own_promotion(
    storage: &DocumentStore,
    user: &AuthenticatedUser,
    promotion_id: &str,
) -> Result<StoredPromotion, ApiError> {
    let repo = PromotionRepository::new(storage);
    let mut promotion = repo
        .get(promotion_id)
        .map_err(|_| ApiError::not_found("Promotion not found"))?;

    promotion
        .verify_ownership(user)
        .map_err(|_| ApiError::forbidden("You do not own this promotion"))?;

    if promotion.observe_expiry(Utc::now()) {
        repo.update(&promotion).map_err(map_storage_error)?;
    }
    Ok(promotion)
}

/// Create a promotion link for a listed property.
#[utoipa::path(
    post,
    path = "/api/promotions",
    tag = "Promotions",
    request_body = CreatePromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Promotion created", body = PromotionResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a creator or no tier yet"),
        (status = 404, description = "Property not found"),
        (status = 409, description = "Code already in use"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn create_promotion(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
    Json(request): Json<CreatePromotionRequest>,
) -> Result<(StatusCode, ApiOk<PromotionResponse>), ApiError> {
    state.rate_limits.check(RateClass::Promotion, &user.user_id)?;

    let storage = state.storage();
    let property = PropertyRepository::new(&storage)
        .get(&request.property_id)
        .map_err(|_| ApiError::not_found("Property not found"))?;
    if property.status != PropertyStatus::Listed {
        return Err(ApiError::bad_request(
            "Only listed properties can be promoted",
        ));
    }

    // Commission comes from the creator's current tier and is frozen onto
    // the link; later tier changes do not touch existing links.
    let assessment = current_tier(&state, &user.user_id)?
        .ok_or_else(|| ApiError::forbidden("Verify a social account to earn a tier first"))?;

    let now = Utc::now();
    let expires_at = request
        .expires_at
        .unwrap_or_else(|| now + Duration::days(DEFAULT_LIFETIME_DAYS));
    if expires_at <= now {
        return Err(ApiError::bad_request("expires_at must be in the future"));
    }

    let code = match request.code {
        Some(code) => validate_code(&code)?,
        None => generate_code(),
    };

    let promotion = StoredPromotion {
        promotion_id: uuid::Uuid::new_v4().to_string(),
        creator_user_id: user.user_id.clone(),
        property_id: property.property_id.clone(),
        code,
        commission_rate_bps: assessment.commission_rate_bps,
        status: PromotionStatus::Active,
        expires_at,
        clicks: 0,
        created_at: now,
        updated_at: now,
    };

    PromotionRepository::new(&storage)
        .create(&promotion)
        .map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::PromotionCreated,
        &user,
        "promotion",
        &promotion.promotion_id
    );

    Ok((
        StatusCode::CREATED,
        ApiOk::new(promotion_response(&promotion)),
    ))
}

/// List the caller's promotion links.
#[utoipa::path(
    get,
    path = "/api/promotions",
    tag = "Promotions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotions listed", body = PromotionListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a creator")
    )
)]
pub async fn list_promotions(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
) -> Result<ApiOk<PromotionListResponse>, ApiError> {
    let storage = state.storage();
    let repo = PromotionRepository::new(&storage);
    let mut promotions = repo
        .list_by_creator(&user.user_id)
        .map_err(map_storage_error)?;

    let now = Utc::now();
    for promotion in &mut promotions {
        if promotion.observe_expiry(now) {
            repo.update(promotion).map_err(map_storage_error)?;
        }
    }

    let mapped: Vec<PromotionResponse> = promotions.iter().map(promotion_response).collect();
    Ok(ApiOk::new(PromotionListResponse {
        total: mapped.len(),
        promotions: mapped,
    }))
}

/// Get one promotion.
#[utoipa::path(
    get,
    path = "/api/promotions/{promotion_id}",
    tag = "Promotions",
    params(
        ("promotion_id" = String, Path, description = "Promotion ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion details", body = PromotionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_promotion(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
    Path(promotion_id): Path<String>,
) -> Result<ApiOk<PromotionResponse>, ApiError> {
    let storage = state.storage();
    let promotion = load_own_promotion(&storage, &user, &promotion_id)?;
    Ok(ApiOk::new(promotion_response(&promotion)))
}

/// Pause an active promotion.
#[utoipa::path(
    post,
    path = "/api/promotions/{promotion_id}/pause",
    tag = "Promotions",
    params(
        ("promotion_id" = String, Path, description = "Promotion ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion paused", body = PromotionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Invalid transition"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn pause_promotion(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
    Path(promotion_id): Path<String>,
) -> Result<ApiOk<PromotionResponse>, ApiError> {
    state.rate_limits.check(RateClass::Promotion, &user.user_id)?;

    let storage = state.storage();
    let mut promotion = load_own_promotion(&storage, &user, &promotion_id)?;
    promotion.pause(Utc::now()).map_err(map_transition_error)?;
    PromotionRepository::new(&storage)
        .update(&promotion)
        .map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::PromotionPaused,
        &user,
        "promotion",
        &promotion.promotion_id
    );
    Ok(ApiOk::new(promotion_response(&promotion)))
}

/// Resume a paused promotion.
#[utoipa::path(
    post,
    path = "/api/promotions/{promotion_id}/resume",
    tag = "Promotions",
    params(
        ("promotion_id" = String, Path, description = "Promotion ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion resumed", body = PromotionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Invalid transition (stopped or expired)"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn resume_promotion(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
    Path(promotion_id): Path<String>,
) -> Result<ApiOk<PromotionResponse>, ApiError> {
    state.rate_limits.check(RateClass::Promotion, &user.user_id)?;

    let storage = state.storage();
    let mut promotion = load_own_promotion(&storage, &user, &promotion_id)?;
    let result = promotion.resume(Utc::now());

    // A paused link that slid past expiry lands in `expired`; persist that
    // observation even though the resume itself failed.
    let repo = PromotionRepository::new(&storage);
    repo.update(&promotion).map_err(map_storage_error)?;
    result.map_err(map_transition_error)?;

    audit_log!(
        &storage,
        AuditEventType::PromotionResumed,
        &user,
        "promotion",
        &promotion.promotion_id
    );
    Ok(ApiOk::new(promotion_response(&promotion)))
}

/// Stop a promotion permanently.
#[utoipa::path(
    post,
    path = "/api/promotions/{promotion_id}/stop",
    tag = "Promotions",
    params(
        ("promotion_id" = String, Path, description = "Promotion ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion stopped", body = PromotionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already stopped"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn stop_promotion(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
    Path(promotion_id): Path<String>,
) -> Result<ApiOk<PromotionResponse>, ApiError> {
    state.rate_limits.check(RateClass::Promotion, &user.user_id)?;

    let storage = state.storage();
    let mut promotion = load_own_promotion(&storage, &user, &promotion_id)?;
    promotion.stop(Utc::now()).map_err(map_transition_error)?;
    PromotionRepository::new(&storage)
        .update(&promotion)
        .map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::PromotionStopped,
        &user,
        "promotion",
        &promotion.promotion_id
    );
    Ok(ApiOk::new(promotion_response(&promotion)))
}

/// Extend a promotion's expiry date (revives an expired link).
#[utoipa::path(
    patch,
    path = "/api/promotions/{promotion_id}/expiry",
    tag = "Promotions",
    params(
        ("promotion_id" = String, Path, description = "Promotion ID")
    ),
    request_body = ExtendPromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Expiry extended", body = PromotionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Invalid extension"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn extend_promotion(
    CreatorOnly(user): CreatorOnly,
    State(state): State<AppState>,
    Path(promotion_id): Path<String>,
    Json(request): Json<ExtendPromotionRequest>,
) -> Result<ApiOk<PromotionResponse>, ApiError> {
    state.rate_limits.check(RateClass::Promotion, &user.user_id)?;

    let storage = state.storage();
    let mut promotion = load_own_promotion(&storage, &user, &promotion_id)?;
    promotion
        .extend(request.expires_at, Utc::now())
        .map_err(map_transition_error)?;
    PromotionRepository::new(&storage)
        .update(&promotion)
        .map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::PromotionExtended,
        &user,
        "promotion",
        &promotion.promotion_id
    );
    Ok(ApiOk::new(promotion_response(&promotion)))
}

/// Resolve a public promotion code and count the click.
///
/// No authentication: this is the link shared by creators.
#[utoipa::path(
    get,
    path = "/p/{code}",
    tag = "Promotions",
    params(
        ("code" = String, Path, description = "Public promotion code")
    ),
    responses(
        (status = 200, description = "Promotion resolved", body = PromotionResolveResponse),
        (status = 404, description = "Unknown code"),
        (status = 410, description = "Link expired or stopped")
    )
)]
pub async fn resolve_promotion(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<ApiOk<PromotionResolveResponse>, ApiError> {
    let storage = state.storage();
    let repo = PromotionRepository::new(&storage);
    let mut promotion = repo
        .find_by_code(&code.trim().to_ascii_lowercase())
        .map_err(map_storage_error)?
        .ok_or_else(|| ApiError::not_found("Unknown promotion code"))?;

    if promotion.observe_expiry(Utc::now()) {
        repo.update(&promotion).map_err(map_storage_error)?;
    }

    match promotion.status {
        PromotionStatus::Active => {}
        PromotionStatus::Paused => {
            return Err(ApiError::not_found("Unknown promotion code"));
        }
        PromotionStatus::Stopped | PromotionStatus::Expired => {
            return Err(ApiError::gone("This promotion link is no longer active"));
        }
    }

    promotion.clicks += 1;
    promotion.updated_at = Utc::now();
    repo.update(&promotion).map_err(map_storage_error)?;

    Ok(ApiOk::new(PromotionResolveResponse {
        code: promotion.code,
        property_id: promotion.property_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_validation() {
        assert_eq!(validate_code(" Lekki-3Bed ").unwrap(), "lekki-3bed");
        assert!(validate_code("ab").is_err());
        assert!(validate_code("has space").is_err());
        assert!(validate_code("under_score").is_err());
    }

    #[test]
    fn generated_codes_are_short_and_valid() {
        let code = generate_code();
        assert_eq!(code.len(), 8);
        assert!(validate_code(&code).is_ok());
    }
}
