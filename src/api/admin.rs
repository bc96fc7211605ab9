// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Admin-only API endpoints for marketplace operations.
//!
//! These endpoints require the Admin role and provide:
//! - System statistics
//! - The listing moderation queue (approve / reject)
//! - Wallet suspension controls
//! - Audit log queries

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    audit_log,
    auth::AdminOnly,
    error::{ApiError, ApiOk},
    ledger::WalletStatus,
    state::AppState,
    storage::{
        AuditEvent, AuditRepository, AuditEventType, HandoverRepository, PromotionRepository,
        PropertyRepository, PropertyStatus,
    },
};

use crate::api::funds::map_ledger_error;
use crate::api::money::format_minor;
use crate::api::properties::{map_storage_error, property_response, PropertyListResponse, PropertyResponse};

// ============================================================================
// Request/Response Types
// ============================================================================

/// System statistics response.
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemStatsResponse {
    /// Total number of wallets.
    pub total_wallets: usize,
    /// Number of suspended wallets.
    pub suspended_wallets: usize,
    /// Total number of property listings.
    pub total_properties: usize,
    /// Listings waiting for moderation.
    pub pending_review_properties: usize,
    /// Publicly listed properties.
    pub listed_properties: usize,
    /// Total number of promotion links.
    pub total_promotions: usize,
    /// Total number of handovers.
    pub total_handovers: usize,
    /// Server uptime in seconds.
    pub uptime_seconds: u64,
    /// Current timestamp.
    pub timestamp: String,
}

/// Admin wallet list item (shows all wallets regardless of owner).
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminWalletItem {
    /// Wallet unique identifier.
    pub wallet_id: String,
    /// Owner's user ID.
    pub owner_user_id: String,
    /// Spendable balance as a decimal string.
    pub available_balance: String,
    /// Locked balance as a decimal string.
    pub locked_balance: String,
    /// Wallet status.
    pub status: WalletStatus,
    /// Whether the withdrawal PIN is set up.
    pub is_setup: bool,
    /// When the wallet was created.
    pub created_at: String,
}

/// Response for admin wallet list.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminWalletListResponse {
    /// List of all wallets.
    pub wallets: Vec<AdminWalletItem>,
    /// Total count.
    pub total: usize,
}

/// Query parameters for the moderation queue.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ModerationQueueQuery {
    /// Status filter (default `pending_review`).
    pub status: Option<String>,
}

/// Request body for rejecting a listing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectPropertyRequest {
    /// Reason shown to the owner.
    pub reason: String,
}

/// Query parameters for audit log queries.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    /// Start date (YYYY-MM-DD format).
    pub start_date: Option<String>,
    /// End date (YYYY-MM-DD format).
    pub end_date: Option<String>,
    /// Filter by user ID.
    pub user_id: Option<String>,
    /// Filter by resource type.
    pub resource_type: Option<String>,
    /// Maximum number of results (default 100).
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
}

/// Response for audit log queries.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    /// Audit events matching the query.
    pub events: Vec<AuditEvent>,
    /// Total count (before limit/offset).
    pub total: usize,
    /// Whether there are more results.
    pub has_more: bool,
}

/// Component health for the detailed admin view.
#[derive(Debug, Serialize, ToSchema)]
pub struct DetailedHealthResponse {
    /// Overall status: `ok` or `degraded`.
    pub status: String,
    /// Document store health.
    pub storage: String,
    /// Wallet ledger health.
    pub ledger: String,
    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// System statistics.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "System statistics", body = SystemStatsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn get_system_stats(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
) -> Result<ApiOk<SystemStatsResponse>, ApiError> {
    let storage = state.storage();
    let ledger = state.ledger();

    let wallets = ledger.list_accounts().map_err(map_ledger_error)?;
    let properties = PropertyRepository::new(&storage)
        .list_all()
        .map_err(map_storage_error)?;
    let promotions = PromotionRepository::new(&storage)
        .list_all()
        .map_err(map_storage_error)?;
    let handovers = HandoverRepository::new(&storage)
        .list_all()
        .map_err(map_storage_error)?;

    audit_log!(&storage, AuditEventType::AdminAccess, &user);

    Ok(ApiOk::new(SystemStatsResponse {
        total_wallets: wallets.len(),
        suspended_wallets: wallets
            .iter()
            .filter(|w| w.status == WalletStatus::Suspended)
            .count(),
        total_properties: properties.len(),
        pending_review_properties: properties
            .iter()
            .filter(|p| p.status == PropertyStatus::PendingReview)
            .count(),
        listed_properties: properties
            .iter()
            .filter(|p| p.status == PropertyStatus::Listed)
            .count(),
        total_promotions: promotions.len(),
        total_handovers: handovers.len(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// List every wallet (admin view).
#[utoipa::path(
    get,
    path = "/api/admin/wallets",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All wallets", body = AdminWalletListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_all_wallets(
    AdminOnly(_user): AdminOnly,
    State(state): State<AppState>,
) -> Result<ApiOk<AdminWalletListResponse>, ApiError> {
    let ledger = state.ledger();
    let wallets = ledger.list_accounts().map_err(map_ledger_error)?;

    let mapped: Vec<AdminWalletItem> = wallets
        .iter()
        .map(|w| AdminWalletItem {
            wallet_id: w.wallet_id.clone(),
            owner_user_id: w.owner_user_id.clone(),
            available_balance: format_minor(w.available_minor),
            locked_balance: format_minor(w.locked_minor),
            status: w.status,
            is_setup: w.is_setup,
            created_at: w.created_at.to_rfc3339(),
        })
        .collect();

    Ok(ApiOk::new(AdminWalletListResponse {
        total: mapped.len(),
        wallets: mapped,
    }))
}

/// Suspend a wallet (freezes deposits and withdrawals).
#[utoipa::path(
    post,
    path = "/api/admin/wallets/{wallet_id}/suspend",
    tag = "Admin",
    params(
        ("wallet_id" = String, Path, description = "Wallet ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Wallet suspended"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn suspend_wallet(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<ApiOk<serde_json::Value>, ApiError> {
    let ledger = state.ledger();
    let account = ledger
        .mutate_account(&wallet_id, |account| {
            account.status = WalletStatus::Suspended;
        })
        .map_err(map_ledger_error)?;

    let storage = state.storage();
    audit_log!(
        &storage,
        AuditEventType::WalletSuspended,
        &user,
        "wallet",
        &account.wallet_id
    );

    Ok(ApiOk::new(serde_json::json!({
        "wallet_id": account.wallet_id,
        "status": account.status,
    })))
}

/// Re-activate a suspended wallet.
#[utoipa::path(
    post,
    path = "/api/admin/wallets/{wallet_id}/activate",
    tag = "Admin",
    params(
        ("wallet_id" = String, Path, description = "Wallet ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Wallet activated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn activate_wallet(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<ApiOk<serde_json::Value>, ApiError> {
    let ledger = state.ledger();
    let account = ledger
        .mutate_account(&wallet_id, |account| {
            account.status = WalletStatus::Active;
        })
        .map_err(map_ledger_error)?;

    let storage = state.storage();
    audit_log!(
        &storage,
        AuditEventType::WalletActivated,
        &user,
        "wallet",
        &account.wallet_id
    );

    Ok(ApiOk::new(serde_json::json!({
        "wallet_id": account.wallet_id,
        "status": account.status,
    })))
}

fn parse_status_filter(raw: Option<&str>) -> Result<PropertyStatus, ApiError> {
    match raw.unwrap_or("pending_review") {
        "pending_review" => Ok(PropertyStatus::PendingReview),
        "listed" => Ok(PropertyStatus::Listed),
        "rejected" => Ok(PropertyStatus::Rejected),
        "sold" => Ok(PropertyStatus::Sold),
        "delisted" => Ok(PropertyStatus::Delisted),
        other => Err(ApiError::bad_request(format!(
            "Unknown status filter `{other}`"
        ))),
    }
}

/// The listing moderation queue.
#[utoipa::path(
    get,
    path = "/api/admin/properties",
    tag = "Admin",
    params(ModerationQueueQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Listings in the requested status", body = PropertyListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn moderation_queue(
    AdminOnly(_user): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<ModerationQueueQuery>,
) -> Result<ApiOk<PropertyListResponse>, ApiError> {
    let status = parse_status_filter(query.status.as_deref())?;

    let storage = state.storage();
    let properties = PropertyRepository::new(&storage)
        .list_by_status(status)
        .map_err(map_storage_error)?;

    let mapped: Vec<PropertyResponse> = properties.iter().map(property_response).collect();
    Ok(ApiOk::new(PropertyListResponse {
        total: mapped.len(),
        properties: mapped,
    }))
}

/// Approve a pending listing.
#[utoipa::path(
    post,
    path = "/api/admin/properties/{property_id}/approve",
    tag = "Admin",
    params(
        ("property_id" = String, Path, description = "Property ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Listing approved", body = PropertyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Not awaiting review")
    )
)]
pub async fn approve_property(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> Result<ApiOk<PropertyResponse>, ApiError> {
    let storage = state.storage();
    let repo = PropertyRepository::new(&storage);
    let mut property = repo
        .get(&property_id)
        .map_err(|_| ApiError::not_found("Property not found"))?;

    if property.status != PropertyStatus::PendingReview {
        return Err(ApiError::conflict("Listing is not awaiting review"));
    }

    property.status = PropertyStatus::Listed;
    property.rejection_reason = None;
    property.updated_at = Utc::now();
    repo.update(&property).map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::PropertyApproved,
        &user,
        "property",
        &property.property_id
    );
    Ok(ApiOk::new(property_response(&property)))
}

/// Reject a pending listing with a reason.
#[utoipa::path(
    post,
    path = "/api/admin/properties/{property_id}/reject",
    tag = "Admin",
    params(
        ("property_id" = String, Path, description = "Property ID")
    ),
    request_body = RejectPropertyRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Listing rejected", body = PropertyResponse),
        (status = 400, description = "Reason is required"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Not awaiting review")
    )
)]
pub async fn reject_property(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    Json(request): Json<RejectPropertyRequest>,
) -> Result<ApiOk<PropertyResponse>, ApiError> {
    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::bad_request("A rejection reason is required"));
    }

    let storage = state.storage();
    let repo = PropertyRepository::new(&storage);
    let mut property = repo
        .get(&property_id)
        .map_err(|_| ApiError::not_found("Property not found"))?;

    if property.status != PropertyStatus::PendingReview {
        return Err(ApiError::conflict("Listing is not awaiting review"));
    }

    property.status = PropertyStatus::Rejected;
    property.rejection_reason = Some(reason.to_string());
    property.updated_at = Utc::now();
    repo.update(&property).map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::PropertyRejected,
        &user,
        "property",
        &property.property_id
    );
    Ok(ApiOk::new(property_response(&property)))
}

/// Query audit logs.
#[utoipa::path(
    get,
    path = "/api/admin/audit",
    tag = "Admin",
    params(AuditQueryParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Audit events", body = AuditLogResponse),
        (status = 400, description = "Invalid date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn query_audit_logs(
    AdminOnly(_user): AdminOnly,
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<ApiOk<AuditLogResponse>, ApiError> {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let start = params.start_date.unwrap_or_else(|| today.clone());
    let end = params.end_date.unwrap_or(today);

    let storage = state.storage();
    let mut events = AuditRepository::new(&storage)
        .read_events_range(&start, &end)
        .map_err(|e| ApiError::bad_request(format!("Invalid audit query: {e}")))?;

    if let Some(user_id) = &params.user_id {
        events.retain(|e| e.user_id.as_deref() == Some(user_id));
    }
    if let Some(resource_type) = &params.resource_type {
        events.retain(|e| e.resource_type.as_deref() == Some(resource_type));
    }

    let total = events.len();
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);
    let events: Vec<AuditEvent> = events.into_iter().skip(offset).take(limit).collect();
    let has_more = offset + events.len() < total;

    Ok(ApiOk::new(AuditLogResponse {
        events,
        total,
        has_more,
    }))
}

/// Detailed component health.
#[utoipa::path(
    get,
    path = "/api/admin/health",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Component health", body = DetailedHealthResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn get_detailed_health(
    AdminOnly(_user): AdminOnly,
    State(state): State<AppState>,
) -> Result<ApiOk<DetailedHealthResponse>, ApiError> {
    let storage_status = match state.storage().health_check() {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {e}"),
    };
    let ledger_status = match state.ledger().health_check() {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {e}"),
    };

    let status = if storage_status == "ok" && ledger_status == "ok" {
        "ok"
    } else {
        "degraded"
    };

    Ok(ApiOk::new(DetailedHealthResponse {
        status: status.to_string(),
        storage: storage_status,
        ledger: ledger_status,
        uptime_seconds: state.uptime_seconds(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_parses_known_values() {
        assert_eq!(
            parse_status_filter(None).unwrap(),
            PropertyStatus::PendingReview
        );
        assert_eq!(
            parse_status_filter(Some("listed")).unwrap(),
            PropertyStatus::Listed
        );
        assert!(parse_status_filter(Some("bogus")).is_err());
    }
}
