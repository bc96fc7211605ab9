// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Handover workflow endpoints.
//!
//! The handover itself is opened when a property is marked sold (see
//! `api::properties::mark_property_sold`); these endpoints drive it
//! through documents → signature → key release. Party checks are explicit:
//! the seller submits documents and releases keys, the buyer signs.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::Auth,
    error::{ApiError, ApiOk},
    state::AppState,
    storage::{
        AuditEventType, DocumentStore, HandoverDocument, HandoverRepository, HandoverStatus,
        HandoverTransitionError, StoredHandover,
    },
};

use super::properties::map_storage_error;

/// One document in a submission request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitDocumentRequest {
    /// Display name (e.g. "Deed of Assignment").
    pub name: String,
    /// Where the uploaded document lives.
    pub uri: String,
}

/// Request body for submitting sale documents.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitDocumentsRequest {
    /// Documents to attach (replaces any prior submission).
    pub documents: Vec<SubmitDocumentRequest>,
}

/// A handover as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HandoverResponse {
    /// Handover unique identifier.
    pub handover_id: String,
    /// Property being handed over.
    pub property_id: String,
    /// Selling user.
    pub seller_user_id: String,
    /// Buying user.
    pub buyer_user_id: String,
    /// Current stage.
    pub status: HandoverStatus,
    /// Submitted documents.
    pub documents: Vec<HandoverDocument>,
    /// When the buyer signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<String>,
    /// When the keys were released.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys_released_at: Option<String>,
    /// Creation time.
    pub created_at: String,
    /// Last update time.
    pub updated_at: String,
}

fn handover_response(handover: &StoredHandover) -> HandoverResponse {
    HandoverResponse {
        handover_id: handover.handover_id.clone(),
        property_id: handover.property_id.clone(),
        seller_user_id: handover.seller_user_id.clone(),
        buyer_user_id: handover.buyer_user_id.clone(),
        status: handover.status,
        documents: handover.documents.clone(),
        signed_at: handover.signed_at.map(|t| t.to_rfc3339()),
        keys_released_at: handover.keys_released_at.map(|t| t.to_rfc3339()),
        created_at: handover.created_at.to_rfc3339(),
        updated_at: handover.updated_at.to_rfc3339(),
    }
}

/// List response for handovers.
#[derive(Debug, Serialize, ToSchema)]
pub struct HandoverListResponse {
    /// Handovers where the caller is buyer or seller.
    pub handovers: Vec<HandoverResponse>,
    /// Total count.
    pub total: usize,
}

fn map_transition_error(error: HandoverTransitionError) -> ApiError {
    ApiError::conflict(error.to_string())
}

/// Load a handover the user participates in.
fn load_party_handover(
    storage: &DocumentStore,
    user_id: &str,
    handover_id: &str,
) -> Result<StoredHandover, ApiError> {
    let handover = HandoverRepository::new(storage)
        .get(handover_id)
        .map_err(|_| ApiError::not_found("Handover not found"))?;

    if handover.seller_user_id != user_id && handover.buyer_user_id != user_id {
        return Err(ApiError::forbidden("You are not a party to this handover"));
    }
    Ok(handover)
}

/// List the caller's handovers (as buyer or seller).
#[utoipa::path(
    get,
    path = "/api/handovers",
    tag = "Handovers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Handovers listed", body = HandoverListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_handovers(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<ApiOk<HandoverListResponse>, ApiError> {
    let storage = state.storage();
    let handovers = HandoverRepository::new(&storage)
        .list_by_party(&user.user_id)
        .map_err(map_storage_error)?;

    let mapped: Vec<HandoverResponse> = handovers.iter().map(handover_response).collect();
    Ok(ApiOk::new(HandoverListResponse {
        total: mapped.len(),
        handovers: mapped,
    }))
}

/// Get one handover.
#[utoipa::path(
    get,
    path = "/api/handovers/{handover_id}",
    tag = "Handovers",
    params(
        ("handover_id" = String, Path, description = "Handover ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Handover details", body = HandoverResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a party"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_handover(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(handover_id): Path<String>,
) -> Result<ApiOk<HandoverResponse>, ApiError> {
    let storage = state.storage();
    let handover = load_party_handover(&storage, &user.user_id, &handover_id)?;
    Ok(ApiOk::new(handover_response(&handover)))
}

/// Submit (or re-submit) the sale documents. Seller only.
#[utoipa::path(
    post,
    path = "/api/handovers/{handover_id}/documents",
    tag = "Handovers",
    params(
        ("handover_id" = String, Path, description = "Handover ID")
    ),
    request_body = SubmitDocumentsRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Documents submitted", body = HandoverResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the seller submits documents"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Invalid stage")
    )
)]
pub async fn submit_documents(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(handover_id): Path<String>,
    Json(request): Json<SubmitDocumentsRequest>,
) -> Result<ApiOk<HandoverResponse>, ApiError> {
    if request.documents.is_empty() {
        return Err(ApiError::bad_request("At least one document is required"));
    }

    let storage = state.storage();
    let mut handover = load_party_handover(&storage, &user.user_id, &handover_id)?;
    if handover.seller_user_id != user.user_id {
        return Err(ApiError::forbidden("Only the seller submits documents"));
    }

    let now = Utc::now();
    let documents: Vec<HandoverDocument> = request
        .documents
        .into_iter()
        .map(|doc| {
            let name = doc.name.trim().to_string();
            let uri = doc.uri.trim().to_string();
            if name.is_empty() || uri.is_empty() {
                return Err(ApiError::bad_request("Document name and uri are required"));
            }
            Ok(HandoverDocument {
                name,
                uri,
                submitted_at: now,
            })
        })
        .collect::<Result<_, _>>()?;

    handover
        .submit_documents(documents, now)
        .map_err(map_transition_error)?;
    HandoverRepository::new(&storage)
        .update(&handover)
        .map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::HandoverDocumentsSubmitted,
        &user,
        "handover",
        &handover.handover_id
    );
    Ok(ApiOk::new(handover_response(&handover)))
}

/// Sign the submitted documents. Buyer only.
#[utoipa::path(
    post,
    path = "/api/handovers/{handover_id}/sign",
    tag = "Handovers",
    params(
        ("handover_id" = String, Path, description = "Handover ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Documents signed", body = HandoverResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the buyer signs"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Invalid stage")
    )
)]
pub async fn sign_handover(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(handover_id): Path<String>,
) -> Result<ApiOk<HandoverResponse>, ApiError> {
    let storage = state.storage();
    let mut handover = load_party_handover(&storage, &user.user_id, &handover_id)?;
    if handover.buyer_user_id != user.user_id {
        return Err(ApiError::forbidden("Only the buyer signs"));
    }

    handover.sign(Utc::now()).map_err(map_transition_error)?;
    HandoverRepository::new(&storage)
        .update(&handover)
        .map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::HandoverSigned,
        &user,
        "handover",
        &handover.handover_id
    );
    Ok(ApiOk::new(handover_response(&handover)))
}

/// Release the keys after signature. Seller only; terminal.
#[utoipa::path(
    post,
    path = "/api/handovers/{handover_id}/release-keys",
    tag = "Handovers",
    params(
        ("handover_id" = String, Path, description = "Handover ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Keys released", body = HandoverResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the seller releases keys"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Invalid stage")
    )
)]
pub async fn release_keys(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(handover_id): Path<String>,
) -> Result<ApiOk<HandoverResponse>, ApiError> {
    let storage = state.storage();
    let mut handover = load_party_handover(&storage, &user.user_id, &handover_id)?;
    if handover.seller_user_id != user.user_id {
        return Err(ApiError::forbidden("Only the seller releases keys"));
    }

    handover
        .release_keys(Utc::now())
        .map_err(map_transition_error)?;
    HandoverRepository::new(&storage)
        .update(&handover)
        .map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::HandoverKeysReleased,
        &user,
        "handover",
        &handover.handover_id
    );
    Ok(ApiOk::new(handover_response(&handover)))
}
