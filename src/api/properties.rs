// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Property listing endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{Auth, OptionalAuth},
    error::{ApiError, ApiOk},
    state::AppState,
    storage::{
        AuditEventType, HandoverRepository, HandoverStatus, PropertyRepository, PropertyStatus,
        StorageError, StoredHandover, StoredProperty,
    },
};

use super::money::{format_minor, parse_amount_to_minor};

/// Request body for creating a property listing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePropertyRequest {
    /// Listing title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// City / area string.
    pub location: String,
    /// Asking price as a decimal string.
    pub price: String,
    /// Number of bedrooms.
    pub bedrooms: u16,
    /// Number of bathrooms.
    pub bathrooms: u16,
    /// Interior size in square meters.
    pub square_meters: u32,
}

/// Request body for updating a listing. All fields optional.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePropertyRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub bedrooms: Option<u16>,
    pub bathrooms: Option<u16>,
    pub square_meters: Option<u32>,
}

/// Request body for marking a listing sold.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkSoldRequest {
    /// Buyer's user ID.
    pub buyer_user_id: String,
}

/// A property listing as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PropertyResponse {
    /// Property unique identifier.
    pub property_id: String,
    /// Owner's user ID.
    pub owner_user_id: String,
    /// Listing title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Location.
    pub location: String,
    /// Asking price as a decimal string.
    pub price: String,
    /// ISO currency code.
    pub currency: String,
    /// Bedrooms.
    pub bedrooms: u16,
    /// Bathrooms.
    pub bathrooms: u16,
    /// Square meters.
    pub square_meters: u32,
    /// Current status.
    pub status: PropertyStatus,
    /// Rejection reason, when moderation rejected the listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Creation time.
    pub created_at: String,
    /// Last update time.
    pub updated_at: String,
}

pub(super) fn property_response(property: &StoredProperty) -> PropertyResponse {
    PropertyResponse {
        property_id: property.property_id.clone(),
        owner_user_id: property.owner_user_id.clone(),
        title: property.title.clone(),
        description: property.description.clone(),
        location: property.location.clone(),
        price: format_minor(property.price_minor),
        currency: property.currency.clone(),
        bedrooms: property.bedrooms,
        bathrooms: property.bathrooms,
        square_meters: property.square_meters,
        status: property.status,
        rejection_reason: property.rejection_reason.clone(),
        created_at: property.created_at.to_rfc3339(),
        updated_at: property.updated_at.to_rfc3339(),
    }
}

/// List response for properties.
#[derive(Debug, Serialize, ToSchema)]
pub struct PropertyListResponse {
    /// Listings.
    pub properties: Vec<PropertyResponse>,
    /// Total count.
    pub total: usize,
}

pub(super) fn map_storage_error(error: StorageError) -> ApiError {
    match error {
        StorageError::NotFound(message) => ApiError::not_found(message),
        StorageError::AlreadyExists(message) => ApiError::conflict(message),
        StorageError::PermissionDenied { .. } => {
            ApiError::forbidden("You do not have access to this resource")
        }
        other => ApiError::internal(format!("Storage operation failed: {other}")),
    }
}

fn non_empty(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Submit a new property listing for moderation.
#[utoipa::path(
    post,
    path = "/api/properties",
    tag = "Properties",
    request_body = CreatePropertyRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Listing submitted for review", body = PropertyResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_property(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, ApiOk<PropertyResponse>), ApiError> {
    let title = non_empty(&request.title, "title")?;
    let description = non_empty(&request.description, "description")?;
    let location = non_empty(&request.location, "location")?;
    let (_, price_minor) = parse_amount_to_minor(&request.price)?;

    let now = Utc::now();
    let property = StoredProperty {
        property_id: uuid::Uuid::new_v4().to_string(),
        owner_user_id: user.user_id.clone(),
        title,
        description,
        location,
        price_minor,
        currency: "NGN".to_string(),
        bedrooms: request.bedrooms,
        bathrooms: request.bathrooms,
        square_meters: request.square_meters,
        status: PropertyStatus::PendingReview,
        rejection_reason: None,
        buyer_user_id: None,
        created_at: now,
        updated_at: now,
    };

    let storage = state.storage();
    let repo = PropertyRepository::new(&storage);
    repo.create(&property).map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::PropertySubmitted,
        &user,
        "property",
        &property.property_id
    );

    Ok((StatusCode::CREATED, ApiOk::new(property_response(&property))))
}

/// Browse publicly listed properties.
#[utoipa::path(
    get,
    path = "/api/properties",
    tag = "Properties",
    responses(
        (status = 200, description = "Listed properties", body = PropertyListResponse)
    )
)]
pub async fn list_properties(
    OptionalAuth(_user): OptionalAuth,
    State(state): State<AppState>,
) -> Result<ApiOk<PropertyListResponse>, ApiError> {
    let storage = state.storage();
    let repo = PropertyRepository::new(&storage);
    let properties = repo
        .list_by_status(PropertyStatus::Listed)
        .map_err(map_storage_error)?;

    let mapped: Vec<PropertyResponse> = properties.iter().map(property_response).collect();
    Ok(ApiOk::new(PropertyListResponse {
        total: mapped.len(),
        properties: mapped,
    }))
}

/// List the caller's own properties (all statuses).
#[utoipa::path(
    get,
    path = "/api/properties/mine",
    tag = "Properties",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own properties", body = PropertyListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_my_properties(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<ApiOk<PropertyListResponse>, ApiError> {
    let storage = state.storage();
    let repo = PropertyRepository::new(&storage);
    let properties = repo
        .list_by_owner(&user.user_id)
        .map_err(map_storage_error)?;

    let mapped: Vec<PropertyResponse> = properties.iter().map(property_response).collect();
    Ok(ApiOk::new(PropertyListResponse {
        total: mapped.len(),
        properties: mapped,
    }))
}

/// Get one property.
///
/// Unlisted properties are only visible to their owner and admins.
#[utoipa::path(
    get,
    path = "/api/properties/{property_id}",
    tag = "Properties",
    params(
        ("property_id" = String, Path, description = "Property ID")
    ),
    responses(
        (status = 200, description = "Property details", body = PropertyResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_property(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> Result<ApiOk<PropertyResponse>, ApiError> {
    let storage = state.storage();
    let repo = PropertyRepository::new(&storage);
    let property = repo
        .get(&property_id)
        .map_err(|_| ApiError::not_found("Property not found"))?;

    let visible = property.status == PropertyStatus::Listed
        || property.status == PropertyStatus::Sold
        || user
            .as_ref()
            .map(|u| u.user_id == property.owner_user_id || u.is_admin())
            .unwrap_or(false);
    if !visible {
        // Hide moderation state from strangers
        return Err(ApiError::not_found("Property not found"));
    }

    Ok(ApiOk::new(property_response(&property)))
}

/// Update an own listing.
///
/// Editing a listed or rejected property sends it back to moderation.
#[utoipa::path(
    patch,
    path = "/api/properties/{property_id}",
    tag = "Properties",
    params(
        ("property_id" = String, Path, description = "Property ID")
    ),
    request_body = UpdatePropertyRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Listing updated", body = PropertyResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Sold listings cannot be edited")
    )
)]
pub async fn update_property(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    Json(request): Json<UpdatePropertyRequest>,
) -> Result<ApiOk<PropertyResponse>, ApiError> {
    let storage = state.storage();
    let repo = PropertyRepository::new(&storage);
    let mut property = repo
        .get(&property_id)
        .map_err(|_| ApiError::not_found("Property not found"))?;

    if property.owner_user_id != user.user_id {
        return Err(ApiError::forbidden("You do not own this property"));
    }
    if property.status == PropertyStatus::Sold {
        return Err(ApiError::conflict("Sold listings cannot be edited"));
    }

    if let Some(title) = request.title {
        property.title = non_empty(&title, "title")?;
    }
    if let Some(description) = request.description {
        property.description = non_empty(&description, "description")?;
    }
    if let Some(location) = request.location {
        property.location = non_empty(&location, "location")?;
    }
    if let Some(price) = request.price {
        let (_, price_minor) = parse_amount_to_minor(&price)?;
        property.price_minor = price_minor;
    }
    if let Some(bedrooms) = request.bedrooms {
        property.bedrooms = bedrooms;
    }
    if let Some(bathrooms) = request.bathrooms {
        property.bathrooms = bathrooms;
    }
    if let Some(square_meters) = request.square_meters {
        property.square_meters = square_meters;
    }

    // Edits re-enter moderation; rejection context is cleared
    property.status = PropertyStatus::PendingReview;
    property.rejection_reason = None;
    property.updated_at = Utc::now();
    repo.update(&property).map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::PropertyUpdated,
        &user,
        "property",
        &property.property_id
    );

    Ok(ApiOk::new(property_response(&property)))
}

/// Take an own listing off the market.
#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/delist",
    tag = "Properties",
    params(
        ("property_id" = String, Path, description = "Property ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Listing delisted", body = PropertyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Sold listings cannot be delisted")
    )
)]
pub async fn delist_property(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> Result<ApiOk<PropertyResponse>, ApiError> {
    let storage = state.storage();
    let repo = PropertyRepository::new(&storage);
    let mut property = repo
        .get(&property_id)
        .map_err(|_| ApiError::not_found("Property not found"))?;

    if property.owner_user_id != user.user_id {
        return Err(ApiError::forbidden("You do not own this property"));
    }
    if property.status == PropertyStatus::Sold {
        return Err(ApiError::conflict("Sold listings cannot be delisted"));
    }

    property.status = PropertyStatus::Delisted;
    property.updated_at = Utc::now();
    repo.update(&property).map_err(map_storage_error)?;

    Ok(ApiOk::new(property_response(&property)))
}

/// Mark a listed property as sold and open its handover.
#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/mark-sold",
    tag = "Properties",
    params(
        ("property_id" = String, Path, description = "Property ID")
    ),
    request_body = MarkSoldRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Property sold; handover opened", body = PropertyResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Only listed properties can be sold")
    )
)]
pub async fn mark_property_sold(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    Json(request): Json<MarkSoldRequest>,
) -> Result<ApiOk<PropertyResponse>, ApiError> {
    let buyer_user_id = non_empty(&request.buyer_user_id, "buyer_user_id")?;
    if buyer_user_id == user.user_id {
        return Err(ApiError::bad_request("Buyer cannot be the seller"));
    }

    let storage = state.storage();
    let repo = PropertyRepository::new(&storage);
    let mut property = repo
        .get(&property_id)
        .map_err(|_| ApiError::not_found("Property not found"))?;

    if property.owner_user_id != user.user_id {
        return Err(ApiError::forbidden("You do not own this property"));
    }
    if property.status != PropertyStatus::Listed {
        return Err(ApiError::conflict("Only listed properties can be sold"));
    }

    property.status = PropertyStatus::Sold;
    property.buyer_user_id = Some(buyer_user_id.clone());
    property.updated_at = Utc::now();
    repo.update(&property).map_err(map_storage_error)?;

    // One handover per sale, opened at the moment of sale
    let now = Utc::now();
    let handover = StoredHandover {
        handover_id: uuid::Uuid::new_v4().to_string(),
        property_id: property.property_id.clone(),
        seller_user_id: user.user_id.clone(),
        buyer_user_id,
        status: HandoverStatus::AwaitingDocuments,
        documents: Vec::new(),
        signed_at: None,
        keys_released_at: None,
        created_at: now,
        updated_at: now,
    };
    HandoverRepository::new(&storage)
        .create(&handover)
        .map_err(map_storage_error)?;

    audit_log!(
        &storage,
        AuditEventType::PropertySold,
        &user,
        "property",
        &property.property_id
    );
    audit_log!(
        &storage,
        AuditEventType::HandoverOpened,
        &user,
        "handover",
        &handover.handover_id
    );

    Ok(ApiOk::new(property_response(&property)))
}
