// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Liveness endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when storage and ledger respond, `degraded` otherwise.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Service liveness. Unauthenticated.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
        (status = 503, description = "A storage component is failing", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let storage_ok = state.storage().health_check().is_ok();
    let ledger_ok = state.ledger().health_check().is_ok();

    let (status_code, status) = if storage_ok && ledger_ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
