// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Transaction history endpoints.
//!
//! Reads refresh in-flight withdrawals against the gateway opportunistically,
//! so a transfer that settled (or failed) out-of-band converges without
//! waiting for an explicit client action.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use crate::{
    audit_log,
    auth::{Auth, AuthenticatedUser},
    error::{ApiError, ApiOk},
    gateway::{GatewayExecutionStatus, PaystackClient},
    ledger::{EntryKind, EntryStatus, LedgerDb, LedgerEntry},
    state::AppState,
    storage::AuditEventType,
};

use super::funds::{map_ledger_error, transaction_response, TransactionResponse};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

/// Query params for listing transactions.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionListQuery {
    /// Maximum number of results (default 50, max 200).
    pub limit: Option<usize>,
}

/// List response for transactions.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    /// Newest-first ledger entries.
    pub transactions: Vec<TransactionResponse>,
    /// Number of entries returned.
    pub total: usize,
}

/// Best-effort refresh of an in-flight withdrawal against the gateway.
async fn try_refresh_withdrawal(
    state: &AppState,
    ledger: &LedgerDb,
    user: &AuthenticatedUser,
    entry: &mut LedgerEntry,
) {
    if entry.kind != EntryKind::Withdrawal || entry.status != EntryStatus::Processing {
        return;
    }
    let Some(transfer_code) = entry.transfer_code.clone() else {
        return;
    };
    if !PaystackClient::is_configured() {
        return;
    }
    let client = match PaystackClient::from_env() {
        Ok(client) => client,
        Err(error) => {
            warn!(error = %error, "skipping withdrawal refresh due to configuration error");
            return;
        }
    };

    let status = match client.fetch_transfer_status(&transfer_code).await {
        Ok(status) => status,
        Err(error) => {
            warn!(
                transaction_id = %entry.entry_id,
                error = %error,
                "failed to refresh transfer status from gateway"
            );
            return;
        }
    };

    let storage = state.storage();
    let refreshed = match status {
        GatewayExecutionStatus::Completed => {
            match ledger.settle_withdrawal(&entry.entry_id, &transfer_code) {
                Ok(settled) => {
                    audit_log!(
                        &storage,
                        AuditEventType::WithdrawalSettled,
                        user,
                        "transaction",
                        &settled.entry_id
                    );
                    Some(settled)
                }
                Err(error) => {
                    warn!(transaction_id = %entry.entry_id, error = %error, "failed to settle refreshed withdrawal");
                    None
                }
            }
        }
        GatewayExecutionStatus::Failed => {
            match ledger.reverse_withdrawal(&entry.entry_id, "transfer failed at gateway") {
                Ok(reversed) => {
                    audit_log!(
                        &storage,
                        AuditEventType::WithdrawalFailed,
                        user,
                        "transaction",
                        &reversed.entry_id
                    );
                    Some(reversed)
                }
                Err(error) => {
                    warn!(transaction_id = %entry.entry_id, error = %error, "failed to reverse refreshed withdrawal");
                    None
                }
            }
        }
        GatewayExecutionStatus::Pending => None,
    };

    if let Some(refreshed) = refreshed {
        *entry = refreshed;
    }
}

/// List the caller's transactions, newest first.
#[utoipa::path(
    get,
    path = "/api/transactions",
    tag = "Funds",
    params(TransactionListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transactions listed", body = TransactionListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_transactions(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<ApiOk<TransactionListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let ledger = state.ledger();
    let account = ledger
        .get_or_create_for_owner(&user.user_id, "NGN")
        .map_err(map_ledger_error)?;

    let mut entries = ledger
        .list_entries_by_wallet(&account.wallet_id, limit)
        .map_err(map_ledger_error)?;

    for entry in &mut entries {
        try_refresh_withdrawal(&state, &ledger, &user, entry).await;
    }

    let mapped: Vec<TransactionResponse> = entries.iter().map(transaction_response).collect();
    Ok(ApiOk::new(TransactionListResponse {
        total: mapped.len(),
        transactions: mapped,
    }))
}

/// Get one transaction by ID.
#[utoipa::path(
    get,
    path = "/api/transactions/{transaction_id}",
    tag = "Funds",
    params(
        ("transaction_id" = String, Path, description = "Transaction ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transaction details", body = TransactionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_transaction(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<ApiOk<TransactionResponse>, ApiError> {
    let ledger = state.ledger();
    let mut entry = ledger
        .get_entry(&transaction_id)
        .map_err(|_| ApiError::not_found("Transaction not found"))?;

    let account = ledger
        .get_account(&entry.wallet_id)
        .map_err(map_ledger_error)?;
    if account.owner_user_id != user.user_id {
        return Err(ApiError::forbidden("You do not own this transaction"));
    }

    try_refresh_withdrawal(&state, &ledger, &user, &mut entry).await;
    Ok(ApiOk::new(transaction_response(&entry)))
}
