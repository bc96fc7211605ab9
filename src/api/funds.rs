// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Deposit and withdrawal endpoints.
//!
//! All balance movement goes through `crate::ledger`; this module owns the
//! HTTP choreography: rate limits, the PIN gate, gateway calls, and the
//! mapping of gateway outcomes onto ledger operations. Withdrawals and
//! retries share one transfer path, so the compensation logic exists
//! exactly once.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{Auth, AuthenticatedUser},
    error::{ApiError, ApiOk},
    gateway::{
        GatewayExecutionStatus, InitializeChargeRequest, PaystackClient,
    },
    ledger::{
        pin, EntryKind, EntryStatus, LedgerDb, LedgerEntry, LedgerError, WalletAccount,
        WalletStatus,
    },
    ratelimit::RateClass,
    state::AppState,
    storage::{AuditEventType, BankAccountRepository},
};

use super::money::{format_minor, parse_amount_to_minor};

/// Request body for initializing a deposit.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDepositRequest {
    /// Amount as a decimal string (e.g. "250.00").
    pub amount: String,
}

/// Request body for initiating (or retrying) a withdrawal.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWithdrawalRequest {
    /// Amount as a decimal string.
    pub amount: String,
    /// Payout bank account to transfer to.
    pub bank_account_id: String,
    /// Withdrawal PIN.
    pub pin: String,
}

/// Request body for retrying a reversed withdrawal.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RetryWithdrawalRequest {
    /// Withdrawal PIN.
    pub pin: String,
}

/// A ledger entry as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionResponse {
    /// Entry unique identifier.
    pub transaction_id: String,
    /// Deposit or withdrawal.
    pub kind: EntryKind,
    /// Current status.
    pub status: EntryStatus,
    /// Amount as a decimal string.
    pub amount: String,
    /// ISO currency code.
    pub currency: String,
    /// Gateway charge reference (deposits).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,
    /// Gateway transfer code (withdrawals).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_code: Option<String>,
    /// Payout bank account (withdrawals).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account_id: Option<String>,
    /// Failure reason, if the gateway declined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Creation time.
    pub created_at: String,
    /// Last update time.
    pub updated_at: String,
}

pub(super) fn transaction_response(entry: &LedgerEntry) -> TransactionResponse {
    TransactionResponse {
        transaction_id: entry.entry_id.clone(),
        kind: entry.kind,
        status: entry.status,
        amount: format_minor(entry.amount_minor),
        currency: entry.currency.clone(),
        gateway_reference: entry.gateway_reference.clone(),
        transfer_code: entry.transfer_code.clone(),
        bank_account_id: entry.bank_account_id.clone(),
        failure_reason: entry.failure_reason.clone(),
        created_at: entry.created_at.to_rfc3339(),
        updated_at: entry.updated_at.to_rfc3339(),
    }
}

/// Response for a freshly initialized deposit.
#[derive(Debug, Serialize, ToSchema)]
pub struct DepositInitResponse {
    /// The pending ledger entry.
    pub transaction: TransactionResponse,
    /// Hosted checkout URL the client must complete.
    pub authorization_url: String,
}

pub(super) fn map_ledger_error(error: LedgerError) -> ApiError {
    match error {
        LedgerError::InsufficientFunds {
            needed_minor,
            available_minor,
        } => ApiError::bad_request(format!(
            "Insufficient available balance: need {}, have {}",
            format_minor(needed_minor),
            format_minor(available_minor)
        )),
        LedgerError::NotFound(message) => ApiError::not_found(message),
        LedgerError::InvalidEntryState { .. } => ApiError::conflict(error.to_string()),
        other => ApiError::internal(format!("Ledger operation failed: {other}")),
    }
}

fn require_gateway() -> Result<PaystackClient, ApiError> {
    if !PaystackClient::is_configured() {
        return Err(ApiError::service_unavailable(
            "Payment gateway is not configured. Set PAYSTACK_* environment variables.",
        ));
    }
    PaystackClient::from_env().map_err(|e| ApiError::service_unavailable(e.to_string()))
}

fn require_active_wallet(
    ledger: &LedgerDb,
    user: &AuthenticatedUser,
) -> Result<WalletAccount, ApiError> {
    let account = ledger
        .get_or_create_for_owner(&user.user_id, "NGN")
        .map_err(|e| ApiError::internal(format!("Failed to access wallet: {e}")))?;

    if account.status == WalletStatus::Suspended {
        return Err(ApiError::forbidden("Wallet is suspended"));
    }
    Ok(account)
}

/// Run the withdrawal PIN gate, persisting attempt-counter changes.
fn enforce_pin_gate(
    state: &AppState,
    user: &AuthenticatedUser,
    account: &WalletAccount,
    pin_value: &str,
) -> Result<(), ApiError> {
    state.rate_limits.check(RateClass::Pin, &user.user_id)?;

    let ledger = state.ledger();
    let now = Utc::now();

    match pin::check_pin(account, pin_value, &state.pin_pepper, now) {
        Ok(()) => {
            if account.failed_pin_attempts > 0 || account.pin_locked_until.is_some() {
                ledger
                    .mutate_account(&account.wallet_id, pin::register_success)
                    .map_err(map_ledger_error)?;
            }
            Ok(())
        }
        Err(pin::PinGateError::NotSetup) => Err(ApiError::bad_request(
            "Withdrawal PIN has not been set up",
        )),
        Err(pin::PinGateError::Locked { until }) => Err(ApiError::forbidden(format!(
            "Withdrawals are locked until {}",
            until.to_rfc3339()
        ))),
        Err(error @ pin::PinGateError::Mismatch { .. }) => {
            let mut locked_now = false;
            ledger
                .mutate_account(&account.wallet_id, |account| {
                    locked_now = pin::register_failure(account, now);
                })
                .map_err(map_ledger_error)?;

            if locked_now {
                let storage = state.storage();
                audit_log!(
                    &storage,
                    AuditEventType::WalletPinLocked,
                    user,
                    "wallet",
                    &account.wallet_id
                );
            }
            Err(ApiError::forbidden(error.to_string()))
        }
    }
}

/// Initiate the gateway transfer for a processing withdrawal and map the
/// outcome onto the ledger. Shared by first attempts and retries.
async fn execute_transfer(
    state: &AppState,
    user: &AuthenticatedUser,
    entry: &LedgerEntry,
    recipient_code: &str,
) -> Result<LedgerEntry, ApiError> {
    let ledger = state.ledger();
    let storage = state.storage();
    let client = require_gateway()?;

    let reference = format!("hearth-wd-{}", entry.entry_id);
    let initiated = match client
        .initiate_transfer(
            recipient_code,
            entry.amount_minor,
            &reference,
            "Hearth wallet withdrawal",
        )
        .await
    {
        Ok(initiated) => initiated,
        Err(error) => {
            // Compensate: the hold is released and balances are exactly
            // where they were before the withdrawal started.
            let reversed = ledger
                .reverse_withdrawal(&entry.entry_id, &error.to_string())
                .map_err(map_ledger_error)?;
            audit_log!(
                &storage,
                AuditEventType::WithdrawalFailed,
                user,
                "transaction",
                &reversed.entry_id
            );
            return Err(ApiError::bad_gateway(format!(
                "Transfer failed and funds were restored: {error}"
            )));
        }
    };

    let final_entry = match initiated.status {
        GatewayExecutionStatus::Completed => {
            let settled = ledger
                .settle_withdrawal(&entry.entry_id, &initiated.transfer_code)
                .map_err(map_ledger_error)?;
            audit_log!(
                &storage,
                AuditEventType::WithdrawalSettled,
                user,
                "transaction",
                &settled.entry_id
            );
            settled
        }
        GatewayExecutionStatus::Failed => {
            let reversed = ledger
                .reverse_withdrawal(&entry.entry_id, "transfer failed at gateway")
                .map_err(map_ledger_error)?;
            audit_log!(
                &storage,
                AuditEventType::WithdrawalFailed,
                user,
                "transaction",
                &reversed.entry_id
            );
            return Err(ApiError::bad_gateway(
                "Transfer failed at the gateway and funds were restored",
            ));
        }
        GatewayExecutionStatus::Pending => ledger
            .attach_transfer_code(&entry.entry_id, &initiated.transfer_code)
            .map_err(map_ledger_error)?,
    };

    Ok(final_entry)
}

/// Initialize a wallet deposit.
#[utoipa::path(
    post,
    path = "/api/funds/deposits",
    tag = "Funds",
    request_body = CreateDepositRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Deposit initialized", body = DepositInitResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Wallet suspended"),
        (status = 429, description = "Rate limited"),
        (status = 502, description = "Gateway error"),
        (status = 503, description = "Gateway not configured")
    )
)]
pub async fn create_deposit(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateDepositRequest>,
) -> Result<(StatusCode, ApiOk<DepositInitResponse>), ApiError> {
    state.rate_limits.check(RateClass::Deposit, &user.user_id)?;

    let (_, amount_minor) = parse_amount_to_minor(&request.amount)?;
    let email = user
        .email
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Account has no email for gateway checkout"))?;

    let ledger = state.ledger();
    let account = require_active_wallet(&ledger, &user)?;
    let client = require_gateway()?;

    let entry_id = uuid::Uuid::new_v4().to_string();
    let reference = format!("hearth-dep-{entry_id}");

    let charge = client
        .initialize_charge(InitializeChargeRequest {
            reference: &reference,
            email,
            amount_minor,
            wallet_id: &account.wallet_id,
        })
        .await
        .map_err(|e| ApiError::bad_gateway(format!("Failed to initialize deposit: {e}")))?;

    let now = Utc::now();
    let entry = LedgerEntry {
        entry_id,
        wallet_id: account.wallet_id.clone(),
        kind: EntryKind::Deposit,
        status: EntryStatus::Pending,
        amount_minor,
        currency: account.currency.clone(),
        gateway_reference: Some(charge.reference.clone()),
        transfer_code: None,
        bank_account_id: None,
        failure_reason: None,
        created_at: now,
        updated_at: now,
    };
    ledger.record_deposit(&entry).map_err(map_ledger_error)?;

    let storage = state.storage();
    audit_log!(
        &storage,
        AuditEventType::DepositInitialized,
        &user,
        "transaction",
        &entry.entry_id
    );

    Ok((
        StatusCode::CREATED,
        ApiOk::new(DepositInitResponse {
            transaction: transaction_response(&entry),
            authorization_url: charge.authorization_url,
        }),
    ))
}

/// Verify a deposit with the gateway and credit the wallet.
///
/// Idempotent: verifying an already successful deposit credits nothing
/// further.
#[utoipa::path(
    post,
    path = "/api/funds/deposits/{transaction_id}/verify",
    tag = "Funds",
    params(
        ("transaction_id" = String, Path, description = "Deposit transaction ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Deposit state after verification", body = TransactionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
        (status = 429, description = "Rate limited"),
        (status = 502, description = "Gateway error")
    )
)]
pub async fn verify_deposit(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<ApiOk<TransactionResponse>, ApiError> {
    state.rate_limits.check(RateClass::Deposit, &user.user_id)?;

    let ledger = state.ledger();
    let entry = ledger
        .get_entry(&transaction_id)
        .map_err(|_| ApiError::not_found("Transaction not found"))?;

    let account = ledger
        .get_account(&entry.wallet_id)
        .map_err(map_ledger_error)?;
    if account.owner_user_id != user.user_id {
        return Err(ApiError::forbidden("You do not own this transaction"));
    }
    if entry.kind != EntryKind::Deposit {
        return Err(ApiError::bad_request("Only deposits can be verified"));
    }

    // Already settled: stay idempotent and skip the gateway round trip
    if entry.status == EntryStatus::Successful {
        return Ok(ApiOk::new(transaction_response(&entry)));
    }
    if entry.status != EntryStatus::Pending {
        return Ok(ApiOk::new(transaction_response(&entry)));
    }

    let reference = entry
        .gateway_reference
        .as_deref()
        .ok_or_else(|| ApiError::internal("Deposit has no gateway reference"))?;

    let client = require_gateway()?;
    let verified = client
        .verify_charge(reference)
        .await
        .map_err(|e| ApiError::bad_gateway(format!("Failed to verify deposit: {e}")))?;

    let storage = state.storage();
    let updated = match verified.status {
        GatewayExecutionStatus::Completed => {
            if verified.amount_minor != entry.amount_minor {
                let failed = ledger
                    .fail_deposit(&entry.entry_id, "gateway amount mismatch")
                    .map_err(map_ledger_error)?;
                warn!(
                    transaction_id = %failed.entry_id,
                    expected = entry.amount_minor,
                    actual = verified.amount_minor,
                    "deposit amount mismatch"
                );
                failed
            } else {
                let settled = ledger
                    .settle_deposit(&entry.entry_id)
                    .map_err(map_ledger_error)?;
                audit_log!(
                    &storage,
                    AuditEventType::DepositVerified,
                    &user,
                    "transaction",
                    &settled.entry_id
                );
                settled
            }
        }
        GatewayExecutionStatus::Failed => ledger
            .fail_deposit(&entry.entry_id, &format!("charge {}", verified.raw_status))
            .map_err(map_ledger_error)?,
        GatewayExecutionStatus::Pending => entry,
    };

    Ok(ApiOk::new(transaction_response(&updated)))
}

/// Initiate a withdrawal to a registered bank account.
#[utoipa::path(
    post,
    path = "/api/funds/withdrawals",
    tag = "Funds",
    request_body = CreateWithdrawalRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Withdrawal initiated", body = TransactionResponse),
        (status = 400, description = "Bad request or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "PIN rejected or wallet suspended"),
        (status = 404, description = "Bank account not found"),
        (status = 429, description = "Rate limited"),
        (status = 502, description = "Transfer failed; funds restored"),
        (status = 503, description = "Gateway not configured")
    )
)]
pub async fn create_withdrawal(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateWithdrawalRequest>,
) -> Result<(StatusCode, ApiOk<TransactionResponse>), ApiError> {
    state.rate_limits.check(RateClass::Withdraw, &user.user_id)?;

    let (_, amount_minor) = parse_amount_to_minor(&request.amount)?;

    let ledger = state.ledger();
    let account = require_active_wallet(&ledger, &user)?;

    enforce_pin_gate(&state, &user, &account, request.pin.trim())?;

    let storage = state.storage();
    let bank_repo = BankAccountRepository::new(&storage);
    let bank_account = bank_repo
        .get(&request.bank_account_id)
        .map_err(|_| ApiError::not_found("Bank account not found"))?;
    if bank_account.owner_user_id != user.user_id {
        return Err(ApiError::forbidden("You do not own this bank account"));
    }

    let now = Utc::now();
    let entry = LedgerEntry {
        entry_id: uuid::Uuid::new_v4().to_string(),
        wallet_id: account.wallet_id.clone(),
        kind: EntryKind::Withdrawal,
        status: EntryStatus::Processing,
        amount_minor,
        currency: account.currency.clone(),
        gateway_reference: None,
        transfer_code: None,
        bank_account_id: Some(bank_account.bank_account_id.clone()),
        failure_reason: None,
        created_at: now,
        updated_at: now,
    };

    // Hold first: the transfer only goes out once the funds are locked
    ledger.hold_for_withdrawal(&entry).map_err(map_ledger_error)?;
    audit_log!(
        &storage,
        AuditEventType::WithdrawalRequested,
        &user,
        "transaction",
        &entry.entry_id
    );

    let final_entry = execute_transfer(&state, &user, &entry, &bank_account.recipient_code).await?;

    Ok((
        StatusCode::CREATED,
        ApiOk::new(transaction_response(&final_entry)),
    ))
}

/// Retry a reversed withdrawal.
///
/// Re-runs the same entry through the shared hold-and-transfer path.
#[utoipa::path(
    post,
    path = "/api/funds/withdrawals/{transaction_id}/retry",
    tag = "Funds",
    params(
        ("transaction_id" = String, Path, description = "Withdrawal transaction ID")
    ),
    request_body = RetryWithdrawalRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Withdrawal re-initiated", body = TransactionResponse),
        (status = 400, description = "Bad request or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "PIN rejected or wallet suspended"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Transaction is not retryable"),
        (status = 429, description = "Rate limited"),
        (status = 502, description = "Transfer failed; funds restored")
    )
)]
pub async fn retry_withdrawal(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    Json(request): Json<RetryWithdrawalRequest>,
) -> Result<ApiOk<TransactionResponse>, ApiError> {
    state.rate_limits.check(RateClass::Withdraw, &user.user_id)?;

    let ledger = state.ledger();
    let entry = ledger
        .get_entry(&transaction_id)
        .map_err(|_| ApiError::not_found("Transaction not found"))?;

    let account = ledger
        .get_account(&entry.wallet_id)
        .map_err(map_ledger_error)?;
    if account.owner_user_id != user.user_id {
        return Err(ApiError::forbidden("You do not own this transaction"));
    }
    if account.status == WalletStatus::Suspended {
        return Err(ApiError::forbidden("Wallet is suspended"));
    }
    if entry.kind != EntryKind::Withdrawal || entry.status != EntryStatus::Reversed {
        return Err(ApiError::conflict(
            "Only reversed withdrawals can be retried",
        ));
    }

    enforce_pin_gate(&state, &user, &account, request.pin.trim())?;

    let bank_account_id = entry
        .bank_account_id
        .as_deref()
        .ok_or_else(|| ApiError::internal("Withdrawal has no bank account"))?;
    let storage = state.storage();
    let bank_account = BankAccountRepository::new(&storage)
        .get(bank_account_id)
        .map_err(|_| ApiError::not_found("Bank account not found"))?;

    let held = ledger
        .retry_withdrawal(&entry.entry_id)
        .map_err(map_ledger_error)?;
    audit_log!(
        &storage,
        AuditEventType::WithdrawalRetried,
        &user,
        "transaction",
        &held.entry_id
    );

    let final_entry = execute_transfer(&state, &user, &held, &bank_account.recipient_code).await?;

    Ok(ApiOk::new(transaction_response(&final_entry)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_api_statuses() {
        let err = map_ledger_error(LedgerError::InsufficientFunds {
            needed_minor: 10_000,
            available_minor: 2_500,
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("100.00"));
        assert!(err.message.contains("25.00"));

        let err = map_ledger_error(LedgerError::NotFound("Wallet w-1".to_string()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = map_ledger_error(LedgerError::InvalidEntryState {
            entry_id: "e-1".to_string(),
            status: "successful",
            expected: "reversed",
        });
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn transaction_response_formats_amounts() {
        let entry = LedgerEntry {
            entry_id: "e-1".to_string(),
            wallet_id: "w-1".to_string(),
            kind: EntryKind::Deposit,
            status: EntryStatus::Pending,
            amount_minor: 123_456,
            currency: "NGN".to_string(),
            gateway_reference: Some("hearth-dep-e-1".to_string()),
            transfer_code: None,
            bank_account_id: None,
            failure_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let response = transaction_response(&entry);
        assert_eq!(response.amount, "1234.56");
        assert_eq!(response.transaction_id, "e-1");
    }
}
