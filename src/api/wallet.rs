// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Wallet and payout bank-account endpoints.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::Auth,
    error::{ApiError, ApiOk},
    gateway::{CreateRecipientRequest, PaystackClient},
    ledger::{pin, WalletAccount, WalletStatus},
    ratelimit::RateClass,
    state::AppState,
    storage::{AuditEventType, BankAccountRepository, StoredBankAccount},
};

use super::money::format_minor;

/// Wallet state returned to clients (never includes the PIN digest).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletResponse {
    /// Wallet unique identifier.
    pub wallet_id: String,
    /// ISO currency code.
    pub currency: String,
    /// Spendable balance as a decimal string.
    pub available_balance: String,
    /// Balance held by in-flight withdrawals, as a decimal string.
    pub locked_balance: String,
    /// Current wallet status.
    pub status: WalletStatus,
    /// Whether the withdrawal PIN has been set up.
    pub is_setup: bool,
    /// End of the current PIN lockout window, if locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_locked_until: Option<String>,
    /// Creation time.
    pub created_at: String,
}

pub(super) fn wallet_response(account: &WalletAccount) -> WalletResponse {
    WalletResponse {
        wallet_id: account.wallet_id.clone(),
        currency: account.currency.clone(),
        available_balance: format_minor(account.available_minor),
        locked_balance: format_minor(account.locked_minor),
        status: account.status,
        is_setup: account.is_setup,
        pin_locked_until: account.pin_locked_until.map(|t| t.to_rfc3339()),
        created_at: account.created_at.to_rfc3339(),
    }
}

/// Request body for setting up the withdrawal PIN.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetupPinRequest {
    /// 4-6 digit PIN.
    pub pin: String,
}

/// Request body for registering a payout bank account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBankAccountRequest {
    /// Bank display name.
    pub bank_name: String,
    /// Gateway bank code.
    pub bank_code: String,
    /// Account number.
    pub account_number: String,
    /// Account holder name.
    pub account_name: String,
}

/// Bank account returned to clients (account number masked).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BankAccountResponse {
    /// Bank account unique identifier.
    pub bank_account_id: String,
    /// Bank display name.
    pub bank_name: String,
    /// Masked account number.
    pub account_number: String,
    /// Account holder name.
    pub account_name: String,
    /// Registration time.
    pub created_at: String,
}

fn bank_account_response(account: &StoredBankAccount) -> BankAccountResponse {
    BankAccountResponse {
        bank_account_id: account.bank_account_id.clone(),
        bank_name: account.bank_name.clone(),
        account_number: account.masked_account_number(),
        account_name: account.account_name.clone(),
        created_at: account.created_at.to_rfc3339(),
    }
}

/// List response for bank accounts.
#[derive(Debug, Serialize, ToSchema)]
pub struct BankAccountListResponse {
    /// Registered payout accounts.
    pub accounts: Vec<BankAccountResponse>,
    /// Total count.
    pub total: usize,
}

/// Get the caller's wallet, creating it on first access.
#[utoipa::path(
    get,
    path = "/api/wallet",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Wallet state", body = WalletResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<ApiOk<WalletResponse>, ApiError> {
    let ledger = state.ledger();
    let account = ledger
        .get_or_create_for_owner(&user.user_id, "NGN")
        .map_err(|e| ApiError::internal(format!("Failed to access wallet: {e}")))?;

    Ok(ApiOk::new(wallet_response(&account)))
}

/// Set up the withdrawal PIN.
///
/// One-shot: an already configured PIN cannot be overwritten through this
/// endpoint.
#[utoipa::path(
    post,
    path = "/api/wallet/pin",
    tag = "Wallet",
    request_body = SetupPinRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "PIN configured", body = WalletResponse),
        (status = 400, description = "Invalid PIN format"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "PIN already configured"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn setup_pin(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<SetupPinRequest>,
) -> Result<ApiOk<WalletResponse>, ApiError> {
    state.rate_limits.check(RateClass::Pin, &user.user_id)?;

    let pin_value = request.pin.trim();
    if pin_value.len() < 4 || pin_value.len() > 6 || !pin_value.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ApiError::bad_request("PIN must be 4-6 digits"));
    }

    let ledger = state.ledger();
    let account = ledger
        .get_or_create_for_owner(&user.user_id, "NGN")
        .map_err(|e| ApiError::internal(format!("Failed to access wallet: {e}")))?;

    if account.is_setup {
        return Err(ApiError::conflict("Withdrawal PIN is already configured"));
    }

    let salt = pin::generate_salt();
    let digest = pin::hash_pin(&state.pin_pepper, &salt, pin_value);

    let updated = ledger
        .mutate_account(&account.wallet_id, |account| {
            account.is_setup = true;
            account.pin_digest = Some(digest);
            account.pin_salt = Some(salt);
            account.failed_pin_attempts = 0;
            account.pin_locked_until = None;
        })
        .map_err(|e| ApiError::internal(format!("Failed to store PIN: {e}")))?;

    let storage = state.storage();
    audit_log!(
        &storage,
        AuditEventType::WalletPinSetup,
        &user,
        "wallet",
        &updated.wallet_id
    );

    Ok(ApiOk::new(wallet_response(&updated)))
}

/// Register a payout bank account.
///
/// Creates the gateway transfer recipient eagerly so withdrawals can
/// initiate transfers without another round trip.
#[utoipa::path(
    post,
    path = "/api/bank-accounts",
    tag = "Wallet",
    request_body = CreateBankAccountRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Bank account registered", body = BankAccountResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Gateway rejected the recipient"),
        (status = 503, description = "Gateway not configured")
    )
)]
pub async fn create_bank_account(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateBankAccountRequest>,
) -> Result<(StatusCode, ApiOk<BankAccountResponse>), ApiError> {
    let account_number = request.account_number.trim();
    if account_number.len() < 10 || !account_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request(
            "account_number must be at least 10 digits",
        ));
    }
    let account_name = request.account_name.trim();
    if account_name.is_empty() {
        return Err(ApiError::bad_request("account_name is required"));
    }

    if !PaystackClient::is_configured() {
        return Err(ApiError::service_unavailable(
            "Payment gateway is not configured. Set PAYSTACK_* environment variables.",
        ));
    }
    let client = PaystackClient::from_env()
        .map_err(|e| ApiError::service_unavailable(e.to_string()))?;

    let recipient_code = client
        .create_transfer_recipient(CreateRecipientRequest {
            account_name,
            account_number,
            bank_code: request.bank_code.trim(),
        })
        .await
        .map_err(|e| ApiError::bad_gateway(format!("Failed to register recipient: {e}")))?;

    let record = StoredBankAccount {
        bank_account_id: uuid::Uuid::new_v4().to_string(),
        owner_user_id: user.user_id.clone(),
        bank_name: request.bank_name.trim().to_string(),
        bank_code: request.bank_code.trim().to_string(),
        account_number: account_number.to_string(),
        account_name: account_name.to_string(),
        recipient_code,
        created_at: Utc::now(),
    };

    let storage = state.storage();
    let repo = BankAccountRepository::new(&storage);
    repo.create(&record)
        .map_err(|e| ApiError::internal(format!("Failed to store bank account: {e}")))?;

    audit_log!(
        &storage,
        AuditEventType::BankAccountAdded,
        &user,
        "bank_account",
        &record.bank_account_id
    );

    Ok((
        StatusCode::CREATED,
        ApiOk::new(bank_account_response(&record)),
    ))
}

/// List the caller's payout bank accounts.
#[utoipa::path(
    get,
    path = "/api/bank-accounts",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Bank accounts listed", body = BankAccountListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_bank_accounts(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<ApiOk<BankAccountListResponse>, ApiError> {
    let storage = state.storage();
    let repo = BankAccountRepository::new(&storage);
    let accounts = repo
        .list_by_owner(&user.user_id)
        .map_err(|e| ApiError::internal(format!("Failed to list bank accounts: {e}")))?;

    let mapped: Vec<BankAccountResponse> = accounts.iter().map(bank_account_response).collect();
    Ok(ApiOk::new(BankAccountListResponse {
        total: mapped.len(),
        accounts: mapped,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_response_hides_pin_material() {
        let mut account = WalletAccount::new(
            "w-1".to_string(),
            "user-1".to_string(),
            "NGN".to_string(),
        );
        account.available_minor = 125_050;
        account.locked_minor = 2_000;
        account.pin_digest = Some("secret".to_string());

        let response = wallet_response(&account);
        assert_eq!(response.available_balance, "1250.50");
        assert_eq!(response.locked_balance, "20.00");

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("pin_digest").is_none());
        assert!(json.get("pin_salt").is_none());
    }
}
