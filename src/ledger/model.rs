// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Wallet account and ledger entry types.
//!
//! Amounts are i64 minor currency units throughout. The API boundary
//! parses and formats decimal strings (see `crate::api::funds`); nothing
//! below that layer touches floating point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Wallet status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    /// Wallet can deposit and withdraw
    Active,
    /// Frozen by an admin; deposits and withdrawals are refused
    Suspended,
}

impl Default for WalletStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A wallet account row in the ledger database.
///
/// One per user. `available_minor` is spendable; `locked_minor` is held by
/// in-flight withdrawals. Both are invariantly non-negative; every mutation
/// happens inside a single redb write transaction in `LedgerDb`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletAccount {
    /// Unique wallet identifier (UUID)
    pub wallet_id: String,
    /// User who owns this wallet
    pub owner_user_id: String,
    /// ISO currency code
    pub currency: String,
    /// Spendable balance in minor units
    pub available_minor: i64,
    /// Balance held by in-flight withdrawals, in minor units
    pub locked_minor: i64,
    /// Current wallet status
    pub status: WalletStatus,
    /// Whether a withdrawal PIN has been set up
    pub is_setup: bool,
    /// HMAC-SHA256 digest of the withdrawal PIN (base64)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_digest: Option<String>,
    /// Per-wallet salt mixed into the PIN digest (base64)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_salt: Option<String>,
    /// Consecutive failed PIN attempts since the last success
    pub failed_pin_attempts: u32,
    /// End of the current PIN lockout window, if locked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_locked_until: Option<DateTime<Utc>>,
    /// When the wallet was created
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl WalletAccount {
    /// Create a fresh wallet for a user.
    pub fn new(wallet_id: String, owner_user_id: String, currency: String) -> Self {
        let now = Utc::now();
        Self {
            wallet_id,
            owner_user_id,
            currency,
            available_minor: 0,
            locked_minor: 0,
            status: WalletStatus::Active,
            is_setup: false,
            pin_digest: None,
            pin_salt: None,
            failed_pin_attempts: 0,
            pin_locked_until: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What a ledger entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Money coming in through the payment gateway
    Deposit,
    /// Money going out to a bank account
    Withdrawal,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }
}

/// Status of a ledger entry.
///
/// Deposits move `pending → successful | failed`. Withdrawals move
/// `processing → successful | reversed`; `reversed` means the gateway
/// transfer failed and the hold was released back to the available
/// balance. A reversed withdrawal can be retried, which puts it back in
/// `processing` under a fresh hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Deposit initialized, awaiting gateway verification
    Pending,
    /// Withdrawal hold placed, transfer in flight
    Processing,
    /// Entry settled
    Successful,
    /// Deposit failed at the gateway; nothing was credited
    Failed,
    /// Withdrawal failed at the gateway; the hold was released
    Reversed,
}

/// One deposit or withdrawal attempt in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntry {
    /// Unique entry identifier (UUID)
    pub entry_id: String,
    /// Wallet this entry belongs to
    pub wallet_id: String,
    /// Deposit or withdrawal
    pub kind: EntryKind,
    /// Current status
    pub status: EntryStatus,
    /// Amount in minor units (always positive)
    pub amount_minor: i64,
    /// ISO currency code
    pub currency: String,
    /// Gateway charge reference (deposits)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,
    /// Gateway transfer code (withdrawals)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_code: Option<String>,
    /// Payout bank account (withdrawals)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account_id: Option<String>,
    /// Why the gateway failed the attempt, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Whether this entry has reached a state it can never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, EntryStatus::Successful | EntryStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wallet_starts_empty_and_active() {
        let wallet = WalletAccount::new(
            "w-1".to_string(),
            "user-1".to_string(),
            "NGN".to_string(),
        );
        assert_eq!(wallet.available_minor, 0);
        assert_eq!(wallet.locked_minor, 0);
        assert_eq!(wallet.status, WalletStatus::Active);
        assert!(!wallet.is_setup);
        assert_eq!(wallet.failed_pin_attempts, 0);
    }

    #[test]
    fn terminal_states() {
        let mut entry = LedgerEntry {
            entry_id: "e-1".to_string(),
            wallet_id: "w-1".to_string(),
            kind: EntryKind::Withdrawal,
            status: EntryStatus::Processing,
            amount_minor: 5_000,
            currency: "NGN".to_string(),
            gateway_reference: None,
            transfer_code: None,
            bank_account_id: None,
            failure_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!entry.is_terminal());

        entry.status = EntryStatus::Reversed;
        assert!(!entry.is_terminal()); // retryable

        entry.status = EntryStatus::Successful;
        assert!(entry.is_terminal());
    }
}
