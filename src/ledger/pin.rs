// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Withdrawal PIN gate.
//!
//! The PIN is stored as an HMAC-SHA256 digest keyed by a server-side
//! pepper over a per-wallet salt plus the PIN. Verification is
//! constant-time through the `hmac` crate. Three consecutive failures
//! lock withdrawals for thirty minutes; attempts inside the window are
//! rejected before the digest is even checked, so they cannot burn
//! further attempts.

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::model::WalletAccount;

type HmacSha256 = Hmac<Sha256>;

/// Failed attempts allowed before the lockout engages.
pub const MAX_PIN_ATTEMPTS: u32 = 3;

/// How long a locked wallet refuses PIN checks.
pub const PIN_LOCKOUT: Duration = Duration::minutes(30);

/// Why a PIN check did not succeed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PinGateError {
    #[error("withdrawal PIN has not been set up")]
    NotSetup,

    #[error("too many failed attempts; locked until {until}")]
    Locked { until: DateTime<Utc> },

    #[error("incorrect PIN ({attempts_remaining} attempts remaining)")]
    Mismatch { attempts_remaining: u32 },
}

/// Generate a fresh per-wallet salt (base64).
pub fn generate_salt() -> String {
    Base64::encode_string(uuid::Uuid::new_v4().as_bytes())
}

/// Compute the digest stored for a PIN (base64).
pub fn hash_pin(pepper: &[u8], salt: &str, pin: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(pepper).expect("HMAC accepts any key length");
    mac.update(salt.as_bytes());
    mac.update(pin.as_bytes());
    Base64::encode_string(&mac.finalize().into_bytes())
}

/// Constant-time comparison of a candidate PIN against the stored digest.
fn digest_matches(pepper: &[u8], salt: &str, pin: &str, stored_digest: &str) -> bool {
    let Ok(expected) = Base64::decode_vec(stored_digest) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(pepper).expect("HMAC accepts any key length");
    mac.update(salt.as_bytes());
    mac.update(pin.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Check a PIN attempt against the account's gate state.
///
/// Pure: does not mutate the account. On `Mismatch` the caller must
/// persist the failure via [`register_failure`]; on success it must
/// persist [`register_success`] to reset the counter.
pub fn check_pin(
    account: &WalletAccount,
    pin: &str,
    pepper: &[u8],
    now: DateTime<Utc>,
) -> Result<(), PinGateError> {
    if !account.is_setup {
        return Err(PinGateError::NotSetup);
    }

    // Lockout window is checked first: attempts inside it never reach the
    // digest and never change the counter.
    if let Some(until) = account.pin_locked_until {
        if now < until {
            return Err(PinGateError::Locked { until });
        }
    }

    let (Some(digest), Some(salt)) = (&account.pin_digest, &account.pin_salt) else {
        return Err(PinGateError::NotSetup);
    };

    if digest_matches(pepper, salt, pin, digest) {
        Ok(())
    } else {
        let failures_after = account.failed_pin_attempts.saturating_add(1);
        Err(PinGateError::Mismatch {
            attempts_remaining: MAX_PIN_ATTEMPTS.saturating_sub(failures_after),
        })
    }
}

/// Record a failed attempt on the account. Returns `true` when this
/// failure engaged the lockout.
///
/// Meant to run inside `LedgerDb::mutate_account`.
pub fn register_failure(account: &mut WalletAccount, now: DateTime<Utc>) -> bool {
    // An expired lockout window resets the counter before the new failure
    if let Some(until) = account.pin_locked_until {
        if now >= until {
            account.pin_locked_until = None;
            account.failed_pin_attempts = 0;
        }
    }

    account.failed_pin_attempts = account.failed_pin_attempts.saturating_add(1);
    if account.failed_pin_attempts >= MAX_PIN_ATTEMPTS {
        account.pin_locked_until = Some(now + PIN_LOCKOUT);
        true
    } else {
        false
    }
}

/// Reset the gate after a successful attempt.
///
/// Meant to run inside `LedgerDb::mutate_account`.
pub fn register_success(account: &mut WalletAccount) {
    account.failed_pin_attempts = 0;
    account.pin_locked_until = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEPPER: &[u8] = b"test-pepper";

    fn setup_account(pin: &str) -> WalletAccount {
        let mut account = WalletAccount::new(
            "w-1".to_string(),
            "user-1".to_string(),
            "NGN".to_string(),
        );
        let salt = generate_salt();
        account.pin_digest = Some(hash_pin(PEPPER, &salt, pin));
        account.pin_salt = Some(salt);
        account.is_setup = true;
        account
    }

    #[test]
    fn correct_pin_passes() {
        let account = setup_account("4921");
        assert!(check_pin(&account, "4921", PEPPER, Utc::now()).is_ok());
    }

    #[test]
    fn wrong_pin_reports_remaining_attempts() {
        let account = setup_account("4921");
        let result = check_pin(&account, "0000", PEPPER, Utc::now());
        assert_eq!(
            result,
            Err(PinGateError::Mismatch {
                attempts_remaining: 2
            })
        );
    }

    #[test]
    fn pin_not_setup_is_rejected() {
        let account = WalletAccount::new(
            "w-1".to_string(),
            "user-1".to_string(),
            "NGN".to_string(),
        );
        assert_eq!(
            check_pin(&account, "4921", PEPPER, Utc::now()),
            Err(PinGateError::NotSetup)
        );
    }

    #[test]
    fn three_failures_lock_for_thirty_minutes() {
        let mut account = setup_account("4921");
        let now = Utc::now();

        assert!(!register_failure(&mut account, now));
        assert!(!register_failure(&mut account, now));
        assert!(register_failure(&mut account, now));

        let until = account.pin_locked_until.expect("lockout set");
        assert_eq!(until, now + PIN_LOCKOUT);

        // Fourth attempt inside the window: rejected before digest check,
        // counter untouched - even with the CORRECT pin.
        let result = check_pin(&account, "4921", PEPPER, now + Duration::minutes(5));
        assert_eq!(result, Err(PinGateError::Locked { until }));
        assert_eq!(account.failed_pin_attempts, MAX_PIN_ATTEMPTS);
    }

    #[test]
    fn lockout_expires_after_window() {
        let mut account = setup_account("4921");
        let now = Utc::now();
        for _ in 0..3 {
            register_failure(&mut account, now);
        }

        let after = now + PIN_LOCKOUT + Duration::seconds(1);
        assert!(check_pin(&account, "4921", PEPPER, after).is_ok());
    }

    #[test]
    fn failure_after_expired_lockout_restarts_counter() {
        let mut account = setup_account("4921");
        let now = Utc::now();
        for _ in 0..3 {
            register_failure(&mut account, now);
        }

        let after = now + PIN_LOCKOUT + Duration::seconds(1);
        let locked = register_failure(&mut account, after);
        assert!(!locked);
        assert_eq!(account.failed_pin_attempts, 1);
    }

    #[test]
    fn success_resets_gate() {
        let mut account = setup_account("4921");
        let now = Utc::now();
        register_failure(&mut account, now);
        register_failure(&mut account, now);

        register_success(&mut account);
        assert_eq!(account.failed_pin_attempts, 0);
        assert!(account.pin_locked_until.is_none());
    }

    #[test]
    fn digests_differ_by_salt() {
        let a = hash_pin(PEPPER, "salt-a", "4921");
        let b = hash_pin(PEPPER, "salt-b", "4921");
        assert_ne!(a, b);
    }
}
