// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Per-user rate limiting for sensitive operations.
//!
//! In-process keyed token buckets (one per operation class, keyed by user
//! id). Handlers call `check` at the top; a drained bucket maps to HTTP
//! 429. Money movement and PIN attempts get the tight quotas.

use std::num::NonZeroU32;

use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};

use crate::error::ApiError;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Operation classes with their own quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateClass {
    /// Deposit initialization/verification
    Deposit,
    /// Withdrawal initiation/retry
    Withdraw,
    /// Withdrawal PIN attempts
    Pin,
    /// Promotion lifecycle changes
    Promotion,
    /// Social account verification calls
    SocialVerify,
}

impl RateClass {
    fn name(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Pin => "pin",
            Self::Promotion => "promotion",
            Self::SocialVerify => "social_verify",
        }
    }
}

/// Keyed rate limiters for every operation class.
pub struct RateLimits {
    deposit: KeyedLimiter,
    withdraw: KeyedLimiter,
    pin: KeyedLimiter,
    promotion: KeyedLimiter,
    social_verify: KeyedLimiter,
}

fn per_minute(n: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(n).expect("quota must be non-zero"))
}

impl RateLimits {
    pub fn new() -> Self {
        Self {
            deposit: RateLimiter::keyed(per_minute(10)),
            withdraw: RateLimiter::keyed(per_minute(5)),
            pin: RateLimiter::keyed(per_minute(5)),
            promotion: RateLimiter::keyed(per_minute(30)),
            social_verify: RateLimiter::keyed(per_minute(5)),
        }
    }

    /// Consume one token for the user in the given class.
    pub fn check(&self, class: RateClass, user_id: &str) -> Result<(), ApiError> {
        let limiter = match class {
            RateClass::Deposit => &self.deposit,
            RateClass::Withdraw => &self.withdraw,
            RateClass::Pin => &self.pin,
            RateClass::Promotion => &self.promotion,
            RateClass::SocialVerify => &self.social_verify,
        };

        limiter.check_key(&user_id.to_string()).map_err(|_| {
            ApiError::too_many_requests(format!(
                "Too many {} requests; try again shortly",
                class.name()
            ))
        })
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn quota_drains_per_user() {
        let limits = RateLimits::new();

        for _ in 0..5 {
            limits.check(RateClass::Withdraw, "user-1").unwrap();
        }
        let err = limits.check(RateClass::Withdraw, "user-1").unwrap_err();
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);

        // Another user is unaffected
        assert!(limits.check(RateClass::Withdraw, "user-2").is_ok());
    }

    #[test]
    fn classes_are_independent() {
        let limits = RateLimits::new();

        for _ in 0..5 {
            limits.check(RateClass::Pin, "user-1").unwrap();
        }
        assert!(limits.check(RateClass::Pin, "user-1").is_err());
        assert!(limits.check(RateClass::Deposit, "user-1").is_ok());
    }
}
