// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for marketplace storage | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AUTH_JWKS_URL` | JWKS endpoint for JWT verification | Required for production |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Required for production |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `PIN_PEPPER` | Server-side pepper mixed into withdrawal PIN digests | Required for withdrawals |
//! | `PAYSTACK_SECRET_KEY` | Payment gateway API secret | Required for deposits/withdrawals |
//! | `PAYSTACK_API_BASE_URL` | Gateway API base URL | `https://api.paystack.co` |
//! | `PAYSTACK_CALLBACK_URL` | Redirect URL after hosted checkout | `http://localhost:3000/wallet/callback` |
//! | `SOCIAL_VERIFY_API_URL` | Social-analytics verification API base URL | Required for tier verification |
//! | `SOCIAL_VERIFY_API_KEY` | Social-analytics API key | Required for tier verification |
//! | `PROMO_SWEEP_INTERVAL_SECS` | Promotion expiry sweep interval | `60` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the marketplace data directory path.
///
/// All listing documents, promotion links, handover records, audit logs and
/// the wallet ledger database live under this directory.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";
