// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! # Wallet Ledger Module
//!
//! The single owner of money state. Wallet accounts (available/locked
//! balances, PIN gate) and ledger entries (deposit/withdrawal attempts)
//! live in one embedded redb database, and every balance movement is one
//! ACID write transaction pairing the account update with its entry
//! update. Route handlers call into this module; none of them mutates a
//! balance directly.
//!
//! - `db` - redb tables and the ledger operations
//! - `model` - account and entry types
//! - `pin` - withdrawal PIN hashing and lockout policy

pub mod db;
pub mod model;
pub mod pin;

pub use db::{LedgerDb, LedgerError, LedgerResult};
pub use model::{EntryKind, EntryStatus, LedgerEntry, WalletAccount, WalletStatus};
pub use pin::{PinGateError, MAX_PIN_ATTEMPTS, PIN_LOCKOUT};
