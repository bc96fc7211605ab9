// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! # Creator Social Module
//!
//! Social-account verification and commission tier derivation.
//!
//! - `client` - analytics verification API client
//! - `scoring` - pure tier scoring from stored snapshots
//! - `tier_cache` - LRU cache for hot tier lookups

pub mod client;
pub mod scoring;
pub mod tier_cache;

pub use client::{AccountStats, SocialVerifyClient, SocialVerifyError};
pub use scoring::{compute_tier, CreatorTier, TierAssessment};
pub use tier_cache::TierCache;
