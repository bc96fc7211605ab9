// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Shared application state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::JwksManager;
use crate::ledger::LedgerDb;
use crate::ratelimit::RateLimits;
use crate::social::TierCache;
use crate::storage::DocumentStore;

/// Capacity of the creator tier cache.
const TIER_CACHE_CAPACITY: usize = 1024;

/// TTL of creator tier cache entries.
const TIER_CACHE_TTL: Duration = Duration::from_secs(300);

/// Authentication configuration.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// JWKS manager; `None` enables dev-mode verification
    pub jwks: Option<JwksManager>,
    /// Expected issuer
    pub issuer: Option<String>,
    /// Expected audience
    pub audience: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    storage: Arc<DocumentStore>,
    ledger: Arc<LedgerDb>,
    /// Auth configuration used by the `Auth` extractor
    pub auth_config: AuthConfig,
    /// Per-user operation rate limits
    pub rate_limits: Arc<RateLimits>,
    /// Creator tier lookup cache
    pub tier_cache: Arc<TierCache>,
    /// Server pepper mixed into withdrawal PIN digests
    pub pin_pepper: Arc<Vec<u8>>,
    /// Process start time (for uptime reporting)
    pub started_at: Instant,
}

impl AppState {
    pub fn new(storage: DocumentStore, ledger: LedgerDb) -> Self {
        Self {
            storage: Arc::new(storage),
            ledger: Arc::new(ledger),
            auth_config: AuthConfig::default(),
            rate_limits: Arc::new(RateLimits::new()),
            tier_cache: Arc::new(TierCache::new(TIER_CACHE_CAPACITY, TIER_CACHE_TTL)),
            pin_pepper: Arc::new(Vec::new()),
            started_at: Instant::now(),
        }
    }

    /// Set the auth configuration.
    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    /// Set the withdrawal PIN pepper.
    pub fn with_pin_pepper(mut self, pepper: impl Into<Vec<u8>>) -> Self {
        self.pin_pepper = Arc::new(pepper.into());
        self
    }

    /// Access the document store.
    pub fn storage(&self) -> Arc<DocumentStore> {
        Arc::clone(&self.storage)
    }

    /// Access the wallet ledger.
    pub fn ledger(&self) -> Arc<LedgerDb> {
        Arc::clone(&self.ledger)
    }

    /// Seconds since the server started.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Build a state backed by a temp directory (unit tests only).
    #[cfg(test)]
    pub fn for_tests() -> (Self, tempfile::TempDir) {
        use crate::storage::StoragePaths;

        let temp = tempfile::TempDir::new().expect("temp dir");
        let paths = StoragePaths::new(temp.path());
        let mut storage = DocumentStore::new(paths.clone());
        storage.initialize().expect("initialize storage");
        let ledger = LedgerDb::open(&paths.ledger_db()).expect("open ledger");

        let state = AppState::new(storage, ledger).with_pin_pepper(b"test-pepper".to_vec());
        (state, temp)
    }
}
