// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! # Promotion Expiry Sweeper
//!
//! Background task that flips past-due `active` promotion links to
//! `expired`. Reads already observe expiry lazily; the sweeper covers the
//! links nobody is reading, so expiry does not depend on traffic.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::storage::{AuditEvent, AuditEventType, AuditRepository, DocumentStore, PromotionRepository};

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Background sweeper that expires past-due promotion links.
pub struct PromoSweeper {
    storage: Arc<DocumentStore>,
    sweep_interval: Duration,
}

impl PromoSweeper {
    /// Create a new sweeper over the given store.
    pub fn new(storage: Arc<DocumentStore>) -> Self {
        Self {
            storage,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Override the sweep interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Promotion expiry sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Promotion expiry sweeper shutting down");
                return;
            }

            self.sweep_step();

            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Promotion expiry sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep: expire every past-due active link.
    fn sweep_step(&self) {
        let repo = PromotionRepository::new(&self.storage);
        let promotions = match repo.list_all() {
            Ok(promotions) => promotions,
            Err(e) => {
                warn!(error = %e, "Promotion sweeper: failed to list promotions");
                return;
            }
        };

        let now = Utc::now();
        let mut expired = 0usize;

        for mut promotion in promotions {
            if !promotion.observe_expiry(now) {
                continue;
            }
            match repo.update(&promotion) {
                Ok(()) => {
                    expired += 1;
                    let event = AuditEvent::new(AuditEventType::PromotionExpired)
                        .with_resource("promotion", &promotion.promotion_id);
                    let _ = AuditRepository::new(&self.storage).log(&event);
                }
                Err(e) => {
                    warn!(
                        promotion_id = %promotion.promotion_id,
                        error = %e,
                        "Promotion sweeper: failed to persist expiry"
                    );
                }
            }
        }

        if expired > 0 {
            info!(count = expired, "Promotion sweeper: expired past-due links");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PromotionStatus, StoragePaths, StoredPromotion};
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<DocumentStore>) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut storage = DocumentStore::new(paths);
        storage.initialize().unwrap();
        (temp, Arc::new(storage))
    }

    fn promotion(id: &str, status: PromotionStatus, expired: bool) -> StoredPromotion {
        let now = Utc::now();
        let expires_at = if expired {
            now - ChronoDuration::hours(1)
        } else {
            now + ChronoDuration::days(7)
        };
        StoredPromotion {
            promotion_id: id.to_string(),
            creator_user_id: "creator-1".to_string(),
            property_id: "prop-1".to_string(),
            code: id.to_string(),
            commission_rate_bps: 350,
            status,
            expires_at,
            clicks: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn sweep_expires_only_past_due_active_links() {
        let (_temp, storage) = setup();
        let repo = PromotionRepository::new(&storage);

        repo.create(&promotion("due", PromotionStatus::Active, true))
            .unwrap();
        repo.create(&promotion("live", PromotionStatus::Active, false))
            .unwrap();
        repo.create(&promotion("paused", PromotionStatus::Paused, true))
            .unwrap();
        repo.create(&promotion("stopped", PromotionStatus::Stopped, true))
            .unwrap();

        let sweeper = PromoSweeper::new(Arc::clone(&storage));
        sweeper.sweep_step();

        assert_eq!(repo.get("due").unwrap().status, PromotionStatus::Expired);
        assert_eq!(repo.get("live").unwrap().status, PromotionStatus::Active);
        // Paused and stopped links are untouched by the sweeper
        assert_eq!(repo.get("paused").unwrap().status, PromotionStatus::Paused);
        assert_eq!(
            repo.get("stopped").unwrap().status,
            PromotionStatus::Stopped
        );
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let (_temp, storage) = setup();
        let sweeper =
            PromoSweeper::new(Arc::clone(&storage)).with_interval(Duration::from_millis(10));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper exits on cancel")
            .unwrap();
    }
}
