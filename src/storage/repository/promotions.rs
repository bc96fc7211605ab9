// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Promotion (tracking link) repository and lifecycle rules.
//!
//! A promotion is a creator's affiliate link to a listed property. Its
//! status moves among `active`, `paused`, `stopped` and `expired`; all
//! transition rules live here in one table-like impl rather than being
//! re-checked ad hoc per route. `stopped` is terminal. `expired` can only
//! be revived by extending the expiry date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{DocumentStore, StorageError, StorageResult};

/// Lifecycle status of a promotion link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    /// Link is live and redirecting
    Active,
    /// Temporarily paused by the creator
    Paused,
    /// Permanently stopped; terminal
    Stopped,
    /// Past its expiry date; revivable only by extension
    Expired,
}

/// Error raised by an invalid lifecycle transition.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PromotionTransitionError {
    #[error("promotion is stopped and cannot change status")]
    Stopped,

    #[error("promotion is expired; extend the expiry date to reactivate it")]
    Expired,

    #[error("cannot {action} a promotion in `{status}` status")]
    InvalidState {
        action: &'static str,
        status: &'static str,
    },
}

fn status_name(status: PromotionStatus) -> &'static str {
    match status {
        PromotionStatus::Active => "active",
        PromotionStatus::Paused => "paused",
        PromotionStatus::Stopped => "stopped",
        PromotionStatus::Expired => "expired",
    }
}

/// A promotion tracking link as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredPromotion {
    /// Unique promotion identifier (UUID)
    pub promotion_id: String,
    /// Creator who owns this link
    pub creator_user_id: String,
    /// Property being promoted
    pub property_id: String,
    /// Short public code used in the redirect URL
    pub code: String,
    /// Commission rate snapshot at creation time, in basis points
    pub commission_rate_bps: u32,
    /// Current lifecycle status
    pub status: PromotionStatus,
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
    /// Number of resolved clicks
    pub clicks: u64,
    /// When the link was created
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl StoredPromotion {
    /// Flip `active` to `expired` when past the expiry date.
    ///
    /// Called on every read so a stale record is never observed as active.
    /// Returns `true` if the status changed.
    pub fn observe_expiry(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == PromotionStatus::Active && self.expires_at <= now {
            self.status = PromotionStatus::Expired;
            self.updated_at = now;
            return true;
        }
        false
    }

    /// Pause an active promotion.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), PromotionTransitionError> {
        self.observe_expiry(now);
        match self.status {
            PromotionStatus::Active => {
                self.status = PromotionStatus::Paused;
                self.updated_at = now;
                Ok(())
            }
            PromotionStatus::Stopped => Err(PromotionTransitionError::Stopped),
            status => Err(PromotionTransitionError::InvalidState {
                action: "pause",
                status: status_name(status),
            }),
        }
    }

    /// Resume a paused promotion.
    ///
    /// Resuming a link whose expiry has already passed lands it in
    /// `expired`, not `active`; the caller must extend the expiry instead.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), PromotionTransitionError> {
        match self.status {
            PromotionStatus::Paused => {
                if self.expires_at <= now {
                    self.status = PromotionStatus::Expired;
                    self.updated_at = now;
                    return Err(PromotionTransitionError::Expired);
                }
                self.status = PromotionStatus::Active;
                self.updated_at = now;
                Ok(())
            }
            PromotionStatus::Stopped => Err(PromotionTransitionError::Stopped),
            PromotionStatus::Expired => Err(PromotionTransitionError::Expired),
            status => Err(PromotionTransitionError::InvalidState {
                action: "resume",
                status: status_name(status),
            }),
        }
    }

    /// Stop a promotion permanently. Terminal.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<(), PromotionTransitionError> {
        match self.status {
            PromotionStatus::Stopped => Err(PromotionTransitionError::Stopped),
            _ => {
                self.status = PromotionStatus::Stopped;
                self.updated_at = now;
                Ok(())
            }
        }
    }

    /// Extend the expiry date.
    ///
    /// The only operation that revives an `expired` link. The new expiry
    /// must be in the future and later than the current one.
    pub fn extend(
        &mut self,
        new_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), PromotionTransitionError> {
        if self.status == PromotionStatus::Stopped {
            return Err(PromotionTransitionError::Stopped);
        }
        if new_expires_at <= now || new_expires_at <= self.expires_at {
            return Err(PromotionTransitionError::InvalidState {
                action: "extend",
                status: "past-expiry",
            });
        }
        self.expires_at = new_expires_at;
        if self.status == PromotionStatus::Expired {
            self.status = PromotionStatus::Active;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl super::super::OwnedResource for StoredPromotion {
    fn owner_user_id(&self) -> &str {
        &self.creator_user_id
    }
}

/// Repository for promotion links.
pub struct PromotionRepository<'a> {
    storage: &'a DocumentStore,
}

impl<'a> PromotionRepository<'a> {
    /// Create a new PromotionRepository.
    pub fn new(storage: &'a DocumentStore) -> Self {
        Self { storage }
    }

    /// Check if a promotion exists.
    pub fn exists(&self, promotion_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().promotion(promotion_id))
    }

    /// Get a promotion by ID.
    pub fn get(&self, promotion_id: &str) -> StorageResult<StoredPromotion> {
        let path = self.storage.paths().promotion(promotion_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Promotion {promotion_id}")));
        }
        self.storage.read_json(path)
    }

    /// Create a new promotion.
    pub fn create(&self, promotion: &StoredPromotion) -> StorageResult<()> {
        if self.exists(&promotion.promotion_id) {
            return Err(StorageError::AlreadyExists(format!(
                "Promotion {}",
                promotion.promotion_id
            )));
        }
        if self.find_by_code(&promotion.code)?.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "Promotion code {}",
                promotion.code
            )));
        }
        self.storage.write_json(
            self.storage.paths().promotion(&promotion.promotion_id),
            promotion,
        )
    }

    /// Update an existing promotion.
    pub fn update(&self, promotion: &StoredPromotion) -> StorageResult<()> {
        if !self.exists(&promotion.promotion_id) {
            return Err(StorageError::NotFound(format!(
                "Promotion {}",
                promotion.promotion_id
            )));
        }
        self.storage.write_json(
            self.storage.paths().promotion(&promotion.promotion_id),
            promotion,
        )
    }

    /// List all promotions.
    pub fn list_all(&self) -> StorageResult<Vec<StoredPromotion>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().promotions_dir(), "json")?;
        let mut promotions = Vec::new();
        for id in &ids {
            if let Ok(promotion) = self.get(id) {
                promotions.push(promotion);
            }
        }
        promotions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(promotions)
    }

    /// List all promotions owned by a creator.
    pub fn list_by_creator(&self, creator_user_id: &str) -> StorageResult<Vec<StoredPromotion>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|p| p.creator_user_id == creator_user_id)
            .collect())
    }

    /// Find a promotion by its public code.
    pub fn find_by_code(&self, code: &str) -> StorageResult<Option<StoredPromotion>> {
        Ok(self.list_all()?.into_iter().find(|p| p.code == code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DocumentStore, StoragePaths};
    use chrono::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DocumentStore) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut storage = DocumentStore::new(paths);
        storage.initialize().unwrap();
        (temp, storage)
    }

    fn test_promotion(id: &str, code: &str) -> StoredPromotion {
        let now = Utc::now();
        StoredPromotion {
            promotion_id: id.to_string(),
            creator_user_id: "creator-1".to_string(),
            property_id: "prop-1".to_string(),
            code: code.to_string(),
            commission_rate_bps: 350,
            status: PromotionStatus::Active,
            expires_at: now + Duration::days(30),
            clicks: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pause_and_resume_roundtrip() {
        let now = Utc::now();
        let mut promo = test_promotion("p1", "c1");

        promo.pause(now).unwrap();
        assert_eq!(promo.status, PromotionStatus::Paused);

        promo.resume(now).unwrap();
        assert_eq!(promo.status, PromotionStatus::Active);
    }

    #[test]
    fn stopped_is_terminal() {
        let now = Utc::now();
        let mut promo = test_promotion("p1", "c1");
        promo.stop(now).unwrap();
        assert_eq!(promo.status, PromotionStatus::Stopped);

        assert_eq!(promo.pause(now), Err(PromotionTransitionError::Stopped));
        assert_eq!(promo.resume(now), Err(PromotionTransitionError::Stopped));
        assert_eq!(promo.stop(now), Err(PromotionTransitionError::Stopped));
        assert_eq!(
            promo.extend(now + Duration::days(60), now),
            Err(PromotionTransitionError::Stopped)
        );
        assert_eq!(promo.status, PromotionStatus::Stopped);
    }

    #[test]
    fn past_expiry_is_observed_on_read() {
        let now = Utc::now();
        let mut promo = test_promotion("p1", "c1");
        promo.expires_at = now - Duration::hours(1);

        assert!(promo.observe_expiry(now));
        assert_eq!(promo.status, PromotionStatus::Expired);
        // Second observation is a no-op
        assert!(!promo.observe_expiry(now));
    }

    #[test]
    fn expired_cannot_resume_without_extension() {
        let now = Utc::now();
        let mut promo = test_promotion("p1", "c1");
        promo.expires_at = now - Duration::hours(1);
        promo.observe_expiry(now);

        assert_eq!(promo.resume(now), Err(PromotionTransitionError::Expired));
        assert_eq!(promo.status, PromotionStatus::Expired);

        promo.extend(now + Duration::days(7), now).unwrap();
        assert_eq!(promo.status, PromotionStatus::Active);
    }

    #[test]
    fn resume_of_paused_past_expiry_lands_in_expired() {
        let now = Utc::now();
        let mut promo = test_promotion("p1", "c1");
        promo.pause(now).unwrap();
        promo.expires_at = now - Duration::minutes(5);

        assert_eq!(promo.resume(now), Err(PromotionTransitionError::Expired));
        assert_eq!(promo.status, PromotionStatus::Expired);
    }

    #[test]
    fn extend_requires_future_date() {
        let now = Utc::now();
        let mut promo = test_promotion("p1", "c1");
        let result = promo.extend(now - Duration::days(1), now);
        assert!(matches!(
            result,
            Err(PromotionTransitionError::InvalidState { .. })
        ));
    }

    #[test]
    fn repository_rejects_duplicate_codes() {
        let (_temp, storage) = setup();
        let repo = PromotionRepository::new(&storage);

        repo.create(&test_promotion("p1", "summer-deal")).unwrap();
        let result = repo.create(&test_promotion("p2", "summer-deal"));
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn find_by_code_resolves() {
        let (_temp, storage) = setup();
        let repo = PromotionRepository::new(&storage);

        repo.create(&test_promotion("p1", "lekki-3bed")).unwrap();

        let found = repo.find_by_code("lekki-3bed").unwrap();
        assert_eq!(found.unwrap().promotion_id, "p1");
        assert!(repo.find_by_code("nope").unwrap().is_none());
    }
}
