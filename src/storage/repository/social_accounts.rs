// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Creator social-account snapshot repository.
//!
//! One JSON file per (creator, platform) pair under `social/{creator}/`.
//! A snapshot holds the follower/engagement numbers fetched from the
//! analytics verification service; the tier scoring in `crate::social`
//! always recomputes from every snapshot currently on disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{DocumentStore, StorageError, StorageResult};

/// Supported social platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Instagram,
    Tiktok,
    Youtube,
    Twitter,
}

impl SocialPlatform {
    /// Parse a platform from its URL path segment (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "instagram" => Some(Self::Instagram),
            "tiktok" => Some(Self::Tiktok),
            "youtube" => Some(Self::Youtube),
            "twitter" | "x" => Some(Self::Twitter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
            Self::Youtube => "youtube",
            Self::Twitter => "twitter",
        }
    }
}

impl std::fmt::Display for SocialPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified social-account snapshot as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredSocialAccount {
    /// Creator who linked this account
    pub creator_user_id: String,
    /// Platform this snapshot belongs to
    pub platform: SocialPlatform,
    /// Platform handle (e.g. `@hearthhomes`)
    pub handle: String,
    /// Follower count at verification time
    pub followers: u64,
    /// Engagement rate at verification time (0.0..=1.0)
    pub engagement_rate: f64,
    /// Whether the analytics service confirmed account ownership
    pub verified: bool,
    /// When the snapshot was fetched
    pub fetched_at: DateTime<Utc>,
}

impl super::super::OwnedResource for StoredSocialAccount {
    fn owner_user_id(&self) -> &str {
        &self.creator_user_id
    }
}

/// Repository for social-account snapshots.
pub struct SocialAccountRepository<'a> {
    storage: &'a DocumentStore,
}

impl<'a> SocialAccountRepository<'a> {
    /// Create a new SocialAccountRepository.
    pub fn new(storage: &'a DocumentStore) -> Self {
        Self { storage }
    }

    /// Get a creator's snapshot for one platform.
    pub fn get(
        &self,
        creator_user_id: &str,
        platform: SocialPlatform,
    ) -> StorageResult<StoredSocialAccount> {
        let path = self
            .storage
            .paths()
            .social_account(creator_user_id, platform.as_str());
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!(
                "Social account {platform} for {creator_user_id}"
            )));
        }
        self.storage.read_json(path)
    }

    /// Insert or replace a creator's snapshot for one platform.
    pub fn upsert(&self, account: &StoredSocialAccount) -> StorageResult<()> {
        self.storage.write_json(
            self.storage
                .paths()
                .social_account(&account.creator_user_id, account.platform.as_str()),
            account,
        )
    }

    /// Delete a creator's snapshot for one platform.
    pub fn delete(&self, creator_user_id: &str, platform: SocialPlatform) -> StorageResult<()> {
        let path = self
            .storage
            .paths()
            .social_account(creator_user_id, platform.as_str());
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!(
                "Social account {platform} for {creator_user_id}"
            )));
        }
        self.storage.delete(path)
    }

    /// List every snapshot a creator currently has on disk.
    pub fn list_by_creator(
        &self,
        creator_user_id: &str,
    ) -> StorageResult<Vec<StoredSocialAccount>> {
        let dir = self.storage.paths().social_creator_dir(creator_user_id);
        let platforms = self.storage.list_files(dir, "json")?;

        let mut accounts = Vec::new();
        for name in &platforms {
            if let Some(platform) = SocialPlatform::from_str(name) {
                if let Ok(account) = self.get(creator_user_id, platform) {
                    accounts.push(account);
                }
            }
        }
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DocumentStore, StoragePaths};
    use tempfile::TempDir;

    fn setup() -> (TempDir, DocumentStore) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut storage = DocumentStore::new(paths);
        storage.initialize().unwrap();
        (temp, storage)
    }

    fn snapshot(creator: &str, platform: SocialPlatform, followers: u64) -> StoredSocialAccount {
        StoredSocialAccount {
            creator_user_id: creator.to_string(),
            platform,
            handle: "@hearthhomes".to_string(),
            followers,
            engagement_rate: 0.045,
            verified: true,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_and_get() {
        let (_temp, storage) = setup();
        let repo = SocialAccountRepository::new(&storage);

        repo.upsert(&snapshot("creator-1", SocialPlatform::Instagram, 12_000))
            .unwrap();

        let loaded = repo.get("creator-1", SocialPlatform::Instagram).unwrap();
        assert_eq!(loaded.followers, 12_000);

        // Upsert replaces
        repo.upsert(&snapshot("creator-1", SocialPlatform::Instagram, 15_000))
            .unwrap();
        let reloaded = repo.get("creator-1", SocialPlatform::Instagram).unwrap();
        assert_eq!(reloaded.followers, 15_000);
    }

    #[test]
    fn list_by_creator_returns_all_platforms() {
        let (_temp, storage) = setup();
        let repo = SocialAccountRepository::new(&storage);

        repo.upsert(&snapshot("creator-1", SocialPlatform::Instagram, 1_000))
            .unwrap();
        repo.upsert(&snapshot("creator-1", SocialPlatform::Tiktok, 2_000))
            .unwrap();
        repo.upsert(&snapshot("creator-2", SocialPlatform::Youtube, 3_000))
            .unwrap();

        let accounts = repo.list_by_creator("creator-1").unwrap();
        assert_eq!(accounts.len(), 2);

        let none = repo.list_by_creator("creator-3").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn delete_removes_snapshot() {
        let (_temp, storage) = setup();
        let repo = SocialAccountRepository::new(&storage);

        repo.upsert(&snapshot("creator-1", SocialPlatform::Twitter, 500))
            .unwrap();
        repo.delete("creator-1", SocialPlatform::Twitter).unwrap();

        let result = repo.get("creator-1", SocialPlatform::Twitter);
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn platform_parses_aliases() {
        assert_eq!(SocialPlatform::from_str("X"), Some(SocialPlatform::Twitter));
        assert_eq!(
            SocialPlatform::from_str("Instagram"),
            Some(SocialPlatform::Instagram)
        );
        assert_eq!(SocialPlatform::from_str("myspace"), None);
    }
}
