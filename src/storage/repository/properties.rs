// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Property listing repository.
//!
//! One JSON file per listing under `properties/`. Listings are created in
//! `pending_review` and only become publicly visible once an admin approves
//! them into `listed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{DocumentStore, StorageError, StorageResult};

/// Moderation/lifecycle status of a property listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    /// Submitted by the owner, waiting for admin moderation
    PendingReview,
    /// Approved and publicly visible
    Listed,
    /// Rejected by moderation (reason recorded)
    Rejected,
    /// Sale completed; handover in progress or done
    Sold,
    /// Taken down by the owner
    Delisted,
}

/// A property listing as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredProperty {
    /// Unique property identifier (UUID)
    pub property_id: String,
    /// User who owns/sells this property
    pub owner_user_id: String,
    /// Listing title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// City / area string
    pub location: String,
    /// Asking price in minor currency units
    pub price_minor: i64,
    /// ISO currency code (e.g. "NGN", "EUR")
    pub currency: String,
    /// Number of bedrooms
    pub bedrooms: u16,
    /// Number of bathrooms
    pub bathrooms: u16,
    /// Interior size in square meters
    pub square_meters: u32,
    /// Current moderation/lifecycle status
    pub status: PropertyStatus,
    /// Reason recorded when moderation rejects the listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Buyer recorded when the property is marked sold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_user_id: Option<String>,
    /// When the listing was created
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl super::super::OwnedResource for StoredProperty {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }
}

/// Repository for property listings.
pub struct PropertyRepository<'a> {
    storage: &'a DocumentStore,
}

impl<'a> PropertyRepository<'a> {
    /// Create a new PropertyRepository.
    pub fn new(storage: &'a DocumentStore) -> Self {
        Self { storage }
    }

    /// Check if a property exists.
    pub fn exists(&self, property_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().property(property_id))
    }

    /// Get a property by ID.
    pub fn get(&self, property_id: &str) -> StorageResult<StoredProperty> {
        let path = self.storage.paths().property(property_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Property {property_id}")));
        }
        self.storage.read_json(path)
    }

    /// Create a new property listing.
    pub fn create(&self, property: &StoredProperty) -> StorageResult<()> {
        if self.exists(&property.property_id) {
            return Err(StorageError::AlreadyExists(format!(
                "Property {}",
                property.property_id
            )));
        }
        self.storage
            .write_json(self.storage.paths().property(&property.property_id), property)
    }

    /// Update an existing property listing.
    pub fn update(&self, property: &StoredProperty) -> StorageResult<()> {
        if !self.exists(&property.property_id) {
            return Err(StorageError::NotFound(format!(
                "Property {}",
                property.property_id
            )));
        }
        self.storage
            .write_json(self.storage.paths().property(&property.property_id), property)
    }

    /// List all properties (admin view).
    pub fn list_all(&self) -> StorageResult<Vec<StoredProperty>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().properties_dir(), "json")?;
        let mut properties = Vec::new();
        for id in &ids {
            if let Ok(property) = self.get(id) {
                properties.push(property);
            }
        }
        properties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(properties)
    }

    /// List properties in a given status.
    pub fn list_by_status(&self, status: PropertyStatus) -> StorageResult<Vec<StoredProperty>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|p| p.status == status)
            .collect())
    }

    /// List all properties owned by a user.
    pub fn list_by_owner(&self, owner_user_id: &str) -> StorageResult<Vec<StoredProperty>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|p| p.owner_user_id == owner_user_id)
            .collect())
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

    fn test_property(id: &str, owner: &str) -> StoredProperty {
        StoredProperty {
            property_id: id.to_string(),
            owner_user_id: owner.to_string(),
            title: "3-bed duplex".to_string(),
            description: "Quiet street, new roof".to_string(),
            location: "Lekki".to_string(),
            price_minor: 45_000_000_00,
            currency: "NGN".to_string(),
            bedrooms: 3,
            bathrooms: 2,
            square_meters: 210,
            status: PropertyStatus::PendingReview,
            rejection_reason: None,
            buyer_user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_get_property() {
        let (_temp, storage) = setup();
        let repo = PropertyRepository::new(&storage);

        let property = test_property("prop-1", "user-1");
        repo.create(&property).unwrap();

        let loaded = repo.get("prop-1").unwrap();
        assert_eq!(loaded.title, property.title);
        assert_eq!(loaded.status, PropertyStatus::PendingReview);
    }

    #[test]
    fn create_duplicate_fails() {
        let (_temp, storage) = setup();
        let repo = PropertyRepository::new(&storage);

        let property = test_property("prop-1", "user-1");
        repo.create(&property).unwrap();
        let result = repo.create(&property);
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn list_by_status_filters() {
        let (_temp, storage) = setup();
        let repo = PropertyRepository::new(&storage);

        let mut a = test_property("prop-a", "user-1");
        a.status = PropertyStatus::Listed;
        let b = test_property("prop-b", "user-1");
        repo.create(&a).unwrap();
        repo.create(&b).unwrap();

        let listed = repo.list_by_status(PropertyStatus::Listed).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].property_id, "prop-a");

        let pending = repo.list_by_status(PropertyStatus::PendingReview).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].property_id, "prop-b");
    }

    #[test]
    fn list_by_owner_filters() {
        let (_temp, storage) = setup();
        let repo = PropertyRepository::new(&storage);

        repo.create(&test_property("prop-1", "user-1")).unwrap();
        repo.create(&test_property("prop-2", "user-1")).unwrap();
        repo.create(&test_property("prop-3", "user-2")).unwrap();

        assert_eq!(repo.list_by_owner("user-1").unwrap().len(), 2);
        assert_eq!(repo.list_by_owner("user-2").unwrap().len(), 1);
        assert_eq!(repo.list_by_owner("user-3").unwrap().len(), 0);
    }
}
