// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Handover workflow repository and state machine.
//!
//! One handover per property sale: the seller submits the sale documents,
//! the buyer signs, the seller releases the keys. The transition table
//! lives here; routes never compare raw status strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{DocumentStore, StorageError, StorageResult};

/// Stage of a handover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HandoverStatus {
    /// Waiting for the seller to submit sale documents
    AwaitingDocuments,
    /// Documents submitted, waiting for the buyer's signature
    DocumentsSubmitted,
    /// Buyer has signed, waiting for key release
    Signed,
    /// Keys released; terminal
    KeysReleased,
}

/// Error raised by an invalid handover transition.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HandoverTransitionError {
    #[error("cannot {action} while handover is in `{status}` stage")]
    InvalidState {
        action: &'static str,
        status: &'static str,
    },
}

fn status_name(status: HandoverStatus) -> &'static str {
    match status {
        HandoverStatus::AwaitingDocuments => "awaiting_documents",
        HandoverStatus::DocumentsSubmitted => "documents_submitted",
        HandoverStatus::Signed => "signed",
        HandoverStatus::KeysReleased => "keys_released",
    }
}

/// One document attached to a handover.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HandoverDocument {
    /// Display name (e.g. "Deed of Assignment")
    pub name: String,
    /// Where the uploaded document lives
    pub uri: String,
    /// When it was submitted
    pub submitted_at: DateTime<Utc>,
}

/// A handover record as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredHandover {
    /// Unique handover identifier (UUID)
    pub handover_id: String,
    /// Property being handed over
    pub property_id: String,
    /// Selling user (submits documents, releases keys)
    pub seller_user_id: String,
    /// Buying user (signs)
    pub buyer_user_id: String,
    /// Current stage
    pub status: HandoverStatus,
    /// Submitted sale documents
    pub documents: Vec<HandoverDocument>,
    /// When the buyer signed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    /// When the keys were released
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys_released_at: Option<DateTime<Utc>>,
    /// When the handover was opened
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl StoredHandover {
    /// Seller submits (or re-submits) the sale documents.
    ///
    /// Allowed while awaiting documents and after a prior submission that
    /// the buyer has not yet signed.
    pub fn submit_documents(
        &mut self,
        documents: Vec<HandoverDocument>,
        now: DateTime<Utc>,
    ) -> Result<(), HandoverTransitionError> {
        match self.status {
            HandoverStatus::AwaitingDocuments | HandoverStatus::DocumentsSubmitted => {
                self.documents = documents;
                self.status = HandoverStatus::DocumentsSubmitted;
                self.updated_at = now;
                Ok(())
            }
            status => Err(HandoverTransitionError::InvalidState {
                action: "submit documents",
                status: status_name(status),
            }),
        }
    }

    /// Buyer signs the submitted documents.
    pub fn sign(&mut self, now: DateTime<Utc>) -> Result<(), HandoverTransitionError> {
        match self.status {
            HandoverStatus::DocumentsSubmitted => {
                self.status = HandoverStatus::Signed;
                self.signed_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            status => Err(HandoverTransitionError::InvalidState {
                action: "sign",
                status: status_name(status),
            }),
        }
    }

    /// Seller releases the keys after signature.
    pub fn release_keys(&mut self, now: DateTime<Utc>) -> Result<(), HandoverTransitionError> {
        match self.status {
            HandoverStatus::Signed => {
                self.status = HandoverStatus::KeysReleased;
                self.keys_released_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            status => Err(HandoverTransitionError::InvalidState {
                action: "release keys",
                status: status_name(status),
            }),
        }
    }
}

/// Repository for handover records.
pub struct HandoverRepository<'a> {
    storage: &'a DocumentStore,
}

impl<'a> HandoverRepository<'a> {
    /// Create a new HandoverRepository.
    pub fn new(storage: &'a DocumentStore) -> Self {
        Self { storage }
    }

    /// Check if a handover exists.
    pub fn exists(&self, handover_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().handover(handover_id))
    }

    /// Get a handover by ID.
    pub fn get(&self, handover_id: &str) -> StorageResult<StoredHandover> {
        let path = self.storage.paths().handover(handover_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Handover {handover_id}")));
        }
        self.storage.read_json(path)
    }

    /// Create a new handover.
    pub fn create(&self, handover: &StoredHandover) -> StorageResult<()> {
        if self.exists(&handover.handover_id) {
            return Err(StorageError::AlreadyExists(format!(
                "Handover {}",
                handover.handover_id
            )));
        }
        self.storage.write_json(
            self.storage.paths().handover(&handover.handover_id),
            handover,
        )
    }

    /// Update an existing handover.
    pub fn update(&self, handover: &StoredHandover) -> StorageResult<()> {
        if !self.exists(&handover.handover_id) {
            return Err(StorageError::NotFound(format!(
                "Handover {}",
                handover.handover_id
            )));
        }
        self.storage.write_json(
            self.storage.paths().handover(&handover.handover_id),
            handover,
        )
    }

    /// List all handovers.
    pub fn list_all(&self) -> StorageResult<Vec<StoredHandover>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().handovers_dir(), "json")?;
        let mut handovers = Vec::new();
        for id in &ids {
            if let Ok(handover) = self.get(id) {
                handovers.push(handover);
            }
        }
        handovers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(handovers)
    }

    /// List handovers where the user is buyer or seller.
    pub fn list_by_party(&self, user_id: &str) -> StorageResult<Vec<StoredHandover>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|h| h.seller_user_id == user_id || h.buyer_user_id == user_id)
            .collect())
    }

    /// Find the handover for a property, if one exists.
    pub fn find_by_property(&self, property_id: &str) -> StorageResult<Option<StoredHandover>> {
        Ok(self
            .list_all()?
            .into_iter()
            .find(|h| h.property_id == property_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handover() -> StoredHandover {
        let now = Utc::now();
        StoredHandover {
            handover_id: "h-1".to_string(),
            property_id: "prop-1".to_string(),
            seller_user_id: "seller-1".to_string(),
            buyer_user_id: "buyer-1".to_string(),
            status: HandoverStatus::AwaitingDocuments,
            documents: Vec::new(),
            signed_at: None,
            keys_released_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn deed(now: DateTime<Utc>) -> Vec<HandoverDocument> {
        vec![HandoverDocument {
            name: "Deed of Assignment".to_string(),
            uri: "docs/deed.pdf".to_string(),
            submitted_at: now,
        }]
    }

    #[test]
    fn full_workflow_in_order() {
        let now = Utc::now();
        let mut handover = test_handover();

        handover.submit_documents(deed(now), now).unwrap();
        assert_eq!(handover.status, HandoverStatus::DocumentsSubmitted);

        handover.sign(now).unwrap();
        assert_eq!(handover.status, HandoverStatus::Signed);
        assert!(handover.signed_at.is_some());

        handover.release_keys(now).unwrap();
        assert_eq!(handover.status, HandoverStatus::KeysReleased);
        assert!(handover.keys_released_at.is_some());
    }

    #[test]
    fn sign_requires_documents() {
        let now = Utc::now();
        let mut handover = test_handover();

        let result = handover.sign(now);
        assert!(matches!(
            result,
            Err(HandoverTransitionError::InvalidState { .. })
        ));
        assert_eq!(handover.status, HandoverStatus::AwaitingDocuments);
    }

    #[test]
    fn release_requires_signature() {
        let now = Utc::now();
        let mut handover = test_handover();
        handover.submit_documents(deed(now), now).unwrap();

        let result = handover.release_keys(now);
        assert!(matches!(
            result,
            Err(HandoverTransitionError::InvalidState { .. })
        ));
        assert_eq!(handover.status, HandoverStatus::DocumentsSubmitted);
    }

    #[test]
    fn documents_can_be_resubmitted_before_signature() {
        let now = Utc::now();
        let mut handover = test_handover();

        handover.submit_documents(deed(now), now).unwrap();
        handover.submit_documents(deed(now), now).unwrap();
        assert_eq!(handover.status, HandoverStatus::DocumentsSubmitted);
    }

    #[test]
    fn terminal_stage_rejects_everything() {
        let now = Utc::now();
        let mut handover = test_handover();
        handover.submit_documents(deed(now), now).unwrap();
        handover.sign(now).unwrap();
        handover.release_keys(now).unwrap();

        assert!(handover.submit_documents(deed(now), now).is_err());
        assert!(handover.sign(now).is_err());
        assert!(handover.release_keys(now).is_err());
        assert_eq!(handover.status, HandoverStatus::KeysReleased);
    }
}
