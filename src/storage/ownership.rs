// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Ownership enforcement for stored marketplace records.
//!
//! Listings, promotions, handovers and bank accounts all belong to a user.
//! Repositories expose the owner through `OwnedResource` so route handlers
//! share one ownership check instead of re-implementing it per endpoint.

use crate::auth::AuthenticatedUser;

use super::{StorageError, StorageResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that the user owns this resource.
    ///
    /// # Errors
    /// Returns `StorageError::PermissionDenied` if the user doesn't own the resource.
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if self.owner_user_id() == user.user_id {
            Ok(())
        } else {
            Err(StorageError::PermissionDenied {
                user_id: user.user_id.clone(),
                resource: "resource".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    struct Doc {
        owner: String,
    }

    impl OwnedResource for Doc {
        fn owner_user_id(&self) -> &str {
            &self.owner
        }
    }

    fn user(id: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: id.to_string(),
            role: Role::Member,
            session_id: None,
            email: None,
            issuer: "test".to_string(),
            expires_at: 0,
        }
    }

    #[test]
    fn owner_passes_check() {
        let doc = Doc {
            owner: "user-1".to_string(),
        };
        assert!(doc.verify_ownership(&user("user-1")).is_ok());
    }

    #[test]
    fn non_owner_is_denied() {
        let doc = Doc {
            owner: "user-1".to_string(),
        };
        let result = doc.verify_ownership(&user("user-2"));
        assert!(matches!(result, Err(StorageError::PermissionDenied { .. })));
    }
}
