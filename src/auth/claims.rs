// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// The user resolved from a verified JWT.
///
/// Attached to the request by the `Auth` extractor; handlers read the
/// canonical `user_id` and `role` from here and never touch the raw token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user identifier (JWT `sub`)
    pub user_id: String,
    /// Role extracted from public metadata
    pub role: Role,
    /// Session ID if the identity provider issues one
    pub session_id: Option<String>,
    /// Email claim, when the token carries one (used for gateway checkout)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Token issuer
    pub issuer: String,
    /// Token expiry (unix seconds)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Check whether the user holds at least the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    /// Check whether the user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "user_1".to_string(),
            role,
            session_id: None,
            email: None,
            issuer: "test".to_string(),
            expires_at: 0,
        }
    }

    #[test]
    fn admin_check() {
        assert!(user(Role::Admin).is_admin());
        assert!(!user(Role::Creator).is_admin());
    }

    #[test]
    fn role_check_follows_hierarchy() {
        assert!(user(Role::Creator).has_role(Role::Member));
        assert!(!user(Role::Member).has_role(Role::Creator));
    }
}
