// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Full access: moderation queue, wallet suspension, audit logs
/// - `Member` - Normal marketplace user: lists, buys, funds a wallet
/// - `Creator` - Member plus promotion links and tier verification
/// - `Support` - Read-only access to records (no money movement)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Normal marketplace user
    Member,
    /// Affiliate creator (promotion links, tier)
    Creator,
    /// Support staff (read-only)
    Support,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            // Admin can do anything
            (Role::Admin, _) => true,
            (Role::Member, Role::Member) => true,
            // Creators are members who can also promote
            (Role::Creator, Role::Creator) => true,
            (Role::Creator, Role::Member) => true,
            (Role::Support, Role::Support) => true,
            // Everything else is denied
            _ => false,
        }
    }

    /// Parse role from string (case-insensitive).
    /// Used when extracting roles from JWT public metadata.
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            "creator" => Some(Role::Creator),
            "support" => Some(Role::Support),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role is Member (least privilege for authenticated users).
    fn default() -> Self {
        Role::Member
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Member => write!(f, "member"),
            Role::Creator => write!(f, "creator"),
            Role::Support => write!(f, "support"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        assert!(Role::Admin.has_privilege(Role::Admin));
        assert!(Role::Admin.has_privilege(Role::Member));
        assert!(Role::Admin.has_privilege(Role::Creator));
        assert!(Role::Admin.has_privilege(Role::Support));
    }

    #[test]
    fn creator_is_also_a_member() {
        assert!(Role::Creator.has_privilege(Role::Creator));
        assert!(Role::Creator.has_privilege(Role::Member));
        assert!(!Role::Creator.has_privilege(Role::Admin));
    }

    #[test]
    fn member_cannot_promote() {
        assert!(Role::Member.has_privilege(Role::Member));
        assert!(!Role::Member.has_privilege(Role::Creator));
        assert!(!Role::Member.has_privilege(Role::Admin));
    }

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_str("Creator"), Some(Role::Creator));
        assert_eq!(Role::from_str("unknown"), None);
    }

    #[test]
    fn default_role_is_member() {
        assert_eq!(Role::default(), Role::Member);
    }
}
