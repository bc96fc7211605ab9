// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Path constants and utilities for the marketplace storage layout.

use std::path::{Path, PathBuf};

/// Base directory for all persistent marketplace data.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities for the marketplace data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all marketplace data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Property Paths ==========

    /// Directory containing all property listings.
    pub fn properties_dir(&self) -> PathBuf {
        self.root.join("properties")
    }

    /// Path to a specific property listing file.
    pub fn property(&self, property_id: &str) -> PathBuf {
        self.properties_dir().join(format!("{property_id}.json"))
    }

    // ========== Promotion Paths ==========

    /// Directory containing all promotion tracking links.
    pub fn promotions_dir(&self) -> PathBuf {
        self.root.join("promotions")
    }

    /// Path to a specific promotion file.
    pub fn promotion(&self, promotion_id: &str) -> PathBuf {
        self.promotions_dir().join(format!("{promotion_id}.json"))
    }

    // ========== Social Account Paths ==========

    /// Directory containing creator social-account snapshots.
    pub fn social_dir(&self) -> PathBuf {
        self.root.join("social")
    }

    /// Directory for one creator's social accounts.
    pub fn social_creator_dir(&self, creator_user_id: &str) -> PathBuf {
        self.social_dir().join(creator_user_id)
    }

    /// Path to one creator's snapshot for a specific platform.
    pub fn social_account(&self, creator_user_id: &str, platform: &str) -> PathBuf {
        self.social_creator_dir(creator_user_id)
            .join(format!("{platform}.json"))
    }

    // ========== Handover Paths ==========

    /// Directory containing all handover records.
    pub fn handovers_dir(&self) -> PathBuf {
        self.root.join("handovers")
    }

    /// Path to a specific handover file.
    pub fn handover(&self, handover_id: &str) -> PathBuf {
        self.handovers_dir().join(format!("{handover_id}.json"))
    }

    // ========== Bank Account Paths ==========

    /// Directory containing payout bank accounts.
    pub fn bank_accounts_dir(&self) -> PathBuf {
        self.root.join("bank_accounts")
    }

    /// Path to a specific bank account file.
    pub fn bank_account(&self, bank_account_id: &str) -> PathBuf {
        self.bank_accounts_dir()
            .join(format!("{bank_account_id}.json"))
    }

    // ========== Ledger Paths ==========

    /// Directory containing the wallet ledger database.
    pub fn ledger_dir(&self) -> PathBuf {
        self.root.join("ledger")
    }

    /// Path to the redb ledger database file.
    pub fn ledger_db(&self) -> PathBuf {
        self.ledger_dir().join("ledger.redb")
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to the audit events file for a date (JSONL).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_root_is_data() {
        let paths = StoragePaths::default();
        assert_eq!(paths.root(), Path::new("/data"));
    }

    #[test]
    fn entity_paths_nest_under_root() {
        let paths = StoragePaths::new("/tmp/hearth-test");

        assert_eq!(
            paths.property("prop-1"),
            PathBuf::from("/tmp/hearth-test/properties/prop-1.json")
        );
        assert_eq!(
            paths.promotion("promo-1"),
            PathBuf::from("/tmp/hearth-test/promotions/promo-1.json")
        );
        assert_eq!(
            paths.social_account("user-1", "instagram"),
            PathBuf::from("/tmp/hearth-test/social/user-1/instagram.json")
        );
        assert_eq!(
            paths.handover("h-1"),
            PathBuf::from("/tmp/hearth-test/handovers/h-1.json")
        );
        assert_eq!(
            paths.bank_account("ba-1"),
            PathBuf::from("/tmp/hearth-test/bank_accounts/ba-1.json")
        );
        assert_eq!(
            paths.ledger_db(),
            PathBuf::from("/tmp/hearth-test/ledger/ledger.redb")
        );
    }

    #[test]
    fn audit_paths_group_by_date() {
        let paths = StoragePaths::new("/tmp/hearth-test");
        assert_eq!(
            paths.audit_events_file("2026-08-06"),
            PathBuf::from("/tmp/hearth-test/audit/2026-08-06/events.jsonl")
        );
    }
}
