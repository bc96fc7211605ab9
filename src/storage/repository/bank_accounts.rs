// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Payout bank-account repository.
//!
//! A bank account is registered once per user and carries the payment
//! gateway's transfer recipient code, so withdrawals can initiate a
//! transfer without re-creating the recipient every time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{DocumentStore, StorageError, StorageResult};

/// A payout bank account as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredBankAccount {
    /// Unique bank account identifier (UUID)
    pub bank_account_id: String,
    /// User this account belongs to
    pub owner_user_id: String,
    /// Bank display name
    pub bank_name: String,
    /// Gateway bank code
    pub bank_code: String,
    /// Account number
    pub account_number: String,
    /// Account holder name as resolved by the gateway
    pub account_name: String,
    /// Gateway transfer recipient code
    pub recipient_code: String,
    /// When the account was registered
    pub created_at: DateTime<Utc>,
}

impl StoredBankAccount {
    /// Account number with all but the last four digits masked.
    pub fn masked_account_number(&self) -> String {
        let len = self.account_number.len();
        if len <= 4 {
            return self.account_number.clone();
        }
        format!("{}{}", "*".repeat(len - 4), &self.account_number[len - 4..])
    }
}

impl super::super::OwnedResource for StoredBankAccount {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }
}

/// Repository for payout bank accounts.
pub struct BankAccountRepository<'a> {
    storage: &'a DocumentStore,
}

impl<'a> BankAccountRepository<'a> {
    /// Create a new BankAccountRepository.
    pub fn new(storage: &'a DocumentStore) -> Self {
        Self { storage }
    }

    /// Check if a bank account exists.
    pub fn exists(&self, bank_account_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().bank_account(bank_account_id))
    }

    /// Get a bank account by ID.
    pub fn get(&self, bank_account_id: &str) -> StorageResult<StoredBankAccount> {
        let path = self.storage.paths().bank_account(bank_account_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!(
                "Bank account {bank_account_id}"
            )));
        }
        self.storage.read_json(path)
    }

    /// Register a new bank account.
    pub fn create(&self, account: &StoredBankAccount) -> StorageResult<()> {
        if self.exists(&account.bank_account_id) {
            return Err(StorageError::AlreadyExists(format!(
                "Bank account {}",
                account.bank_account_id
            )));
        }
        self.storage.write_json(
            self.storage.paths().bank_account(&account.bank_account_id),
            account,
        )
    }

    /// List all bank accounts owned by a user.
    pub fn list_by_owner(&self, owner_user_id: &str) -> StorageResult<Vec<StoredBankAccount>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().bank_accounts_dir(), "json")?;
        let mut accounts = Vec::new();
        for id in &ids {
            if let Ok(account) = self.get(id) {
                if account.owner_user_id == owner_user_id {
                    accounts.push(account);
                }
            }
        }
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
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

    fn test_account(id: &str, owner: &str) -> StoredBankAccount {
        StoredBankAccount {
            bank_account_id: id.to_string(),
            owner_user_id: owner.to_string(),
            bank_name: "First Bank".to_string(),
            bank_code: "011".to_string(),
            account_number: "0123456789".to_string(),
            account_name: "ADA OBI".to_string(),
            recipient_code: "RCP_abc123".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_get() {
        let (_temp, storage) = setup();
        let repo = BankAccountRepository::new(&storage);

        repo.create(&test_account("ba-1", "user-1")).unwrap();
        let loaded = repo.get("ba-1").unwrap();
        assert_eq!(loaded.recipient_code, "RCP_abc123");
    }

    #[test]
    fn list_by_owner_filters() {
        let (_temp, storage) = setup();
        let repo = BankAccountRepository::new(&storage);

        repo.create(&test_account("ba-1", "user-1")).unwrap();
        repo.create(&test_account("ba-2", "user-2")).unwrap();

        assert_eq!(repo.list_by_owner("user-1").unwrap().len(), 1);
        assert_eq!(repo.list_by_owner("user-3").unwrap().len(), 0);
    }

    #[test]
    fn masks_account_number() {
        let account = test_account("ba-1", "user-1");
        assert_eq!(account.masked_account_number(), "******6789");
    }
}
