// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Embedded wallet ledger backed by redb (pure Rust, ACID).
//!
//! This is the single owner of balance mutation. Deposits, withdrawal
//! holds, settlements and compensations each run as one redb write
//! transaction that updates the wallet account AND its ledger entry
//! together, so a crash or a concurrent request can never observe a
//! half-applied money movement. Routes call these methods instead of
//! hand-rolling read-compute-write cycles.
//!
//! ## Table Layout
//!
//! - `accounts`: wallet_id → serialized WalletAccount
//! - `owner_wallets`: owner_user_id → wallet_id
//! - `entries`: entry_id → serialized LedgerEntry
//! - `wallet_entry_index`: composite key (wallet_id|!timestamp|entry_id) → kind

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::model::{EntryKind, EntryStatus, LedgerEntry, WalletAccount};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: wallet_id → serialized WalletAccount (JSON bytes).
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Map: owner_user_id → wallet_id (one wallet per user).
const OWNER_WALLETS: TableDefinition<&str, &str> = TableDefinition::new("owner_wallets");

/// Primary table: entry_id → serialized LedgerEntry (JSON bytes).
const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

/// Index: composite key → entry kind ("deposit"|"withdrawal").
/// Key format: `wallet_id|!timestamp_be|entry_id` for descending-time scans.
const WALLET_ENTRY_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("wallet_entry_index");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient available balance: need {needed_minor}, have {available_minor}")]
    InsufficientFunds {
        needed_minor: i64,
        available_minor: i64,
    },

    #[error("ledger entry {entry_id} is in `{status}` status, expected `{expected}`")]
    InvalidEntryState {
        entry_id: String,
        status: &'static str,
        expected: &'static str,
    },

    #[error("balance conservation violated on wallet {wallet_id}")]
    ConservationViolated { wallet_id: String },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

fn status_name(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Pending => "pending",
        EntryStatus::Processing => "processing",
        EntryStatus::Successful => "successful",
        EntryStatus::Failed => "failed",
        EntryStatus::Reversed => "reversed",
    }
}

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the wallet_entry_index table.
///
/// Format: `wallet_id | inverted_timestamp_be_bytes | entry_id`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
fn make_index_key(wallet_id: &str, timestamp: i64, entry_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(wallet_id.len() + 1 + 8 + 1 + entry_id.len());
    key.extend_from_slice(wallet_id.as_bytes());
    key.push(b'|');
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!timestamp as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(entry_id.as_bytes());
    key
}

/// Build a prefix key for range scanning all entries of a wallet.
fn make_prefix(wallet_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(wallet_id.len() + 1);
    prefix.extend_from_slice(wallet_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a range scan (prefix with 0xFF bytes appended).
fn make_prefix_end(wallet_id: &str) -> Vec<u8> {
    let mut end = make_prefix(wallet_id);
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Extract the entry_id from a composite index key.
fn extract_entry_id_from_key(key: &[u8]) -> Option<String> {
    // entry_id starts after wallet_id, '|', 8 timestamp bytes and '|'
    let second_sep = key.iter().position(|&b| b == b'|')? + 1 + 8;
    if key.get(second_sep) != Some(&b'|') {
        return None;
    }
    String::from_utf8(key[second_sep + 1..].to_vec()).ok()
}

// =============================================================================
// LedgerDb
// =============================================================================

/// Embedded ACID wallet ledger.
pub struct LedgerDb {
    db: Database,
}

impl LedgerDb {
    /// Open (or create) the ledger database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(OWNER_WALLETS)?;
            let _ = write_txn.open_table(ENTRIES)?;
            let _ = write_txn.open_table(WALLET_ENTRY_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Quick open-and-read check for the health endpoint.
    pub fn health_check(&self) -> LedgerResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ACCOUNTS)?;
        Ok(())
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Get the wallet for a user, creating it on first access.
    pub fn get_or_create_for_owner(
        &self,
        owner_user_id: &str,
        currency: &str,
    ) -> LedgerResult<WalletAccount> {
        if let Some(account) = self.get_account_by_owner(owner_user_id)? {
            return Ok(account);
        }

        let account = WalletAccount::new(
            uuid::Uuid::new_v4().to_string(),
            owner_user_id.to_string(),
            currency.to_string(),
        );
        let json = serde_json::to_vec(&account)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut owners = write_txn.open_table(OWNER_WALLETS)?;
            // Lost race with a concurrent first access: keep the existing wallet
            if owners.get(owner_user_id)?.is_some() {
                drop(owners);
                write_txn.abort()?;
                return Ok(self
                    .get_account_by_owner(owner_user_id)?
                    .expect("owner mapping exists"));
            }
            owners.insert(owner_user_id, account.wallet_id.as_str())?;

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            accounts.insert(account.wallet_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(account)
    }

    /// Look up a wallet account by ID.
    pub fn get_account(&self, wallet_id: &str) -> LedgerResult<WalletAccount> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        match table.get(wallet_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(LedgerError::NotFound(format!("Wallet {wallet_id}"))),
        }
    }

    /// Look up a wallet account by its owner.
    pub fn get_account_by_owner(
        &self,
        owner_user_id: &str,
    ) -> LedgerResult<Option<WalletAccount>> {
        let read_txn = self.db.begin_read()?;
        let owners = read_txn.open_table(OWNER_WALLETS)?;
        let Some(wallet_id) = owners.get(owner_user_id)? else {
            return Ok(None);
        };
        let accounts = read_txn.open_table(ACCOUNTS)?;
        match accounts.get(wallet_id.value())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// List every wallet account (admin view).
    pub fn list_accounts(&self) -> LedgerResult<Vec<WalletAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            accounts.push(serde_json::from_slice(value.value())?);
        }
        Ok(accounts)
    }

    /// Mutate a wallet account inside one write transaction.
    ///
    /// Used for non-balance fields: PIN setup, attempt counters, lockouts
    /// and admin suspension. Balance fields must go through the ledger
    /// operations below; this method rejects closures that change them.
    pub fn mutate_account<F>(&self, wallet_id: &str, mutate: F) -> LedgerResult<WalletAccount>
    where
        F: FnOnce(&mut WalletAccount),
    {
        let write_txn = self.db.begin_write()?;
        let account = {
            let mut table = write_txn.open_table(ACCOUNTS)?;
            let existing_bytes = {
                let existing = table
                    .get(wallet_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("Wallet {wallet_id}")))?;
                existing.value().to_vec()
            };

            let mut account: WalletAccount = serde_json::from_slice(&existing_bytes)?;
            let before = (account.available_minor, account.locked_minor);
            mutate(&mut account);
            if (account.available_minor, account.locked_minor) != before {
                return Err(LedgerError::ConservationViolated {
                    wallet_id: wallet_id.to_string(),
                });
            }
            account.updated_at = Utc::now();

            let json = serde_json::to_vec(&account)?;
            table.insert(wallet_id, json.as_slice())?;
            account
        };
        write_txn.commit()?;
        Ok(account)
    }

    // =========================================================================
    // Ledger operations
    //
    // Each operation updates the account and its entry in one transaction.
    // =========================================================================

    /// Record a freshly initialized deposit (no balance effect yet).
    pub fn record_deposit(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        debug_assert_eq!(entry.kind, EntryKind::Deposit);
        debug_assert_eq!(entry.status, EntryStatus::Pending);

        let json = serde_json::to_vec(entry)?;
        let write_txn = self.db.begin_write()?;
        {
            // The wallet must exist before money can reference it
            let accounts = write_txn.open_table(ACCOUNTS)?;
            if accounts.get(entry.wallet_id.as_str())?.is_none() {
                return Err(LedgerError::NotFound(format!("Wallet {}", entry.wallet_id)));
            }
            drop(accounts);

            let mut entries = write_txn.open_table(ENTRIES)?;
            entries.insert(entry.entry_id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(WALLET_ENTRY_INDEX)?;
            let key = make_index_key(
                &entry.wallet_id,
                entry.created_at.timestamp(),
                &entry.entry_id,
            );
            index.insert(key.as_slice(), entry.kind.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Settle a verified deposit: mark the entry successful and credit the
    /// available balance. Idempotent: a second call on an already
    /// successful entry changes nothing.
    pub fn settle_deposit(&self, entry_id: &str) -> LedgerResult<LedgerEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut entries = write_txn.open_table(ENTRIES)?;
            let mut entry = read_entry(&entries, entry_id)?;

            if entry.status == EntryStatus::Successful {
                // Already credited; nothing more to do
                drop(entries);
                write_txn.abort()?;
                return Ok(entry);
            }
            if entry.status != EntryStatus::Pending {
                return Err(LedgerError::InvalidEntryState {
                    entry_id: entry_id.to_string(),
                    status: status_name(entry.status),
                    expected: "pending",
                });
            }

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut account = read_account(&accounts, &entry.wallet_id)?;

            let before = account.available_minor + account.locked_minor;
            account.available_minor += entry.amount_minor;
            check_conservation(&account, before + entry.amount_minor)?;
            account.updated_at = Utc::now();

            entry.status = EntryStatus::Successful;
            entry.updated_at = Utc::now();

            write_account(&mut accounts, &account)?;
            write_entry(&mut entries, &entry)?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Mark a pending deposit as failed at the gateway (no balance effect).
    pub fn fail_deposit(&self, entry_id: &str, reason: &str) -> LedgerResult<LedgerEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut entries = write_txn.open_table(ENTRIES)?;
            let mut entry = read_entry(&entries, entry_id)?;

            if entry.status != EntryStatus::Pending {
                return Err(LedgerError::InvalidEntryState {
                    entry_id: entry_id.to_string(),
                    status: status_name(entry.status),
                    expected: "pending",
                });
            }

            entry.status = EntryStatus::Failed;
            entry.failure_reason = Some(reason.to_string());
            entry.updated_at = Utc::now();
            write_entry(&mut entries, &entry)?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Place a withdrawal hold: move `amount` from available to locked and
    /// record the entry as processing, atomically.
    ///
    /// Fails with `InsufficientFunds` (and no balance mutation) when the
    /// available balance cannot cover the amount.
    pub fn hold_for_withdrawal(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        debug_assert_eq!(entry.kind, EntryKind::Withdrawal);
        debug_assert_eq!(entry.status, EntryStatus::Processing);

        let write_txn = self.db.begin_write()?;
        {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut account = read_account(&accounts, &entry.wallet_id)?;

            if account.available_minor < entry.amount_minor {
                return Err(LedgerError::InsufficientFunds {
                    needed_minor: entry.amount_minor,
                    available_minor: account.available_minor,
                });
            }

            let before = account.available_minor + account.locked_minor;
            account.available_minor -= entry.amount_minor;
            account.locked_minor += entry.amount_minor;
            check_conservation(&account, before)?;
            account.updated_at = Utc::now();
            write_account(&mut accounts, &account)?;

            let json = serde_json::to_vec(entry)?;
            let mut entries = write_txn.open_table(ENTRIES)?;
            entries.insert(entry.entry_id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(WALLET_ENTRY_INDEX)?;
            let key = make_index_key(
                &entry.wallet_id,
                entry.created_at.timestamp(),
                &entry.entry_id,
            );
            index.insert(key.as_slice(), entry.kind.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Record the gateway transfer code on an in-flight withdrawal.
    pub fn attach_transfer_code(
        &self,
        entry_id: &str,
        transfer_code: &str,
    ) -> LedgerResult<LedgerEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut entries = write_txn.open_table(ENTRIES)?;
            let mut entry = read_entry(&entries, entry_id)?;

            if entry.status != EntryStatus::Processing {
                return Err(LedgerError::InvalidEntryState {
                    entry_id: entry_id.to_string(),
                    status: status_name(entry.status),
                    expected: "processing",
                });
            }

            entry.transfer_code = Some(transfer_code.to_string());
            entry.updated_at = Utc::now();
            write_entry(&mut entries, &entry)?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Settle a successful withdrawal: burn the locked hold and mark the
    /// entry successful.
    pub fn settle_withdrawal(
        &self,
        entry_id: &str,
        transfer_code: &str,
    ) -> LedgerResult<LedgerEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut entries = write_txn.open_table(ENTRIES)?;
            let mut entry = read_entry(&entries, entry_id)?;

            if entry.status != EntryStatus::Processing {
                return Err(LedgerError::InvalidEntryState {
                    entry_id: entry_id.to_string(),
                    status: status_name(entry.status),
                    expected: "processing",
                });
            }

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut account = read_account(&accounts, &entry.wallet_id)?;

            let before = account.available_minor + account.locked_minor;
            account.locked_minor -= entry.amount_minor;
            check_conservation(&account, before - entry.amount_minor)?;
            account.updated_at = Utc::now();

            entry.status = EntryStatus::Successful;
            entry.transfer_code = Some(transfer_code.to_string());
            entry.updated_at = Utc::now();

            write_account(&mut accounts, &account)?;
            write_entry(&mut entries, &entry)?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Compensate a failed withdrawal: release the hold back to available
    /// and mark the entry reversed, atomically. Balances end exactly where
    /// they were before the hold.
    pub fn reverse_withdrawal(&self, entry_id: &str, reason: &str) -> LedgerResult<LedgerEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut entries = write_txn.open_table(ENTRIES)?;
            let mut entry = read_entry(&entries, entry_id)?;

            if entry.status != EntryStatus::Processing {
                return Err(LedgerError::InvalidEntryState {
                    entry_id: entry_id.to_string(),
                    status: status_name(entry.status),
                    expected: "processing",
                });
            }

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut account = read_account(&accounts, &entry.wallet_id)?;

            let before = account.available_minor + account.locked_minor;
            account.locked_minor -= entry.amount_minor;
            account.available_minor += entry.amount_minor;
            check_conservation(&account, before)?;
            account.updated_at = Utc::now();

            entry.status = EntryStatus::Reversed;
            entry.failure_reason = Some(reason.to_string());
            entry.updated_at = Utc::now();

            write_account(&mut accounts, &account)?;
            write_entry(&mut entries, &entry)?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Re-arm a reversed withdrawal for retry: place a fresh hold and move
    /// the entry back to processing.
    pub fn retry_withdrawal(&self, entry_id: &str) -> LedgerResult<LedgerEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut entries = write_txn.open_table(ENTRIES)?;
            let mut entry = read_entry(&entries, entry_id)?;

            if entry.status != EntryStatus::Reversed {
                return Err(LedgerError::InvalidEntryState {
                    entry_id: entry_id.to_string(),
                    status: status_name(entry.status),
                    expected: "reversed",
                });
            }

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut account = read_account(&accounts, &entry.wallet_id)?;

            if account.available_minor < entry.amount_minor {
                return Err(LedgerError::InsufficientFunds {
                    needed_minor: entry.amount_minor,
                    available_minor: account.available_minor,
                });
            }

            let before = account.available_minor + account.locked_minor;
            account.available_minor -= entry.amount_minor;
            account.locked_minor += entry.amount_minor;
            check_conservation(&account, before)?;
            account.updated_at = Utc::now();

            entry.status = EntryStatus::Processing;
            entry.failure_reason = None;
            entry.updated_at = Utc::now();

            write_account(&mut accounts, &account)?;
            write_entry(&mut entries, &entry)?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    // =========================================================================
    // Entry queries
    // =========================================================================

    /// Look up a single ledger entry by ID.
    pub fn get_entry(&self, entry_id: &str) -> LedgerResult<LedgerEntry> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        match table.get(entry_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(LedgerError::NotFound(format!("Ledger entry {entry_id}"))),
        }
    }

    /// Find an entry by its gateway charge reference.
    pub fn find_entry_by_reference(&self, reference: &str) -> LedgerResult<Option<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        for item in table.iter()? {
            let (_, value) = item?;
            let entry: LedgerEntry = serde_json::from_slice(value.value())?;
            if entry.gateway_reference.as_deref() == Some(reference) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Newest-first listing of a wallet's ledger entries.
    pub fn list_entries_by_wallet(
        &self,
        wallet_id: &str,
        limit: usize,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(WALLET_ENTRY_INDEX)?;
        let entries_table = read_txn.open_table(ENTRIES)?;

        let prefix = make_prefix(wallet_id);
        let prefix_end = make_prefix_end(wallet_id);

        let mut results = Vec::new();
        for item in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let (key, _) = item?;
            let key_bytes = key.value().to_vec();
            if let Some(entry_id) = extract_entry_id_from_key(&key_bytes) {
                if let Some(value) = entries_table.get(entry_id.as_str())? {
                    results.push(serde_json::from_slice(value.value())?);
                }
            }
            if results.len() >= limit {
                break;
            }
        }
        Ok(results)
    }
}

// =============================================================================
// Table helpers
// =============================================================================

fn read_account(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    wallet_id: &str,
) -> LedgerResult<WalletAccount> {
    let bytes = {
        let value = table
            .get(wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Wallet {wallet_id}")))?;
        value.value().to_vec()
    };
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_account(
    table: &mut redb::Table<'_, &'static str, &'static [u8]>,
    account: &WalletAccount,
) -> LedgerResult<()> {
    let json = serde_json::to_vec(account)?;
    table.insert(account.wallet_id.as_str(), json.as_slice())?;
    Ok(())
}

fn read_entry(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    entry_id: &str,
) -> LedgerResult<LedgerEntry> {
    let bytes = {
        let value = table
            .get(entry_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Ledger entry {entry_id}")))?;
        value.value().to_vec()
    };
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_entry(
    table: &mut redb::Table<'_, &'static str, &'static [u8]>,
    entry: &LedgerEntry,
) -> LedgerResult<()> {
    let json = serde_json::to_vec(entry)?;
    table.insert(entry.entry_id.as_str(), json.as_slice())?;
    Ok(())
}

/// Verify balances are non-negative and sum to the expected total.
fn check_conservation(account: &WalletAccount, expected_total: i64) -> LedgerResult<()> {
    if account.available_minor < 0
        || account.locked_minor < 0
        || account.available_minor + account.locked_minor != expected_total
    {
        return Err(LedgerError::ConservationViolated {
            wallet_id: account.wallet_id.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_db() -> (TempDir, LedgerDb) {
        let temp = TempDir::new().unwrap();
        let db = LedgerDb::open(&temp.path().join("ledger.redb")).unwrap();
        (temp, db)
    }

    fn deposit_entry(wallet_id: &str, amount: i64) -> LedgerEntry {
        LedgerEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            wallet_id: wallet_id.to_string(),
            kind: EntryKind::Deposit,
            status: EntryStatus::Pending,
            amount_minor: amount,
            currency: "NGN".to_string(),
            gateway_reference: Some(format!("ref-{}", uuid::Uuid::new_v4())),
            transfer_code: None,
            bank_account_id: None,
            failure_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn withdrawal_entry(wallet_id: &str, amount: i64) -> LedgerEntry {
        LedgerEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            wallet_id: wallet_id.to_string(),
            kind: EntryKind::Withdrawal,
            status: EntryStatus::Processing,
            amount_minor: amount,
            currency: "NGN".to_string(),
            gateway_reference: None,
            transfer_code: None,
            bank_account_id: Some("ba-1".to_string()),
            failure_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Fund a wallet through the normal deposit path.
    fn fund(db: &LedgerDb, wallet_id: &str, amount: i64) {
        let entry = deposit_entry(wallet_id, amount);
        db.record_deposit(&entry).unwrap();
        db.settle_deposit(&entry.entry_id).unwrap();
    }

    #[test]
    fn one_wallet_per_owner() {
        let (_temp, db) = open_db();

        let first = db.get_or_create_for_owner("user-1", "NGN").unwrap();
        let second = db.get_or_create_for_owner("user-1", "NGN").unwrap();
        assert_eq!(first.wallet_id, second.wallet_id);

        let other = db.get_or_create_for_owner("user-2", "NGN").unwrap();
        assert_ne!(first.wallet_id, other.wallet_id);
    }

    #[test]
    fn deposit_settles_into_available() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();

        let entry = deposit_entry(&wallet.wallet_id, 10_000);
        db.record_deposit(&entry).unwrap();

        // Pending deposit has no balance effect
        let account = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(account.available_minor, 0);

        db.settle_deposit(&entry.entry_id).unwrap();
        let account = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(account.available_minor, 10_000);
        assert_eq!(account.locked_minor, 0);
    }

    #[test]
    fn deposit_settlement_is_idempotent() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();

        let entry = deposit_entry(&wallet.wallet_id, 10_000);
        db.record_deposit(&entry).unwrap();
        db.settle_deposit(&entry.entry_id).unwrap();
        db.settle_deposit(&entry.entry_id).unwrap();

        let account = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(account.available_minor, 10_000);
    }

    #[test]
    fn hold_rejects_insufficient_funds_without_mutation() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();
        fund(&db, &wallet.wallet_id, 5_000);

        let entry = withdrawal_entry(&wallet.wallet_id, 8_000);
        let result = db.hold_for_withdrawal(&entry);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds {
                needed_minor: 8_000,
                available_minor: 5_000
            })
        ));

        let account = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(account.available_minor, 5_000);
        assert_eq!(account.locked_minor, 0);
        // Entry was never recorded
        assert!(db.get_entry(&entry.entry_id).is_err());
    }

    #[test]
    fn withdrawal_hold_then_settle() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();
        fund(&db, &wallet.wallet_id, 10_000);

        let entry = withdrawal_entry(&wallet.wallet_id, 6_000);
        db.hold_for_withdrawal(&entry).unwrap();

        let account = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(account.available_minor, 4_000);
        assert_eq!(account.locked_minor, 6_000);

        let settled = db.settle_withdrawal(&entry.entry_id, "TRF_ok").unwrap();
        assert_eq!(settled.status, EntryStatus::Successful);
        assert_eq!(settled.transfer_code.as_deref(), Some("TRF_ok"));

        let account = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(account.available_minor, 4_000);
        assert_eq!(account.locked_minor, 0);
    }

    #[test]
    fn failed_transfer_restores_pre_withdrawal_balances() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();
        fund(&db, &wallet.wallet_id, 10_000);

        let entry = withdrawal_entry(&wallet.wallet_id, 6_000);
        db.hold_for_withdrawal(&entry).unwrap();

        let reversed = db
            .reverse_withdrawal(&entry.entry_id, "gateway declined")
            .unwrap();
        assert_eq!(reversed.status, EntryStatus::Reversed);
        assert_eq!(reversed.failure_reason.as_deref(), Some("gateway declined"));

        let account = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(account.available_minor, 10_000);
        assert_eq!(account.locked_minor, 0);
    }

    #[test]
    fn reversed_withdrawal_can_retry() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();
        fund(&db, &wallet.wallet_id, 10_000);

        let entry = withdrawal_entry(&wallet.wallet_id, 6_000);
        db.hold_for_withdrawal(&entry).unwrap();
        db.reverse_withdrawal(&entry.entry_id, "timeout").unwrap();

        let retried = db.retry_withdrawal(&entry.entry_id).unwrap();
        assert_eq!(retried.status, EntryStatus::Processing);
        assert!(retried.failure_reason.is_none());

        let account = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(account.available_minor, 4_000);
        assert_eq!(account.locked_minor, 6_000);

        db.settle_withdrawal(&entry.entry_id, "TRF_retry").unwrap();
        let account = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(account.available_minor, 4_000);
        assert_eq!(account.locked_minor, 0);
    }

    #[test]
    fn retry_requires_reversed_state() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();
        fund(&db, &wallet.wallet_id, 10_000);

        let entry = withdrawal_entry(&wallet.wallet_id, 2_000);
        db.hold_for_withdrawal(&entry).unwrap();
        db.settle_withdrawal(&entry.entry_id, "TRF_done").unwrap();

        let result = db.retry_withdrawal(&entry.entry_id);
        assert!(matches!(
            result,
            Err(LedgerError::InvalidEntryState { .. })
        ));
    }

    #[test]
    fn entries_list_newest_first() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();

        let mut first = deposit_entry(&wallet.wallet_id, 1_000);
        first.created_at = Utc::now() - chrono::Duration::hours(2);
        let mut second = deposit_entry(&wallet.wallet_id, 2_000);
        second.created_at = Utc::now() - chrono::Duration::hours(1);
        let third = deposit_entry(&wallet.wallet_id, 3_000);

        db.record_deposit(&first).unwrap();
        db.record_deposit(&second).unwrap();
        db.record_deposit(&third).unwrap();

        let listed = db.list_entries_by_wallet(&wallet.wallet_id, 10).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].amount_minor, 3_000);
        assert_eq!(listed[1].amount_minor, 2_000);
        assert_eq!(listed[2].amount_minor, 1_000);

        let limited = db.list_entries_by_wallet(&wallet.wallet_id, 2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn find_entry_by_reference() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();

        let mut entry = deposit_entry(&wallet.wallet_id, 1_000);
        entry.gateway_reference = Some("hearth-dep-42".to_string());
        db.record_deposit(&entry).unwrap();

        let found = db.find_entry_by_reference("hearth-dep-42").unwrap();
        assert_eq!(found.unwrap().entry_id, entry.entry_id);
        assert!(db.find_entry_by_reference("missing").unwrap().is_none());
    }

    #[test]
    fn mutate_account_rejects_balance_changes() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();

        let result = db.mutate_account(&wallet.wallet_id, |account| {
            account.available_minor += 1_000_000;
        });
        assert!(matches!(
            result,
            Err(LedgerError::ConservationViolated { .. })
        ));

        let account = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(account.available_minor, 0);
    }

    #[test]
    fn mutate_account_updates_pin_fields() {
        let (_temp, db) = open_db();
        let wallet = db.get_or_create_for_owner("user-1", "NGN").unwrap();

        let updated = db
            .mutate_account(&wallet.wallet_id, |account| {
                account.is_setup = true;
                account.pin_digest = Some("digest".to_string());
                account.pin_salt = Some("salt".to_string());
            })
            .unwrap();
        assert!(updated.is_setup);

        let reloaded = db.get_account(&wallet.wallet_id).unwrap();
        assert_eq!(reloaded.pin_digest.as_deref(), Some("digest"));
    }
}
