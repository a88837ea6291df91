//! Seams between the round engine and whatever holds family data.
//!
//! The engine only needs data at round start and writes at round end, so these are
//! plain pull/push calls rather than live subscriptions. [`crate::storage::FamilyStore`]
//! implements all three; tests substitute in-memory fakes.

use chrono::NaiveDate;

use crate::storage::errors::StoreError;
use crate::storage::types::{RoundSettings, TransactionRecord, VocabularyEntry};

/// Snapshot of the vocabulary eligible for play.
pub trait VocabularySource {
    /// Entries with `active == true`, in any order.
    fn fetch_active_vocabulary(&self) -> Result<Vec<VocabularyEntry>, StoreError>;
}

/// Snapshot of the stored game settings.
pub trait SettingsSource {
    /// `Ok(None)` when no settings have been saved yet.
    fn fetch_settings(&self) -> Result<Option<RoundSettings>, StoreError>;
}

/// Currency and earnings writes performed by settlement, plus the ledger read used by the
/// daily cap gate.
pub trait Bank {
    /// Atomically add `delta` to the user's balance (creating the account if needed) and
    /// return the new balance.
    fn credit_balance(&self, user_id: &str, delta: i64) -> Result<i64, StoreError>;

    /// Append one record to the user's transaction log.
    fn append_transaction(&self, user_id: &str, record: TransactionRecord)
        -> Result<(), StoreError>;

    /// Create the day's earnings entry with `amount`, or atomically add `amount` to it.
    /// Returns the new total.
    fn upsert_earnings(&self, user_id: &str, day: NaiveDate, amount: u32)
        -> Result<u32, StoreError>;

    /// Total earned on `day`; zero when no entry exists.
    fn earnings_for(&self, user_id: &str, day: NaiveDate) -> Result<u32, StoreError>;
}
