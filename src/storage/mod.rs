//! # Storage Module
//!
//! Sled-backed persistence for everything the family app keeps: the child's account and
//! balance, the transaction log, the spelling vocabulary and settings, the daily earnings
//! ledger, the prize store with its purchase requests and trophy case, and the nightly
//! session records.
//!
//! ## Layout
//!
//! Each collection lives in its own sled tree. Values are bincode-encoded records from
//! [`types`]. Keys are plain strings:
//!
//! - `users`: `<user_id>`
//! - `vocabulary`, `prizes`, `requests`: `<uuid>`
//! - `settings`: `default`
//! - `transactions`: `<user_id>:<nanos>:<uuid>` (time ordered)
//! - `earnings`, `sessions`: `<user_id>:<YYYY-MM-DD>`
//! - `history`: `<nanos>:<uuid>`
//! - `flags`: `bonus`, `starter_seeded`
//!
//! ## Atomicity
//!
//! Balance and earnings changes are relative increments applied with sled's
//! compare-and-swap loop ([`sled::Tree::update_and_fetch`]), so a grant from a parent and a
//! settling spelling round never lose each other's update.

pub mod errors;
pub mod types;

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::IVec;

use crate::spell::source::{Bank, SettingsSource, VocabularySource};
use errors::StoreError;
use types::{
    BonusTrigger, EarningsEntry, Prize, PurchaseHistoryEntry, PurchaseRequest, RoundSettings,
    SessionRecord, TransactionRecord, UserRecord, VocabularyEntry, TRANSACTION_SCHEMA_VERSION,
    USER_SCHEMA_VERSION,
};

const TREE_USERS: &str = "users";
const TREE_VOCABULARY: &str = "vocabulary";
const TREE_SETTINGS: &str = "settings";
const TREE_TRANSACTIONS: &str = "transactions";
const TREE_EARNINGS: &str = "earnings";
const TREE_PRIZES: &str = "prizes";
const TREE_REQUESTS: &str = "requests";
const TREE_HISTORY: &str = "history";
const TREE_FLAGS: &str = "flags";
const TREE_SESSIONS: &str = "sessions";

const SETTINGS_KEY: &[u8] = b"default";
const BONUS_KEY: &[u8] = b"bonus";
const SEEDED_KEY: &[u8] = b"starter_seeded";

fn next_timestamp_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1000)
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct FamilyStoreBuilder {
    path: PathBuf,
    starter_words: Vec<VocabularyEntry>,
}

impl FamilyStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            starter_words: Vec::new(),
        }
    }

    /// Seed these entries if the vocabulary is empty when the store opens.
    pub fn with_starter_words(mut self, words: Vec<VocabularyEntry>) -> Self {
        self.starter_words = words;
        self
    }

    pub fn open(self) -> Result<FamilyStore, StoreError> {
        let store = FamilyStore::open(self.path)?;
        if !self.starter_words.is_empty() {
            store.seed_vocabulary_if_empty(self.starter_words)?;
        }
        Ok(store)
    }
}

/// Sled-backed persistence for the family's accounts, store and game data.
#[derive(Clone)]
pub struct FamilyStore {
    _db: sled::Db,
    users: sled::Tree,
    vocabulary: sled::Tree,
    settings: sled::Tree,
    transactions: sled::Tree,
    earnings: sled::Tree,
    prizes: sled::Tree,
    requests: sled::Tree,
    history: sled::Tree,
    flags: sled::Tree,
    sessions: sled::Tree,
}

impl FamilyStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        Ok(Self {
            users: db.open_tree(TREE_USERS)?,
            vocabulary: db.open_tree(TREE_VOCABULARY)?,
            settings: db.open_tree(TREE_SETTINGS)?,
            transactions: db.open_tree(TREE_TRANSACTIONS)?,
            earnings: db.open_tree(TREE_EARNINGS)?,
            prizes: db.open_tree(TREE_PRIZES)?,
            requests: db.open_tree(TREE_REQUESTS)?,
            history: db.open_tree(TREE_HISTORY)?,
            flags: db.open_tree(TREE_FLAGS)?,
            sessions: db.open_tree(TREE_SESSIONS)?,
            _db: db,
        })
    }

    fn day_key(user_id: &str, day: NaiveDate) -> Vec<u8> {
        format!("{}:{}", user_id, day.format("%Y-%m-%d")).into_bytes()
    }

    fn transaction_prefix(user_id: &str) -> Vec<u8> {
        format!("{}:", user_id).into_bytes()
    }

    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(bincode::deserialize::<T>(bytes)?)
    }

    fn put<T: Serialize>(tree: &sled::Tree, key: &[u8], value: &T) -> Result<(), StoreError> {
        tree.insert(key, Self::serialize(value)?)?;
        tree.flush()?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(tree: &sled::Tree, key: &[u8]) -> Result<Option<T>, StoreError> {
        tree.get(key)?
            .map(|bytes: IVec| Self::deserialize(&bytes))
            .transpose()
    }

    fn scan_all<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>, StoreError> {
        tree.iter()
            .values()
            .map(|value| Self::deserialize(&value?))
            .collect()
    }

    /// Read-modify-write a single record atomically. `apply` may run more than once when
    /// another writer races us; it must be a pure function of the current value.
    fn update_record<T, F>(tree: &sled::Tree, key: &[u8], mut apply: F) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Option<T>) -> Result<T, StoreError>,
    {
        let mut failure: Option<StoreError> = None;
        let mut written: Option<T> = None;
        tree.update_and_fetch(key, |old| {
            failure = None;
            written = None;
            let keep = || old.map(|bytes| bytes.to_vec());
            let current = match old.map(Self::deserialize::<T>).transpose() {
                Ok(current) => current,
                Err(e) => {
                    failure = Some(e);
                    return keep();
                }
            };
            match apply(current).and_then(|next| Self::serialize(&next).map(|b| (next, b))) {
                Ok((next, bytes)) => {
                    written = Some(next);
                    Some(bytes)
                }
                Err(e) => {
                    failure = Some(e);
                    keep()
                }
            }
        })?;
        if let Some(e) = failure {
            return Err(e);
        }
        tree.flush()?;
        written.ok_or_else(|| StoreError::Internal("update produced no record".to_string()))
    }

    // ------------------------------------------------------------------
    // Users and balance
    // ------------------------------------------------------------------

    fn check_user_schema(record: UserRecord) -> Result<UserRecord, StoreError> {
        if record.schema_version != USER_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                entity: "user",
                expected: USER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Fetch the user's record, creating an empty account on first access.
    pub fn get_or_create_user(&self, user_id: &str) -> Result<UserRecord, StoreError> {
        let record = Self::update_record(&self.users, user_id.as_bytes(), |current: Option<UserRecord>| {
            Ok(current.unwrap_or_else(|| UserRecord::new(user_id)))
        })?;
        Self::check_user_schema(record)
    }

    pub fn get_user(&self, user_id: &str) -> Result<UserRecord, StoreError> {
        let Some(record) = Self::get::<UserRecord>(&self.users, user_id.as_bytes())? else {
            return Err(StoreError::NotFound(format!("user: {}", user_id)));
        };
        Self::check_user_schema(record)
    }

    /// Current balance; zero for users without an account yet.
    pub fn balance(&self, user_id: &str) -> Result<i64, StoreError> {
        match Self::get::<UserRecord>(&self.users, user_id.as_bytes())? {
            Some(record) => Ok(Self::check_user_schema(record)?.balance),
            None => Ok(0),
        }
    }

    /// Atomically apply `delta` to the balance. When `allow_negative` is false a change that
    /// would leave the balance below zero is refused with [`StoreError::InsufficientFunds`].
    pub fn adjust_balance(
        &self,
        user_id: &str,
        delta: i64,
        allow_negative: bool,
    ) -> Result<i64, StoreError> {
        let record = Self::update_record(&self.users, user_id.as_bytes(), |current: Option<UserRecord>| {
            let mut record = current.unwrap_or_else(|| UserRecord::new(user_id));
            let next = record.balance.saturating_add(delta);
            if next < 0 && delta < 0 && !allow_negative {
                return Err(StoreError::InsufficientFunds {
                    balance: record.balance,
                    needed: -delta,
                });
            }
            record.balance = next;
            record.touch();
            Ok(record)
        })?;
        Ok(record.balance)
    }

    pub fn set_pin_hash(&self, user_id: &str, hash: String) -> Result<(), StoreError> {
        Self::update_record(&self.users, user_id.as_bytes(), |current: Option<UserRecord>| {
            let mut record = current.unwrap_or_else(|| UserRecord::new(user_id));
            record.pin_hash = Some(hash.clone());
            record.touch();
            Ok(record)
        })?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transaction log
    // ------------------------------------------------------------------

    pub fn put_transaction(
        &self,
        user_id: &str,
        mut record: TransactionRecord,
    ) -> Result<(), StoreError> {
        record.schema_version = TRANSACTION_SCHEMA_VERSION;
        let key = format!(
            "{}:{:020}:{}",
            user_id,
            next_timestamp_nanos().max(0),
            record.id
        );
        Self::put(&self.transactions, key.as_bytes(), &record)
    }

    /// Transaction log for `user_id`, newest first.
    pub fn list_transactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.transactions
            .scan_prefix(Self::transaction_prefix(user_id))
            .values()
            .rev()
            .take(limit)
            .map(|value| Self::deserialize(&value?))
            .collect()
    }

    // ------------------------------------------------------------------
    // Vocabulary
    // ------------------------------------------------------------------

    pub fn put_vocabulary(&self, entry: &VocabularyEntry) -> Result<(), StoreError> {
        Self::put(&self.vocabulary, entry.id.as_bytes(), entry)
    }

    pub fn get_vocabulary(&self, id: &str) -> Result<VocabularyEntry, StoreError> {
        Self::get(&self.vocabulary, id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(format!("word: {}", id)))
    }

    /// All entries, oldest first.
    pub fn list_vocabulary(&self) -> Result<Vec<VocabularyEntry>, StoreError> {
        let mut entries: Vec<VocabularyEntry> = Self::scan_all(&self.vocabulary)?;
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.word.cmp(&b.word)));
        Ok(entries)
    }

    /// Returns true when an entry was removed.
    pub fn delete_vocabulary(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.vocabulary.remove(id.as_bytes())?.is_some();
        self.vocabulary.flush()?;
        Ok(removed)
    }

    /// Insert `entries` if the vocabulary is empty and no seeding happened before. A list
    /// the parent emptied on purpose stays empty. Returns how many were inserted.
    pub fn seed_vocabulary_if_empty(
        &self,
        entries: Vec<VocabularyEntry>,
    ) -> Result<usize, StoreError> {
        let first_seed = self
            .flags
            .compare_and_swap(SEEDED_KEY, None as Option<&[u8]>, Some(b"1".as_slice()))?
            .is_ok();
        self.flags.flush()?;
        if !first_seed || !self.vocabulary.is_empty() {
            return Ok(0);
        }
        let count = entries.len();
        for entry in entries {
            self.vocabulary
                .insert(entry.id.as_bytes(), Self::serialize(&entry)?)?;
        }
        self.vocabulary.flush()?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Settings and bonus trigger
    // ------------------------------------------------------------------

    pub fn get_settings(&self) -> Result<Option<RoundSettings>, StoreError> {
        Self::get(&self.settings, SETTINGS_KEY)
    }

    pub fn put_settings(&self, settings: &RoundSettings) -> Result<(), StoreError> {
        Self::put(&self.settings, SETTINGS_KEY, settings)
    }

    pub fn set_bonus_trigger(&self, trigger: &BonusTrigger) -> Result<(), StoreError> {
        Self::put(&self.flags, BONUS_KEY, trigger)
    }

    /// Remove and return the pending bonus trigger, if any. Only one caller can win.
    pub fn take_bonus_trigger(&self) -> Result<Option<BonusTrigger>, StoreError> {
        let taken = self.flags.remove(BONUS_KEY)?;
        self.flags.flush()?;
        taken.map(|bytes| Self::deserialize(&bytes)).transpose()
    }

    pub fn bonus_pending(&self) -> Result<bool, StoreError> {
        Ok(self.flags.contains_key(BONUS_KEY)?)
    }

    // ------------------------------------------------------------------
    // Earnings ledger
    // ------------------------------------------------------------------

    pub fn get_earnings(
        &self,
        user_id: &str,
        day: NaiveDate,
    ) -> Result<Option<EarningsEntry>, StoreError> {
        Self::get(&self.earnings, &Self::day_key(user_id, day))
    }

    // ------------------------------------------------------------------
    // Prizes, requests, trophy case
    // ------------------------------------------------------------------

    pub fn put_prize(&self, prize: &Prize) -> Result<(), StoreError> {
        Self::put(&self.prizes, prize.id.as_bytes(), prize)
    }

    pub fn get_prize(&self, id: &str) -> Result<Prize, StoreError> {
        Self::get(&self.prizes, id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(format!("prize: {}", id)))
    }

    /// All prizes, oldest first.
    pub fn list_prizes(&self) -> Result<Vec<Prize>, StoreError> {
        let mut prizes: Vec<Prize> = Self::scan_all(&self.prizes)?;
        prizes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(prizes)
    }

    pub fn delete_prize(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.prizes.remove(id.as_bytes())?.is_some();
        self.prizes.flush()?;
        Ok(removed)
    }

    /// Atomically rewrite an existing prize. Fails with `NotFound` if it was deleted.
    pub fn update_prize<F>(&self, id: &str, mut apply: F) -> Result<Prize, StoreError>
    where
        F: FnMut(Prize) -> Result<Prize, StoreError>,
    {
        Self::update_record(&self.prizes, id.as_bytes(), |current: Option<Prize>| {
            current
                .ok_or_else(|| StoreError::NotFound(format!("prize: {}", id)))
                .and_then(&mut apply)
        })
    }

    /// Flip a prize's availability if it still exists. Returns false when it was deleted.
    pub fn set_prize_available(&self, id: &str, available: bool) -> Result<bool, StoreError> {
        match self.update_prize(id, |mut prize| {
            prize.available = available;
            Ok(prize)
        }) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn put_request(&self, request: &PurchaseRequest) -> Result<(), StoreError> {
        Self::put(&self.requests, request.id.as_bytes(), request)
    }

    pub fn get_request(&self, id: &str) -> Result<PurchaseRequest, StoreError> {
        Self::get(&self.requests, id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(format!("request: {}", id)))
    }

    /// Atomically rewrite a purchase request.
    pub fn update_request<F>(&self, id: &str, apply: F) -> Result<PurchaseRequest, StoreError>
    where
        F: FnMut(Option<PurchaseRequest>) -> Result<PurchaseRequest, StoreError>,
    {
        Self::update_record(&self.requests, id.as_bytes(), apply)
    }

    /// All requests, newest first.
    pub fn list_requests(&self) -> Result<Vec<PurchaseRequest>, StoreError> {
        let mut requests: Vec<PurchaseRequest> = Self::scan_all(&self.requests)?;
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    pub fn append_history(&self, entry: &PurchaseHistoryEntry) -> Result<(), StoreError> {
        let key = format!("{:020}:{}", next_timestamp_nanos().max(0), entry.id);
        Self::put(&self.history, key.as_bytes(), entry)
    }

    /// Trophy case, newest first.
    pub fn list_history(&self) -> Result<Vec<PurchaseHistoryEntry>, StoreError> {
        self.history
            .iter()
            .values()
            .rev()
            .map(|value| Self::deserialize(&value?))
            .collect()
    }

    // ------------------------------------------------------------------
    // Nightly sessions
    // ------------------------------------------------------------------

    pub fn get_session(
        &self,
        user_id: &str,
        day: NaiveDate,
    ) -> Result<Option<SessionRecord>, StoreError> {
        Self::get(&self.sessions, &Self::day_key(user_id, day))
    }

    /// Atomically create-or-modify the day's session.
    pub fn update_session<F>(
        &self,
        user_id: &str,
        day: NaiveDate,
        mut apply: F,
    ) -> Result<SessionRecord, StoreError>
    where
        F: FnMut(SessionRecord) -> Result<SessionRecord, StoreError>,
    {
        Self::update_record(&self.sessions, &Self::day_key(user_id, day), |current: Option<SessionRecord>| {
            apply(current.unwrap_or_else(|| SessionRecord::new(user_id, day)))
        })
    }
}

impl VocabularySource for FamilyStore {
    fn fetch_active_vocabulary(&self) -> Result<Vec<VocabularyEntry>, StoreError> {
        Ok(self
            .list_vocabulary()?
            .into_iter()
            .filter(|entry| entry.active)
            .collect())
    }
}

impl SettingsSource for FamilyStore {
    fn fetch_settings(&self) -> Result<Option<RoundSettings>, StoreError> {
        self.get_settings()
    }
}

impl Bank for FamilyStore {
    fn credit_balance(&self, user_id: &str, delta: i64) -> Result<i64, StoreError> {
        self.adjust_balance(user_id, delta, true)
    }

    fn append_transaction(
        &self,
        user_id: &str,
        record: TransactionRecord,
    ) -> Result<(), StoreError> {
        self.put_transaction(user_id, record)
    }

    fn upsert_earnings(
        &self,
        user_id: &str,
        day: NaiveDate,
        amount: u32,
    ) -> Result<u32, StoreError> {
        let entry = Self::update_record(
            &self.earnings,
            &Self::day_key(user_id, day),
            |current: Option<EarningsEntry>| {
                Ok(match current {
                    Some(mut entry) => {
                        entry.total_earned = entry.total_earned.saturating_add(amount);
                        entry
                    }
                    None => EarningsEntry {
                        day,
                        total_earned: amount,
                    },
                })
            },
        )?;
        Ok(entry.total_earned)
    }

    fn earnings_for(&self, user_id: &str, day: NaiveDate) -> Result<u32, StoreError> {
        Ok(self
            .get_earnings(user_id, day)?
            .map(|entry| entry.total_earned)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{Glyph, TransactionKind};
    use tempfile::TempDir;

    fn open_store() -> (TempDir, FamilyStore) {
        let dir = TempDir::new().unwrap();
        let store = FamilyStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn balance_starts_at_zero_and_accumulates() {
        let (_dir, store) = open_store();
        assert_eq!(store.balance("quinn").unwrap(), 0);
        assert_eq!(store.credit_balance("quinn", 3).unwrap(), 3);
        assert_eq!(store.credit_balance("quinn", 4).unwrap(), 7);
        assert_eq!(store.get_user("quinn").unwrap().balance, 7);
    }

    #[test]
    fn guarded_deduction_refuses_overdraft() {
        let (_dir, store) = open_store();
        store.credit_balance("quinn", 2).unwrap();
        let err = store.adjust_balance("quinn", -5, false).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientFunds {
                balance: 2,
                needed: 5
            }
        ));
        assert_eq!(store.balance("quinn").unwrap(), 2);
        assert_eq!(store.adjust_balance("quinn", -5, true).unwrap(), -3);
    }

    #[test]
    fn concurrent_credits_are_not_lost() {
        let (_dir, store) = open_store();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.credit_balance("quinn", 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.balance("quinn").unwrap(), 200);
    }

    #[test]
    fn earnings_upsert_creates_then_increments() {
        let (_dir, store) = open_store();
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(store.earnings_for("quinn", day).unwrap(), 0);
        assert_eq!(store.upsert_earnings("quinn", day, 2).unwrap(), 2);
        assert_eq!(store.upsert_earnings("quinn", day, 3).unwrap(), 5);
        let other_day = day.succ_opt().unwrap();
        assert_eq!(store.earnings_for("quinn", other_day).unwrap(), 0);
    }

    #[test]
    fn transactions_list_newest_first() {
        let (_dir, store) = open_store();
        for amount in 1..=3 {
            store
                .put_transaction(
                    "quinn",
                    TransactionRecord::new(amount, TransactionKind::Manual, "grant"),
                )
                .unwrap();
        }
        store
            .put_transaction(
                "sibling",
                TransactionRecord::new(9, TransactionKind::Manual, "other"),
            )
            .unwrap();
        let log = store.list_transactions("quinn", 10).unwrap();
        let amounts: Vec<i64> = log.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![3, 2, 1]);
    }

    #[test]
    fn vocabulary_seeding_only_happens_once() {
        let (_dir, store) = open_store();
        let seeded = store
            .seed_vocabulary_if_empty(vec![VocabularyEntry::new(
                "cat",
                Glyph::Emoji("🐱".into()),
            )])
            .unwrap();
        assert_eq!(seeded, 1);
        let again = store
            .seed_vocabulary_if_empty(vec![VocabularyEntry::new(
                "dog",
                Glyph::Emoji("🐶".into()),
            )])
            .unwrap();
        assert_eq!(again, 0);
        assert_eq!(store.list_vocabulary().unwrap().len(), 1);

        let only = store.list_vocabulary().unwrap().remove(0);
        assert!(store.delete_vocabulary(&only.id).unwrap());
        let after_clear = store
            .seed_vocabulary_if_empty(vec![VocabularyEntry::new(
                "sun",
                Glyph::Emoji("🌞".into()),
            )])
            .unwrap();
        assert_eq!(after_clear, 0);
        assert!(store.list_vocabulary().unwrap().is_empty());
    }

    #[test]
    fn bonus_trigger_is_consumed_once() {
        let (_dir, store) = open_store();
        assert!(store.take_bonus_trigger().unwrap().is_none());
        store
            .set_bonus_trigger(&BonusTrigger {
                triggered_at: Utc::now(),
            })
            .unwrap();
        assert!(store.bonus_pending().unwrap());
        assert!(store.take_bonus_trigger().unwrap().is_some());
        assert!(store.take_bonus_trigger().unwrap().is_none());
    }
}
