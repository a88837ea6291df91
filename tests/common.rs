//! Test utilities & fixtures shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;
use quinncash::spell::tiles::{REVEAL_INTERVAL_MS, REVEAL_SETTLE_MS, SUCCESS_DELAY_MS};
use quinncash::spell::{Bank, Round, RoundProgress, SettlementStep};
use quinncash::storage::errors::StoreError;
use quinncash::storage::types::TransactionRecord;
use quinncash::storage::FamilyStore;
use tempfile::TempDir;

/// Fresh store in a temp dir. Keep the `TempDir` alive for the test's duration.
pub fn temp_store() -> (TempDir, FamilyStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FamilyStore::open(dir.path()).expect("open store");
    (dir, store)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, d).expect("valid date")
}

/// Spell the current word correctly and let the success delay pass.
pub fn spell_current(round: &mut Round) -> RoundProgress {
    let word: Vec<char> = round.current().word().chars().collect();
    for letter in word {
        round.tap_letter(letter);
    }
    round.advance(SUCCESS_DELAY_MS)
}

/// Tap wrong tiles until the current word fails, then let the reveal finish.
pub fn fail_current(round: &mut Round) -> RoundProgress {
    let threshold = round.settings().incorrect_threshold;
    for _ in 0..threshold {
        let expected = round.current().word().chars().next().expect("non-empty word");
        let wrong = round
            .current()
            .tiles()
            .iter()
            .position(|t| !t.used && t.letter != expected)
            .expect("word has a letter that is not its first");
        round.tap(wrong);
    }
    let len = round.current().word().len() as u64;
    round.advance(len * REVEAL_INTERVAL_MS + REVEAL_SETTLE_MS)
}

/// In-memory bank that can be told to fail one settlement step.
#[derive(Default)]
pub struct MemoryBank {
    pub balances: Mutex<HashMap<String, i64>>,
    pub transactions: Mutex<Vec<(String, TransactionRecord)>>,
    pub earnings: Mutex<HashMap<(String, NaiveDate), u32>>,
    pub fail_at: Option<SettlementStep>,
}

impl MemoryBank {
    pub fn failing_at(step: SettlementStep) -> Self {
        Self {
            fail_at: Some(step),
            ..Self::default()
        }
    }

    pub fn balance(&self, user: &str) -> i64 {
        *self.balances.lock().unwrap().get(user).unwrap_or(&0)
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }

    pub fn ledger(&self, user: &str, day: NaiveDate) -> Option<u32> {
        self.earnings
            .lock()
            .unwrap()
            .get(&(user.to_string(), day))
            .copied()
    }

    pub fn set_ledger(&self, user: &str, day: NaiveDate, total: u32) {
        self.earnings
            .lock()
            .unwrap()
            .insert((user.to_string(), day), total);
    }

    fn check(&self, step: SettlementStep) -> Result<(), StoreError> {
        if self.fail_at == Some(step) {
            Err(StoreError::Unavailable(format!("{} offline", step)))
        } else {
            Ok(())
        }
    }
}

impl Bank for MemoryBank {
    fn credit_balance(&self, user_id: &str, delta: i64) -> Result<i64, StoreError> {
        self.check(SettlementStep::CreditBalance)?;
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(user_id.to_string()).or_insert(0);
        *balance += delta;
        Ok(*balance)
    }

    fn append_transaction(
        &self,
        user_id: &str,
        record: TransactionRecord,
    ) -> Result<(), StoreError> {
        self.check(SettlementStep::AppendTransaction)?;
        self.transactions
            .lock()
            .unwrap()
            .push((user_id.to_string(), record));
        Ok(())
    }

    fn upsert_earnings(
        &self,
        user_id: &str,
        day: NaiveDate,
        amount: u32,
    ) -> Result<u32, StoreError> {
        self.check(SettlementStep::UpsertEarnings)?;
        let mut earnings = self.earnings.lock().unwrap();
        let total = earnings.entry((user_id.to_string(), day)).or_insert(0);
        *total += amount;
        Ok(*total)
    }

    fn earnings_for(&self, user_id: &str, day: NaiveDate) -> Result<u32, StoreError> {
        Ok(self.ledger(user_id, day).unwrap_or(0))
    }
}
