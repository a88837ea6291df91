//! Tonight session: three coins a night that a parent can take away before banking.

use chrono::{NaiveDate, Utc};
use log::info;

use super::errors::FamilyError;
use crate::storage::errors::StoreError;
use crate::storage::types::{SessionRecord, TransactionKind, TransactionRecord};
use crate::storage::FamilyStore;

/// Today's session, created with every coin in place if none exists yet.
pub fn tonight(store: &FamilyStore, user_id: &str, day: NaiveDate) -> Result<SessionRecord, FamilyError> {
    Ok(store
        .get_session(user_id, day)?
        .unwrap_or_else(|| SessionRecord::new(user_id, day)))
}

/// Apply `change` to the day's session atomically. The closure reports refusals as
/// `FamilyError`; they are carried out of the store's CAS loop untouched.
fn modify<F>(
    store: &FamilyStore,
    user_id: &str,
    day: NaiveDate,
    mut change: F,
) -> Result<SessionRecord, FamilyError>
where
    F: FnMut(&mut SessionRecord) -> Result<(), FamilyError>,
{
    let mut refusal: Option<FamilyError> = None;
    let result = store.update_session(user_id, day, |mut record: SessionRecord| {
        refusal = None;
        match change(&mut record) {
            Ok(()) => Ok(record),
            Err(e) => {
                refusal = Some(e);
                Err(StoreError::Internal("session change refused".into()))
            }
        }
    });
    match (result, refusal) {
        (Ok(record), _) => Ok(record),
        (Err(_), Some(e)) => Err(e),
        (Err(e), None) => Err(e.into()),
    }
}

/// Revoke coin `coin` (1-based), or give it back if it was already revoked.
pub fn toggle_coin(
    store: &FamilyStore,
    user_id: &str,
    day: NaiveDate,
    coin: u8,
) -> Result<SessionRecord, FamilyError> {
    let record = modify(store, user_id, day, |record| {
        if record.banked {
            return Err(FamilyError::SessionBanked);
        }
        if coin == 0 || coin > record.coins_started {
            return Err(FamilyError::NoSuchCoin(coin));
        }
        if let Some(pos) = record.revoked.iter().position(|c| *c == coin) {
            record.revoked.remove(pos);
        } else {
            record.revoked.push(coin);
            record.revoked.sort_unstable();
        }
        Ok(())
    })?;
    info!(
        "tonight: coin {} toggled for {}, {} remaining",
        coin,
        user_id,
        record.remaining()
    );
    Ok(record)
}

/// Bank the remaining coins. Happens at most once per day.
pub fn bank(
    store: &FamilyStore,
    user_id: &str,
    day: NaiveDate,
) -> Result<SessionRecord, FamilyError> {
    let record = modify(store, user_id, day, |record| {
        if record.banked {
            return Err(FamilyError::SessionBanked);
        }
        let remaining = record.remaining();
        if remaining == 0 {
            return Err(FamilyError::NothingToBank);
        }
        record.banked = true;
        record.coins_banked = remaining;
        record.banked_at = Some(Utc::now());
        Ok(())
    })?;

    let amount = record.coins_banked as i64;
    let balance = store.adjust_balance(user_id, amount, true)?;
    store.put_transaction(
        user_id,
        TransactionRecord::new(
            amount,
            TransactionKind::Session,
            format!("Tonight session - {}/{} coins", record.coins_banked, record.coins_started),
        ),
    )?;
    info!(
        "tonight: banked {} coins for {}, balance now {}",
        amount, user_id, balance
    );
    Ok(record)
}
