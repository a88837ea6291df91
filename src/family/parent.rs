//! Parent mode: PIN management and manual balance changes.

use argon2::Argon2;
use log::{info, warn};
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use super::errors::FamilyError;
use crate::logutil::escape_log;
use crate::storage::types::{TransactionKind, TransactionRecord};
use crate::storage::FamilyStore;
use crate::validation::{sanitize_note, validate_pin};

/// Hash and store a new parent PIN.
pub fn set_pin(
    store: &FamilyStore,
    user_id: &str,
    pin: &str,
    argon: &Argon2<'_>,
) -> Result<(), FamilyError> {
    validate_pin(pin)?;
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = argon
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| FamilyError::PinHash(e.to_string()))?
        .to_string();
    store.set_pin_hash(user_id, hash)?;
    info!(target: "security", "parent PIN updated for {}", user_id);
    Ok(())
}

pub fn has_pin(store: &FamilyStore, user_id: &str) -> Result<bool, FamilyError> {
    Ok(store.get_or_create_user(user_id)?.pin_hash.is_some())
}

/// Check `pin` against the stored hash. `Ok(())` unlocks parent mode.
pub fn verify_pin(
    store: &FamilyStore,
    user_id: &str,
    pin: &str,
    argon: &Argon2<'_>,
) -> Result<(), FamilyError> {
    let user = store.get_or_create_user(user_id)?;
    let Some(stored) = user.pin_hash else {
        return Err(FamilyError::PinNotSet);
    };
    let parsed = PasswordHash::new(&stored)
        .map_err(|e| FamilyError::PinHash(format!("corrupt PIN hash: {e}")))?;
    if argon.verify_password(pin.as_bytes(), &parsed).is_ok() {
        Ok(())
    } else {
        warn!(target: "security", "wrong parent PIN entered for {}", user_id);
        Err(FamilyError::WrongPin)
    }
}

/// Add currency. Returns the new balance.
pub fn grant(
    store: &FamilyStore,
    user_id: &str,
    amount: u32,
    note: &str,
) -> Result<i64, FamilyError> {
    adjust(store, user_id, amount as i64, note, "Manual grant", false)
}

/// Remove currency. Refuses to go below zero unless `allow_negative`.
pub fn deduct(
    store: &FamilyStore,
    user_id: &str,
    amount: u32,
    note: &str,
    allow_negative: bool,
) -> Result<i64, FamilyError> {
    adjust(
        store,
        user_id,
        -(amount as i64),
        note,
        "Manual deduction",
        allow_negative,
    )
}

fn adjust(
    store: &FamilyStore,
    user_id: &str,
    delta: i64,
    note: &str,
    default_note: &str,
    allow_negative: bool,
) -> Result<i64, FamilyError> {
    if delta == 0 {
        return Err(crate::validation::InputError::InvalidAmount.into());
    }
    let note = sanitize_note(note).unwrap_or_else(|| default_note.to_string());
    let balance = store
        .adjust_balance(user_id, delta, allow_negative)
        .map_err(FamilyError::from_store)?;
    store.put_transaction(
        user_id,
        TransactionRecord::new(delta, TransactionKind::Manual, note.clone()),
    )?;
    info!(
        "parent: {:+} for {} ({}), balance now {}",
        delta,
        user_id,
        escape_log(&note),
        balance
    );
    Ok(balance)
}

/// Most recent transactions, newest first.
pub fn history(
    store: &FamilyStore,
    user_id: &str,
    limit: usize,
) -> Result<Vec<TransactionRecord>, FamilyError> {
    Ok(store.list_transactions(user_id, limit)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{Algorithm, Params, Version};
    use tempfile::TempDir;

    fn fast_argon() -> Argon2<'static> {
        Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(256, 1, 1, None).unwrap(),
        )
    }

    #[test]
    fn pin_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FamilyStore::open(dir.path()).unwrap();
        let argon = fast_argon();
        assert!(matches!(
            verify_pin(&store, "quinn", "1234", &argon),
            Err(FamilyError::PinNotSet)
        ));
        assert!(set_pin(&store, "quinn", "12", &argon).is_err());
        set_pin(&store, "quinn", "4321", &argon).unwrap();
        assert!(has_pin(&store, "quinn").unwrap());
        assert!(verify_pin(&store, "quinn", "4321", &argon).is_ok());
        assert!(matches!(
            verify_pin(&store, "quinn", "1234", &argon),
            Err(FamilyError::WrongPin)
        ));
    }

    #[test]
    fn grants_and_deductions_are_logged() {
        let dir = TempDir::new().unwrap();
        let store = FamilyStore::open(dir.path()).unwrap();
        assert_eq!(grant(&store, "quinn", 5, "Helped with dinner").unwrap(), 5);
        assert_eq!(deduct(&store, "quinn", 2, "", false).unwrap(), 3);
        assert!(matches!(
            deduct(&store, "quinn", 10, "", false),
            Err(FamilyError::InsufficientFunds { balance: 3, needed: 10 })
        ));

        let log = history(&store, "quinn", 10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].amount, -2);
        assert_eq!(log[0].note, "Manual deduction");
        assert_eq!(log[1].note, "Helped with dinner");
        assert!(log.iter().all(|t| t.kind == TransactionKind::Manual));
    }
}
