use thiserror::Error;

use crate::storage::errors::StoreError;
use crate::validation::{InputError, WordError};

/// Errors raised by parent and kid actions outside the spelling engine.
#[derive(Debug, Error)]
pub enum FamilyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Word(#[from] WordError),

    #[error(transparent)]
    Input(#[from] InputError),

    /// Parent mode has never been set up.
    #[error("no parent PIN has been set")]
    PinNotSet,

    #[error("wrong PIN")]
    WrongPin,

    /// Hashing or parsing a stored PIN hash failed.
    #[error("PIN hash error: {0}")]
    PinHash(String),

    #[error("not enough Quinn Cash: balance {balance}, needed {needed}")]
    InsufficientFunds { balance: i64, needed: i64 },

    #[error("prize is no longer available: {0}")]
    PrizeUnavailable(String),

    #[error("a request for {0} is already waiting for approval")]
    DuplicateRequest(String),

    #[error("request {0} was already decided")]
    RequestNotPending(String),

    #[error("tonight's session was already banked")]
    SessionBanked,

    #[error("all coins were revoked; nothing to bank")]
    NothingToBank,

    #[error("coin {0} does not exist in tonight's session")]
    NoSuchCoin(u8),
}

impl FamilyError {
    /// Lift the store's guarded-deduction refusal into the family error space.
    pub(crate) fn from_store(e: StoreError) -> Self {
        match e {
            StoreError::InsufficientFunds { balance, needed } => {
                FamilyError::InsufficientFunds { balance, needed }
            }
            other => FamilyError::Store(other),
        }
    }
}
