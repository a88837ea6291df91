use thiserror::Error;

use crate::storage::errors::StoreError;
use crate::validation::WordError;

/// Which settlement write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStep {
    CreditBalance,
    AppendTransaction,
    UpsertEarnings,
}

impl std::fmt::Display for SettlementStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let step = match self {
            SettlementStep::CreditBalance => "balance credit",
            SettlementStep::AppendTransaction => "transaction log append",
            SettlementStep::UpsertEarnings => "earnings ledger update",
        };
        f.write_str(step)
    }
}

/// Errors raised by the spelling round engine.
#[derive(Debug, Error)]
pub enum SpellError {
    /// No active vocabulary entries exist; the round never starts.
    #[error("no active words to play")]
    EmptyVocabulary,

    /// A vocabulary entry cannot be laid out as letter tiles. Round selection skips such
    /// entries rather than failing the round.
    #[error("cannot play word {word:?}: {reason}")]
    InvalidInput {
        word: String,
        #[source]
        reason: WordError,
    },

    /// Today's non-bonus earnings already reached the configured cap.
    #[error("daily cap reached: earned {earned} of {cap} today")]
    DailyCapReached { earned: u32, cap: u32 },

    /// A settlement write failed. Earlier steps are not rolled back; `credited` tells
    /// whether the balance had already been credited.
    #[error("could not save results ({step} failed, balance credited: {credited}): {source}")]
    SettlementWriteFailure {
        step: SettlementStep,
        credited: bool,
        #[source]
        source: StoreError,
    },

    /// Round configuration could not be read. Round start recovers with defaults.
    #[error("round configuration unavailable: {0}")]
    ConfigurationLoadFailure(#[source] StoreError),

    /// Any other store failure (e.g. reading the vocabulary).
    #[error(transparent)]
    Store(#[from] StoreError),
}
