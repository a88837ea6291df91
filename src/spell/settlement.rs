//! Turning a finished round into currency.

use chrono::NaiveDate;
use log::{info, warn};

use super::errors::{SettlementStep, SpellError};
use super::round::RoundOutcome;
use super::source::Bank;
use crate::storage::errors::StoreError;
use crate::storage::types::{RoundSettings, TransactionKind, TransactionRecord};

/// What a settlement wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReport {
    pub earned: u32,
    pub words: usize,
    /// Balance after the credit; `None` when nothing was earned.
    pub balance: Option<i64>,
    /// Today's ledger total after the update; `None` for bonus or zero-earning rounds.
    pub earned_today: Option<u32>,
}

/// A completed round's outcome waiting to be paid out. Pays at most once.
#[derive(Debug)]
pub struct Settlement {
    outcome: RoundOutcome,
    bonus: bool,
    settled: bool,
}

impl Settlement {
    pub fn new(outcome: RoundOutcome, bonus: bool) -> Self {
        Self {
            outcome,
            bonus,
            settled: false,
        }
    }

    pub fn outcome(&self) -> &RoundOutcome {
        &self.outcome
    }

    pub fn is_bonus(&self) -> bool {
        self.bonus
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// One unit of currency per correctly spelled word.
    pub fn earned(&self) -> u32 {
        self.outcome.correct_count() as u32
    }

    /// Pay out the round.
    ///
    /// Credits the balance, logs a transaction and (for non-bonus rounds) bumps today's
    /// earnings ledger, in that order. Returns `Ok(None)` if this settlement already ran.
    /// The settlement counts as done even when a write fails: earlier writes are kept and
    /// the failure is returned for the host to show.
    pub fn settle<B: Bank + ?Sized>(
        &mut self,
        bank: &B,
        user_id: &str,
        day: NaiveDate,
    ) -> Result<Option<SettlementReport>, SpellError> {
        if self.settled {
            return Ok(None);
        }
        self.settled = true;

        let earned = self.earned();
        let words = self.outcome.len();
        if earned == 0 {
            info!("spell: round settled with nothing earned ({} words)", words);
            return Ok(Some(SettlementReport {
                earned,
                words,
                balance: None,
                earned_today: None,
            }));
        }

        let balance = bank
            .credit_balance(user_id, earned as i64)
            .map_err(|source| failure(SettlementStep::CreditBalance, false, source))?;

        let note = format!("Spell it! - {}/{} words correct", earned, words);
        bank.append_transaction(
            user_id,
            TransactionRecord::new(earned as i64, TransactionKind::SpellIt, note),
        )
        .map_err(|source| failure(SettlementStep::AppendTransaction, true, source))?;

        let earned_today = if self.bonus {
            None
        } else {
            Some(
                bank.upsert_earnings(user_id, day, earned)
                    .map_err(|source| failure(SettlementStep::UpsertEarnings, true, source))?,
            )
        };

        info!(
            "spell: credited {} to {} ({}/{} correct, bonus={}), balance now {}",
            earned, user_id, earned, words, self.bonus, balance
        );
        Ok(Some(SettlementReport {
            earned,
            words,
            balance: Some(balance),
            earned_today,
        }))
    }
}

fn failure(step: SettlementStep, credited: bool, source: StoreError) -> SpellError {
    warn!("spell: settlement {} failed: {}", step, source);
    SpellError::SettlementWriteFailure {
        step,
        credited,
        source,
    }
}

/// Today's earnings compared with the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapStatus {
    pub earned: u32,
    pub cap: u32,
}

impl CapStatus {
    pub fn reached(&self) -> bool {
        self.earned >= self.cap
    }

    pub fn remaining(&self) -> u32 {
        self.cap.saturating_sub(self.earned)
    }
}

/// Read today's ledger total for the daily cap check.
pub fn check_daily_cap<B: Bank + ?Sized>(
    bank: &B,
    user_id: &str,
    day: NaiveDate,
    cap: u32,
) -> Result<CapStatus, SpellError> {
    let earned = bank.earnings_for(user_id, day)?;
    Ok(CapStatus { earned, cap })
}

/// Refuse a new non-bonus round once today's earnings reached the cap. Bonus rounds always
/// pass. This is a read-then-compare; two rounds started together can both get through.
pub fn gate_round_start<B: Bank + ?Sized>(
    bank: &B,
    user_id: &str,
    day: NaiveDate,
    settings: &RoundSettings,
    bonus: bool,
) -> Result<CapStatus, SpellError> {
    let status = check_daily_cap(bank, user_id, day, settings.daily_cap)?;
    if !bonus && status.reached() {
        return Err(SpellError::DailyCapReached {
            earned: status.earned,
            cap: status.cap,
        });
    }
    Ok(status)
}
