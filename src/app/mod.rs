//! Glue between the configuration, the family store and the spelling engine.
//!
//! The CLI owns one [`App`] per invocation. It opens the store, answers `status`, and runs
//! the start and settle halves of a spelling round around the terminal loop in [`play`].

pub mod play;

use chrono::{Local, NaiveDate};
use log::{info, warn};
use rand::Rng;
use serde::Serialize;

use crate::config::Config;
use crate::family::{session, settings as family_settings, shop, FamilyError};
use crate::spell::{
    gate_round_start, load_round_settings, CapStatus, Round, Settlement, SettlementReport,
    SpellError,
};
use crate::storage::errors::StoreError;
use crate::storage::types::BonusTrigger;
use crate::storage::{FamilyStore, FamilyStoreBuilder};

/// Snapshot printed by `quinncash status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Status {
    pub child_name: String,
    pub balance: i64,
    pub earned_today: u32,
    pub daily_cap: u32,
    pub bonus_pending: bool,
    pub pending_requests: usize,
    pub tonight_remaining: u8,
    pub tonight_banked: bool,
}

/// A round ready to play, with today's cap status at start.
pub struct StartedRound {
    pub round: Round,
    pub cap: CapStatus,
}

pub struct App {
    config: Config,
    store: FamilyStore,
}

impl App {
    /// Open the store named by the config, seeding starter words if asked to.
    pub fn open(config: Config) -> Result<Self, StoreError> {
        let mut builder = FamilyStoreBuilder::new(config.storage.db_path());
        if config.game.seed_starter_words {
            builder = builder.with_starter_words(crate::family::words::starter_entries());
        }
        let store = builder.open()?;
        Ok(Self { config, store })
    }

    pub fn with_store(config: Config, store: FamilyStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &FamilyStore {
        &self.store
    }

    pub fn user_id(&self) -> &str {
        &self.config.family.user_id
    }

    /// Calendar day used for the ledger and tonight's session.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn status(&self) -> Result<Status, FamilyError> {
        self.status_on(self.today())
    }

    pub fn status_on(&self, day: NaiveDate) -> Result<Status, FamilyError> {
        let user = self.user_id();
        let settings = family_settings::get_settings(&self.store)?;
        let earned_today = self
            .store
            .get_earnings(user, day)?
            .map(|e| e.total_earned)
            .unwrap_or(0);
        let tonight = session::tonight(&self.store, user, day)?;
        Ok(Status {
            child_name: self.config.family.child_name.clone(),
            balance: self.store.balance(user)?,
            earned_today,
            daily_cap: settings.daily_cap,
            bonus_pending: self.store.bonus_pending()?,
            pending_requests: shop::pending_requests(&self.store)?.len(),
            tonight_remaining: tonight.remaining(),
            tonight_banked: tonight.banked,
        })
    }

    /// Start a spelling round for today. See [`App::start_spelling_on`].
    pub fn start_spelling<R: Rng + ?Sized>(
        &self,
        force_bonus: bool,
        rng: &mut R,
    ) -> Result<StartedRound, SpellError> {
        self.start_spelling_on(self.today(), force_bonus, rng)
    }

    /// Start a round on `day`.
    ///
    /// A pending bonus trigger is consumed here and turns the round into a bonus round.
    /// Non-bonus rounds are refused once today's earnings reached the cap. If the round
    /// cannot start after the trigger was taken, the trigger is put back.
    pub fn start_spelling_on<R: Rng + ?Sized>(
        &self,
        day: NaiveDate,
        force_bonus: bool,
        rng: &mut R,
    ) -> Result<StartedRound, SpellError> {
        let triggered = self.store.take_bonus_trigger()?;
        let bonus = force_bonus || triggered.is_some();

        let started = self.try_start(day, bonus, rng);
        if started.is_err() {
            if let Some(trigger) = triggered {
                self.restore_trigger(&trigger);
            }
        }
        started
    }

    fn try_start<R: Rng + ?Sized>(
        &self,
        day: NaiveDate,
        bonus: bool,
        rng: &mut R,
    ) -> Result<StartedRound, SpellError> {
        let settings = load_round_settings(&self.store);
        let cap = gate_round_start(&self.store, self.user_id(), day, &settings, bonus)?;
        let round = Round::start(&self.store, &self.store, bonus, rng)?;
        Ok(StartedRound { round, cap })
    }

    fn restore_trigger(&self, trigger: &BonusTrigger) {
        match self.store.set_bonus_trigger(trigger) {
            Ok(()) => info!("bonus trigger kept for the next round"),
            Err(e) => warn!("could not restore bonus trigger: {}", e),
        }
    }

    /// Pay out a finished round for today.
    pub fn settle(
        &self,
        settlement: &mut Settlement,
    ) -> Result<Option<SettlementReport>, SpellError> {
        settlement.settle(&self.store, self.user_id(), self.today())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn app(seed_words: bool) -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = dir.path().to_string_lossy().into_owned();
        config.game.seed_starter_words = seed_words;
        let app = App::open(config).unwrap();
        (dir, app)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    #[test]
    fn fresh_status() {
        let (_dir, app) = app(true);
        let status = app.status_on(day()).unwrap();
        assert_eq!(status.balance, 0);
        assert_eq!(status.earned_today, 0);
        assert_eq!(status.daily_cap, 5);
        assert_eq!(status.tonight_remaining, 3);
        assert!(!status.bonus_pending);
        assert_eq!(app.store().list_vocabulary().unwrap().len(), 10);
    }

    #[test]
    fn bonus_trigger_is_consumed_by_start() {
        let (_dir, app) = app(true);
        family_settings::launch_bonus(app.store()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let started = app.start_spelling_on(day(), false, &mut rng).unwrap();
        assert!(started.round.is_bonus());
        let next = app.start_spelling_on(day(), false, &mut rng).unwrap();
        assert!(!next.round.is_bonus());
    }

    #[test]
    fn failed_start_keeps_the_trigger() {
        let (_dir, app) = app(false);
        family_settings::launch_bonus(app.store()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            app.start_spelling_on(day(), false, &mut rng),
            Err(SpellError::EmptyVocabulary)
        ));
        assert!(app.store().bonus_pending().unwrap());
    }
}
