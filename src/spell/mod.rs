//! "Spell it!" round engine.
//!
//! A round picks up to [`WORDS_PER_ROUND`] active words ([`selection`]), runs a letter-tile
//! attempt for each ([`tiles`]), collects the per-word verdicts ([`round`]) and finally pays
//! one unit of currency per correct word ([`settlement`]).
//!
//! Everything here is synchronous and deterministic: time only moves when the host calls
//! `advance`, randomness comes from a caller-supplied RNG, and data access goes through the
//! traits in [`source`].
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use quinncash::spell::{Round, RoundProgress};
//! use quinncash::storage::FamilyStore;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = FamilyStore::open("./data/family")?;
//! let mut round = Round::start(&store, &store, false, &mut rand::thread_rng())?;
//! round.tap_letter('c');
//! if let RoundProgress::Finished(mut settlement) = round.advance(1_400) {
//!     settlement.settle(&store, "quinn", Utc::now().date_naive())?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod round;
pub mod selection;
pub mod settlement;
pub mod source;
pub mod tiles;
pub mod timer;

/// Number of words drawn for each round.
pub const WORDS_PER_ROUND: usize = 5;

pub use errors::{SettlementStep, SpellError};
pub use round::{load_round_settings, Round, RoundOutcome, RoundProgress};
pub use selection::{playable_entry, select_round};
pub use settlement::{check_daily_cap, gate_round_start, CapStatus, Settlement, SettlementReport};
pub use source::{Bank, SettingsSource, VocabularySource};
pub use tiles::{Phase, Slot, TapOutcome, Tile, WordAttempt, WordResult};
pub use timer::{Timeline, TimerId};
