//! # Quinn Cash - family rewards with a spelling mini-game
//!
//! Quinn Cash keeps a child's balance of family currency. Parents grant and deduct it,
//! the child spends it on prizes (with parent approval) and earns more by playing
//! "Spell it!": five picture words per round, one unit per word spelled right, up to a
//! daily cap.
//!
//! ## Features
//!
//! - **Spell it!**: letter-tile spelling rounds with a deterministic timing model, so the
//!   whole game runs under test without a clock.
//! - **Atomic balance**: every balance change is a compare-and-swap increment in sled.
//! - **Prize store**: one-off items and repeatable experiences, request and approve flow,
//!   trophy case.
//! - **Parent mode**: Argon2id-hashed PIN, manual grants and deductions with notes, word list
//!   and settings management, bonus rounds that skip the daily cap.
//! - **Tonight session**: three coins a night that can be revoked before banking.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quinncash::app::App;
//! use quinncash::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let app = App::open(config)?;
//!     let status = app.status()?;
//!     println!("{} has {} Quinn Cash", status.child_name, status.balance);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`spell`] - the spelling round engine (selection, tiles, round controller, settlement)
//! - [`storage`] - sled-backed family store
//! - [`family`] - parent and kid actions: PIN, words, settings, shop, tonight session
//! - [`app`] - wiring plus the terminal game loop
//! - [`config`] - TOML configuration
//! - [`validation`] - input checks for words, PINs, amounts and notes
//! - [`logutil`] - safe logging of user-entered text
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / app      │ ← commands, terminal loop
//! └─────────────────┘
//!     │         │
//! ┌────────┐ ┌────────┐
//! │ spell  │ │ family │ ← game engine / parent + kid actions
//! └────────┘ └────────┘
//!     │         │
//! ┌─────────────────┐
//! │   storage       │ ← sled trees
//! └─────────────────┘
//! ```

pub mod app;
pub mod config;
pub mod family;
pub mod logutil;
pub mod spell;
pub mod storage;
pub mod validation;
