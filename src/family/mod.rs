//! Parent and kid actions around the spelling game: parent mode, the word list, game
//! settings, the prize store and the nightly session.
//!
//! Every operation is a free function over a [`FamilyStore`](crate::storage::FamilyStore)
//! so the CLI and tests call them the same way.

pub mod errors;
pub mod parent;
pub mod session;
pub mod settings;
pub mod shop;
pub mod words;

pub use errors::FamilyError;
