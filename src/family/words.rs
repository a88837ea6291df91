//! Vocabulary manager: the parent's list of spelling words.

use log::info;

use super::errors::FamilyError;
use crate::logutil::escape_log;
use crate::storage::types::{Glyph, VocabularyEntry};
use crate::storage::FamilyStore;
use crate::validation::{validate_glyph, validate_word};

/// Words seeded into an empty vocabulary, with their emoji.
pub const STARTER_WORDS: &[(&str, &str)] = &[
    ("cat", "🐱"),
    ("dog", "🐶"),
    ("sun", "🌞"),
    ("hat", "🎩"),
    ("bus", "🚌"),
    ("cup", "🥤"),
    ("bed", "🛏"),
    ("red", "🟥"),
    ("big", "🐘"),
    ("run", "🏃"),
];

pub fn starter_entries() -> Vec<VocabularyEntry> {
    STARTER_WORDS
        .iter()
        .map(|(word, emoji)| VocabularyEntry::new(*word, Glyph::Emoji((*emoji).to_string())))
        .collect()
}

/// Seed the starter words when the vocabulary is empty. Returns how many were added.
pub fn seed_starter_words(store: &FamilyStore) -> Result<usize, FamilyError> {
    let added = store.seed_vocabulary_if_empty(starter_entries())?;
    if added > 0 {
        info!("seeded {} starter words", added);
    }
    Ok(added)
}

/// Add a word with an emoji. Picture references go through [`add_word_with_glyph`].
pub fn add_word(store: &FamilyStore, word: &str, emoji: &str) -> Result<VocabularyEntry, FamilyError> {
    let glyph = Glyph::Emoji(validate_glyph(emoji)?);
    add_word_with_glyph(store, word, glyph)
}

pub fn add_word_with_glyph(
    store: &FamilyStore,
    word: &str,
    glyph: Glyph,
) -> Result<VocabularyEntry, FamilyError> {
    let word = validate_word(word)?;
    let glyph = match glyph {
        Glyph::Emoji(e) => Glyph::Emoji(validate_glyph(&e)?),
        Glyph::Image(r) => Glyph::Image(validate_glyph(&r)?),
    };
    let entry = VocabularyEntry::new(word, glyph);
    store.put_vocabulary(&entry)?;
    info!("vocabulary: added {}", escape_log(&entry.word));
    Ok(entry)
}

/// Flip a word between active and inactive. Returns the updated entry.
pub fn toggle_word(store: &FamilyStore, id: &str) -> Result<VocabularyEntry, FamilyError> {
    let mut entry = store.get_vocabulary(id)?;
    entry.active = !entry.active;
    store.put_vocabulary(&entry)?;
    info!(
        "vocabulary: {} is now {}",
        escape_log(&entry.word),
        if entry.active { "active" } else { "inactive" }
    );
    Ok(entry)
}

pub fn delete_word(store: &FamilyStore, id: &str) -> Result<bool, FamilyError> {
    Ok(store.delete_vocabulary(id)?)
}

pub fn list_words(store: &FamilyStore) -> Result<Vec<VocabularyEntry>, FamilyError> {
    Ok(store.list_vocabulary()?)
}

/// Look a word up by id or, failing that, by its spelling.
pub fn find_word(store: &FamilyStore, key: &str) -> Result<Option<VocabularyEntry>, FamilyError> {
    let needle = key.trim().to_lowercase();
    Ok(store
        .list_vocabulary()?
        .into_iter()
        .find(|e| e.id == key || e.word == needle))
}
