//! Picks the words for one round.

use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;

use super::errors::SpellError;
use crate::storage::types::VocabularyEntry;
use crate::validation::validate_word;

/// Check that `entry` can be played: its word must be 1 to 20 ASCII letters.
///
/// Returns a copy with the word trimmed and lowercased.
pub fn playable_entry(entry: &VocabularyEntry) -> Result<VocabularyEntry, SpellError> {
    let word = validate_word(&entry.word).map_err(|reason| SpellError::InvalidInput {
        word: entry.word.clone(),
        reason,
    })?;
    Ok(VocabularyEntry {
        word,
        ..entry.clone()
    })
}

/// Choose `min(n, active)` distinct active entries in uniformly random order.
///
/// Inactive entries in `vocabulary` are skipped, as are entries whose word cannot be laid
/// out as tiles (see [`playable_entry`]). The shuffle is an in-place Fisher-Yates
/// over the active set, so every call is an independent draw.
pub fn select_round<R: Rng + ?Sized>(
    vocabulary: &[VocabularyEntry],
    n: usize,
    rng: &mut R,
) -> Result<Vec<VocabularyEntry>, SpellError> {
    let mut active: Vec<VocabularyEntry> = vocabulary
        .iter()
        .filter(|entry| entry.active)
        .filter_map(|entry| match playable_entry(entry) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("spell: skipping vocabulary entry {}: {}", entry.id, e);
                None
            }
        })
        .collect();
    if active.is_empty() {
        return Err(SpellError::EmptyVocabulary);
    }
    active.shuffle(rng);
    active.truncate(n);
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::Glyph;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn vocab(words: &[&str]) -> Vec<VocabularyEntry> {
        words
            .iter()
            .map(|w| VocabularyEntry::new(*w, Glyph::Emoji("⭐".into())))
            .collect()
    }

    #[test]
    fn returns_min_of_n_and_active_distinct_entries() {
        let mut rng = StdRng::seed_from_u64(7);
        for size in 1..=9 {
            let all = vocab(&["cat", "dog", "sun", "hat", "bus", "cup", "bed", "red", "big"][..size]);
            let picked = select_round(&all, 5, &mut rng).unwrap();
            assert_eq!(picked.len(), size.min(5));
            let ids: HashSet<_> = picked.iter().map(|e| e.id.clone()).collect();
            assert_eq!(ids.len(), picked.len(), "entries must not repeat");
            assert!(picked.iter().all(|p| all.iter().any(|a| a.id == p.id)));
        }
    }

    #[test]
    fn inactive_entries_are_never_selected() {
        let mut all = vocab(&["cat", "dog", "sun"]);
        all[1].active = false;
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let picked = select_round(&all, 5, &mut rng).unwrap();
            assert_eq!(picked.len(), 2);
            assert!(picked.iter().all(|e| e.word != "dog"));
        }
    }

    #[test]
    fn empty_active_set_is_an_error() {
        let mut all = vocab(&["cat"]);
        all[0].active = false;
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            select_round(&all, 5, &mut rng),
            Err(SpellError::EmptyVocabulary)
        ));
        assert!(matches!(
            select_round(&[], 5, &mut rng),
            Err(SpellError::EmptyVocabulary)
        ));
    }

    #[test]
    fn malformed_words_are_skipped() {
        let all = vocab(&["", "  ", "ice-cream", "no way", "t1ger", "Dog "]);
        let mut rng = StdRng::seed_from_u64(4);
        let picked = select_round(&all, 5, &mut rng).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].word, "dog");
        assert_eq!(picked[0].id, all[5].id);
    }

    #[test]
    fn only_malformed_words_means_empty_vocabulary() {
        let all = vocab(&["", "123", "a b"]);
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            select_round(&all, 5, &mut rng),
            Err(SpellError::EmptyVocabulary)
        ));
    }

    #[test]
    fn playable_entry_reports_the_bad_word() {
        let entry = VocabularyEntry::new("", Glyph::Emoji("⭐".into()));
        match playable_entry(&entry) {
            Err(SpellError::InvalidInput { word, reason }) => {
                assert_eq!(word, "");
                assert_eq!(reason, crate::validation::WordError::Empty);
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
        let long = VocabularyEntry::new("a".repeat(21), Glyph::Emoji("⭐".into()));
        assert!(matches!(
            playable_entry(&long),
            Err(SpellError::InvalidInput { .. })
        ));
    }

    #[test]
    fn every_word_can_lead_a_round() {
        let all = vocab(&["cat", "dog", "sun", "hat", "bus", "cup"]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut leaders = HashSet::new();
        for _ in 0..300 {
            leaders.insert(select_round(&all, 5, &mut rng).unwrap()[0].word.clone());
        }
        assert_eq!(leaders.len(), all.len());
    }
}
