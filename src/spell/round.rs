//! Sequencing the words of one round.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::errors::SpellError;
use super::selection::select_round;
use super::settlement::Settlement;
use super::source::{SettingsSource, VocabularySource};
use super::tiles::{TapOutcome, WordAttempt, WordResult};
use super::WORDS_PER_ROUND;
use crate::storage::types::{RoundSettings, VocabularyEntry};

/// Results of a round, one per word, in play order. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    results: Vec<WordResult>,
}

impl RoundOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: WordResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[WordResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn correct_count(&self) -> usize {
        self.results.iter().filter(|r| r.correct).count()
    }
}

impl FromIterator<WordResult> for RoundOutcome {
    fn from_iter<I: IntoIterator<Item = WordResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

/// Read the stored settings, surfacing failures.
pub fn fetch_round_settings<S: SettingsSource + ?Sized>(
    source: &S,
) -> Result<RoundSettings, SpellError> {
    match source.fetch_settings() {
        Ok(settings) => Ok(settings.unwrap_or_default().normalized()),
        Err(e) => Err(SpellError::ConfigurationLoadFailure(e)),
    }
}

/// Read the stored settings, falling back to defaults when they cannot be loaded.
pub fn load_round_settings<S: SettingsSource + ?Sized>(source: &S) -> RoundSettings {
    fetch_round_settings(source).unwrap_or_else(|e| {
        warn!("spell: {}; using default settings", e);
        RoundSettings::default()
    })
}

/// What happened when time moved forward.
#[derive(Debug)]
pub enum RoundProgress {
    /// The current word is still being played (or revealed).
    Playing,
    /// A word finished and the next one is now up.
    NextWord(WordResult),
    /// The last word finished. The settlement is handed out exactly once.
    Finished(Settlement),
}

/// One play-through of up to [`WORDS_PER_ROUND`] words.
#[derive(Debug)]
pub struct Round {
    words: Vec<VocabularyEntry>,
    settings: RoundSettings,
    bonus: bool,
    index: usize,
    attempt: WordAttempt,
    outcome: RoundOutcome,
    finished: bool,
    rng: StdRng,
}

impl Round {
    /// Start a round: load settings, pick words and present the first one.
    ///
    /// Fails with [`SpellError::EmptyVocabulary`] when nothing is active; no round exists in
    /// that case. Settings that fail to load are replaced by defaults.
    pub fn start<V, S, R>(
        vocabulary: &V,
        settings: &S,
        bonus: bool,
        rng: &mut R,
    ) -> Result<Self, SpellError>
    where
        V: VocabularySource + ?Sized,
        S: SettingsSource + ?Sized,
        R: Rng + ?Sized,
    {
        let settings = load_round_settings(settings);
        let active = vocabulary.fetch_active_vocabulary()?;
        let words = select_round(&active, WORDS_PER_ROUND, rng)?;
        Ok(Self::with_words(words, settings, bonus, StdRng::seed_from_u64(rng.gen())))
    }

    fn with_words(
        words: Vec<VocabularyEntry>,
        settings: RoundSettings,
        bonus: bool,
        mut rng: StdRng,
    ) -> Self {
        info!(
            "spell: starting {}round of {} words (threshold {})",
            if bonus { "bonus " } else { "" },
            words.len(),
            settings.incorrect_threshold
        );
        let attempt = WordAttempt::new(words[0].clone(), settings.incorrect_threshold, &mut rng);
        Self {
            words,
            settings,
            bonus,
            index: 0,
            attempt,
            outcome: RoundOutcome::new(),
            finished: false,
            rng,
        }
    }

    pub fn settings(&self) -> &RoundSettings {
        &self.settings
    }

    pub fn is_bonus(&self) -> bool {
        self.bonus
    }

    pub fn words(&self) -> &[VocabularyEntry] {
        &self.words
    }

    /// Zero-based index of the word being played.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The word currently on screen.
    pub fn current(&self) -> &WordAttempt {
        &self.attempt
    }

    pub fn outcome(&self) -> &RoundOutcome {
        &self.outcome
    }

    /// Tap a tile of the current word.
    pub fn tap(&mut self, position: usize) -> TapOutcome {
        if self.finished {
            return TapOutcome::Ignored;
        }
        self.attempt.tap(position)
    }

    /// Tap the first unused tile showing `letter`. Letters with no tile are ignored.
    pub fn tap_letter(&mut self, letter: char) -> TapOutcome {
        match self.attempt.find_tile(letter) {
            Some(position) => self.tap(position),
            None => TapOutcome::Ignored,
        }
    }

    /// Milliseconds until the current word has something scheduled.
    pub fn until_next(&self) -> Option<u64> {
        if self.finished {
            None
        } else {
            self.attempt.until_next()
        }
    }

    /// Move time forward for the current word and advance the round when it finishes.
    pub fn advance(&mut self, ms: u64) -> RoundProgress {
        if self.finished {
            return RoundProgress::Playing;
        }
        let Some(result) = self.attempt.advance(ms) else {
            return RoundProgress::Playing;
        };
        self.outcome.push(result.clone());

        if self.index + 1 < self.words.len() {
            self.index += 1;
            let entry = self.words[self.index].clone();
            self.attempt = WordAttempt::new(entry, self.settings.incorrect_threshold, &mut self.rng);
            return RoundProgress::NextWord(result);
        }

        self.finished = true;
        info!(
            "spell: round finished, {}/{} correct",
            self.outcome.correct_count(),
            self.outcome.len()
        );
        RoundProgress::Finished(Settlement::new(self.outcome.clone(), self.bonus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::errors::StoreError;
    use crate::storage::types::Glyph;
    use crate::spell::tiles::{Phase, SUCCESS_DELAY_MS};

    struct Vocab(Vec<VocabularyEntry>);

    impl VocabularySource for Vocab {
        fn fetch_active_vocabulary(&self) -> Result<Vec<VocabularyEntry>, StoreError> {
            Ok(self.0.iter().filter(|e| e.active).cloned().collect())
        }
    }

    struct Settings(Option<RoundSettings>);

    impl SettingsSource for Settings {
        fn fetch_settings(&self) -> Result<Option<RoundSettings>, StoreError> {
            Ok(self.0)
        }
    }

    struct BrokenSettings;

    impl SettingsSource for BrokenSettings {
        fn fetch_settings(&self) -> Result<Option<RoundSettings>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    fn vocab(words: &[&str]) -> Vocab {
        Vocab(
            words
                .iter()
                .map(|w| VocabularyEntry::new(*w, Glyph::Emoji("⭐".into())))
                .collect(),
        )
    }

    fn spell_current(round: &mut Round) {
        let word: Vec<char> = round.current().word().chars().collect();
        for letter in word {
            round.tap_letter(letter);
        }
    }

    #[test]
    fn empty_vocabulary_aborts_start() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = Round::start(&vocab(&[]), &Settings(None), false, &mut rng);
        assert!(matches!(result, Err(SpellError::EmptyVocabulary)));
    }

    #[test]
    fn blank_word_never_reaches_the_tiles() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            Round::start(&vocab(&["", "7up"]), &Settings(None), false, &mut rng),
            Err(SpellError::EmptyVocabulary)
        ));

        let mut round = Round::start(&vocab(&["", "go"]), &Settings(None), false, &mut rng).unwrap();
        assert_eq!(round.len(), 1);
        spell_current(&mut round);
        assert_eq!(round.until_next(), Some(SUCCESS_DELAY_MS));
        assert!(matches!(
            round.advance(SUCCESS_DELAY_MS),
            RoundProgress::Finished(_)
        ));
    }

    #[test]
    fn settings_failure_falls_back_to_defaults() {
        let mut rng = StdRng::seed_from_u64(1);
        let round = Round::start(&vocab(&["cat"]), &BrokenSettings, false, &mut rng).unwrap();
        assert_eq!(*round.settings(), RoundSettings::default());
        assert!(matches!(
            fetch_round_settings(&BrokenSettings),
            Err(SpellError::ConfigurationLoadFailure(_))
        ));
    }

    #[test]
    fn stored_threshold_is_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        let stored = Settings(Some(RoundSettings {
            incorrect_threshold: 0,
            daily_cap: 9,
        }));
        let round = Round::start(&vocab(&["cat"]), &stored, false, &mut rng).unwrap();
        assert_eq!(round.settings().incorrect_threshold, 1);
        assert_eq!(round.settings().daily_cap, 9);
    }

    #[test]
    fn round_plays_words_in_sequence_and_finishes_once() {
        let mut rng = StdRng::seed_from_u64(5);
        let words = vocab(&["cat", "dog", "sun", "hat", "bus", "cup", "bed"]);
        let mut round = Round::start(&words, &Settings(None), false, &mut rng).unwrap();
        assert_eq!(round.len(), WORDS_PER_ROUND);

        let mut settlement = None;
        for i in 0..WORDS_PER_ROUND {
            assert_eq!(round.index(), i);
            spell_current(&mut round);
            assert_eq!(round.current().phase(), Phase::Success);
            match round.advance(SUCCESS_DELAY_MS) {
                RoundProgress::NextWord(result) => {
                    assert!(result.correct);
                    assert!(i + 1 < WORDS_PER_ROUND);
                }
                RoundProgress::Finished(s) => {
                    assert_eq!(i + 1, WORDS_PER_ROUND);
                    settlement = Some(s);
                }
                RoundProgress::Playing => panic!("word should have finished"),
            }
        }
        let settlement = settlement.expect("settlement");
        assert_eq!(settlement.earned(), 5);
        assert!(round.is_finished());
        assert!(matches!(round.advance(60_000), RoundProgress::Playing));
        assert_eq!(round.tap_letter('c'), TapOutcome::Ignored);
        assert_eq!(round.outcome().len(), WORDS_PER_ROUND);
    }

    #[test]
    fn fewer_active_words_make_a_shorter_round() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut round = Round::start(&vocab(&["cat", "dog"]), &Settings(None), true, &mut rng)
            .unwrap();
        assert_eq!(round.len(), 2);
        assert!(round.is_bonus());
        spell_current(&mut round);
        assert!(matches!(round.advance(SUCCESS_DELAY_MS), RoundProgress::NextWord(_)));
        let wrong = {
            let attempt = round.current();
            let first = attempt.word().chars().next().unwrap();
            attempt
                .tiles()
                .iter()
                .position(|t| t.letter != first)
                .unwrap()
        };
        round.tap(wrong);
        match round.advance(60_000) {
            RoundProgress::Finished(settlement) => {
                assert!(settlement.is_bonus());
                assert_eq!(settlement.earned(), 1);
                let correct: Vec<bool> = settlement
                    .outcome()
                    .results()
                    .iter()
                    .map(|r| r.correct)
                    .collect();
                assert_eq!(correct, vec![true, false]);
            }
            other => panic!("expected finish, got {:?}", other),
        }
    }
}
