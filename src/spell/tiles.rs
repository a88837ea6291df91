//! Per-word letter-tile state machine.
//!
//! A [`WordAttempt`] owns one word's interactive spelling attempt. The child taps shuffled
//! letter tiles; correct taps build the word left to right, wrong taps count against the
//! round's incorrect threshold. The attempt ends in exactly one terminal [`WordResult`]:
//!
//! ```text
//!            correct tap, word complete          SUCCESS_DELAY_MS
//! Spelling ─────────────────────────────▶ Success ───────────────▶ result(correct)
//!    │
//!    │ incorrect == threshold
//!    ▼                 reveal one letter every REVEAL_INTERVAL_MS,
//! FailReveal ───────── then wait REVEAL_SETTLE_MS ──────────────▶ result(incorrect)
//! ```
//!
//! All delays run on the attempt's own [`Timeline`]; call [`WordAttempt::advance`] to move
//! time forward.

use std::collections::BTreeSet;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::timer::Timeline;
use crate::storage::types::{Glyph, VocabularyEntry};

/// Pause after the last correct letter so the success animation can play.
pub const SUCCESS_DELAY_MS: u64 = 1400;
/// How long a wrongly tapped tile shakes.
pub const SHAKE_MS: u64 = 500;
/// Gap between revealed letters after a failed attempt.
pub const REVEAL_INTERVAL_MS: u64 = 550;
/// Pause after the final reveal before the attempt reports its result.
pub const REVEAL_SETTLE_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Spelling,
    Success,
    FailReveal,
}

/// One tappable letter. `source` is the letter's index in the target word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub letter: char,
    pub source: usize,
    pub used: bool,
}

/// What the answer row shows at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Placed(char),
    Revealed(char),
    Empty,
}

/// What a tap did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Not spelling any more, tile already used, or no such tile.
    Ignored,
    /// Correct letter placed; more to go.
    Placed,
    /// Correct letter placed and the word is complete.
    Completed,
    /// Wrong letter; still spelling.
    Missed { incorrect: u32 },
    /// Wrong letter that reached the threshold; the answer is being revealed.
    Revealing { incorrect: u32 },
}

/// Terminal verdict for one word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordResult {
    pub word: String,
    pub glyph: Glyph,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileEvent {
    ClearShake(usize),
    Reveal(usize),
    Finish { correct: bool },
}

/// State for spelling one word.
#[derive(Debug)]
pub struct WordAttempt {
    entry: VocabularyEntry,
    target: Vec<char>,
    tiles: Vec<Tile>,
    placed: Vec<char>,
    incorrect: u32,
    threshold: u32,
    phase: Phase,
    shaking: Option<usize>,
    revealed: BTreeSet<usize>,
    emitted: bool,
    timeline: Timeline<TileEvent>,
}

impl WordAttempt {
    /// Start an attempt with the word's letters shuffled into tile order. The order stays
    /// fixed for the life of the attempt. The word must have at least one letter; rounds
    /// only pass entries checked by [`playable_entry`](super::selection::playable_entry).
    pub fn new<R: Rng + ?Sized>(entry: VocabularyEntry, threshold: u32, rng: &mut R) -> Self {
        let target: Vec<char> = entry.word.to_lowercase().chars().collect();
        let mut tiles: Vec<Tile> = target
            .iter()
            .enumerate()
            .map(|(source, &letter)| Tile {
                letter,
                source,
                used: false,
            })
            .collect();
        tiles.shuffle(rng);
        Self {
            entry,
            target,
            tiles,
            placed: Vec::new(),
            incorrect: 0,
            threshold: threshold.max(1),
            phase: Phase::Spelling,
            shaking: None,
            revealed: BTreeSet::new(),
            emitted: false,
            timeline: Timeline::new(),
        }
    }

    pub fn entry(&self) -> &VocabularyEntry {
        &self.entry
    }

    pub fn word(&self) -> &str {
        &self.entry.word
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Letters placed so far; always a prefix of the word.
    pub fn placed(&self) -> &[char] {
        &self.placed
    }

    pub fn incorrect_count(&self) -> u32 {
        self.incorrect
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Tile position currently shaking, if any.
    pub fn shaking(&self) -> Option<usize> {
        self.shaking
    }

    /// Word indices revealed so far during [`Phase::FailReveal`].
    pub fn revealed(&self) -> &BTreeSet<usize> {
        &self.revealed
    }

    /// True once the terminal result has been handed out.
    pub fn is_finished(&self) -> bool {
        self.emitted
    }

    /// Milliseconds until something scheduled happens, if anything is pending.
    pub fn until_next(&self) -> Option<u64> {
        self.timeline.until_next()
    }

    /// First unused tile showing `letter`.
    pub fn find_tile(&self, letter: char) -> Option<usize> {
        let letter = letter.to_ascii_lowercase();
        self.tiles
            .iter()
            .position(|tile| !tile.used && tile.letter == letter)
    }

    /// The answer row as the child sees it.
    pub fn slots(&self) -> Vec<Slot> {
        self.target
            .iter()
            .enumerate()
            .map(|(i, &letter)| {
                if let Some(&c) = self.placed.get(i) {
                    Slot::Placed(c)
                } else if self.revealed.contains(&i) {
                    Slot::Revealed(letter)
                } else {
                    Slot::Empty
                }
            })
            .collect()
    }

    /// Tap the tile at display `position`.
    pub fn tap(&mut self, position: usize) -> TapOutcome {
        if self.phase != Phase::Spelling {
            return TapOutcome::Ignored;
        }
        let Some(tile) = self.tiles.get(position) else {
            return TapOutcome::Ignored;
        };
        if tile.used {
            return TapOutcome::Ignored;
        }
        let letter = tile.letter;
        let expected = self.target[self.placed.len()];

        if letter == expected {
            self.tiles[position].used = true;
            self.placed.push(letter);
            if self.placed.len() == self.target.len() {
                self.phase = Phase::Success;
                self.timeline
                    .schedule(SUCCESS_DELAY_MS, TileEvent::Finish { correct: true });
                debug!("spell: '{}' completed", self.entry.word);
                return TapOutcome::Completed;
            }
            return TapOutcome::Placed;
        }

        self.incorrect += 1;
        self.shaking = Some(position);
        self.timeline
            .schedule(SHAKE_MS, TileEvent::ClearShake(position));
        if self.incorrect >= self.threshold {
            self.begin_reveal();
            return TapOutcome::Revealing {
                incorrect: self.incorrect,
            };
        }
        TapOutcome::Missed {
            incorrect: self.incorrect,
        }
    }

    fn begin_reveal(&mut self) {
        self.phase = Phase::FailReveal;
        let start = self.placed.len();
        let remaining = self.target.len() - start;
        for step in 0..remaining {
            self.timeline.schedule(
                step as u64 * REVEAL_INTERVAL_MS,
                TileEvent::Reveal(start + step),
            );
        }
        self.timeline.schedule(
            remaining as u64 * REVEAL_INTERVAL_MS + REVEAL_SETTLE_MS,
            TileEvent::Finish { correct: false },
        );
        debug!(
            "spell: '{}' failed after {} incorrect taps, revealing {} letters",
            self.entry.word, self.incorrect, remaining
        );
    }

    /// Move time forward by `ms`. Returns the terminal result the first time it comes due
    /// and `None` ever after.
    pub fn advance(&mut self, ms: u64) -> Option<WordResult> {
        let deadline = self.timeline.now_ms().saturating_add(ms);
        let mut result = None;
        while let Some(event) = self.timeline.pop_due(deadline) {
            match event {
                TileEvent::ClearShake(position) => {
                    if self.shaking == Some(position) {
                        self.shaking = None;
                    }
                }
                TileEvent::Reveal(index) => {
                    self.revealed.insert(index);
                }
                TileEvent::Finish { correct } => {
                    if !self.emitted {
                        self.emitted = true;
                        result = Some(WordResult {
                            word: self.entry.word.clone(),
                            glyph: self.entry.glyph.clone(),
                            correct,
                        });
                    }
                }
            }
        }
        self.timeline.settle_at(deadline);
        result
    }
}
