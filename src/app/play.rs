//! Terminal host for a spelling round.
//!
//! The engine never reads a clock. This loop waits on whichever comes first (a line of
//! input or the next scheduled animation event), then advances the round by the real time
//! that passed and redraws when the picture changed.

use std::io::Write;

use log::info;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{sleep, Duration, Instant};

use crate::spell::{Phase, Round, RoundProgress, Settlement, Slot, TapOutcome, WordAttempt, WordResult};

/// Draw the current word: picture, answer row and numbered tiles.
///
/// Revealed letters are upper case so they stand apart from the child's own. A tile that
/// was just tapped wrongly is wrapped in `>` `<`; used tiles show as `·`.
pub fn render_attempt(attempt: &WordAttempt, index: usize, total: usize) -> String {
    let answer: Vec<String> = attempt
        .slots()
        .into_iter()
        .map(|slot| match slot {
            Slot::Placed(c) => c.to_string(),
            Slot::Revealed(c) => c.to_ascii_uppercase().to_string(),
            Slot::Empty => "_".to_string(),
        })
        .collect();
    let tiles: Vec<String> = attempt
        .tiles()
        .iter()
        .enumerate()
        .map(|(i, tile)| {
            let face = if tile.used { '·' } else { tile.letter };
            if attempt.shaking() == Some(i) {
                format!("{}>{}<", i + 1, face)
            } else {
                format!("{} {} ", i + 1, face)
            }
        })
        .collect();
    let banner = match attempt.phase() {
        Phase::Spelling => "",
        Phase::Success => "  Great spelling!",
        Phase::FailReveal => "  Here's how it goes...",
    };
    format!(
        "Word {}/{}  {}\n  [ {} ]{}\n  {}",
        index + 1,
        total,
        attempt.entry().glyph,
        answer.join(" "),
        banner,
        tiles.join(" ")
    )
}

pub fn render_verdict(result: &WordResult) -> String {
    if result.correct {
        format!("  ✔ {} {}", result.glyph, result.word)
    } else {
        format!("  ✘ {} {}", result.glyph, result.word)
    }
}

/// Apply one line of input: letters tap the first matching tile, numbers tap by position.
///
/// A run of digits is one tile number, so `12` taps tile twelve; separate numbers with a
/// space (`1 2`). Tile `0` and other characters are skipped.
pub fn apply_input(round: &mut Round, line: &str) -> Vec<TapOutcome> {
    let mut outcomes = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if let Some(first) = ch.to_digit(10) {
            let mut number = first as usize;
            while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
                number = number.saturating_mul(10).saturating_add(digit as usize);
                chars.next();
            }
            if number > 0 {
                outcomes.push(round.tap(number - 1));
            }
        } else if ch.is_ascii_alphabetic() {
            outcomes.push(round.tap_letter(ch));
        }
    }
    outcomes
}

fn feedback(outcome: TapOutcome) -> Option<String> {
    match outcome {
        TapOutcome::Missed { incorrect } => Some(format!("  Oops! ({} wrong)", incorrect)),
        _ => None,
    }
}

fn draw(round: &Round) -> String {
    render_attempt(round.current(), round.index(), round.len())
}

/// Play `round` to the end on `input`/`out`.
///
/// Returns the pending settlement, or `None` when input ended while the current word was
/// still waiting for taps. An abandoned round pays nothing.
pub async fn play_round<I, W>(
    round: &mut Round,
    input: I,
    out: &mut W,
    tick_ms: u64,
) -> anyhow::Result<Option<Settlement>>
where
    I: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut input_open = true;
    let mut last = Instant::now();
    let mut screen = draw(round);
    writeln!(out, "{}", screen)?;

    loop {
        let wait = round.until_next();
        if !input_open && wait.is_none() {
            info!("spell: input closed, round abandoned at word {}", round.index() + 1);
            return Ok(None);
        }
        let nap = Duration::from_millis(wait.unwrap_or(tick_ms));

        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line? {
                    Some(text) => {
                        for outcome in apply_input(round, &text) {
                            if let Some(message) = feedback(outcome) {
                                writeln!(out, "{}", message)?;
                            }
                        }
                    }
                    None => input_open = false,
                }
            }
            _ = sleep(nap) => {}
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last).as_millis() as u64;
        last = now;

        match round.advance(elapsed) {
            RoundProgress::Playing => {}
            RoundProgress::NextWord(result) => writeln!(out, "{}", render_verdict(&result))?,
            RoundProgress::Finished(settlement) => {
                if let Some(result) = settlement.outcome().results().last() {
                    writeln!(out, "{}", render_verdict(result))?;
                }
                return Ok(Some(settlement));
            }
        }

        let next = draw(round);
        if next != screen {
            writeln!(out, "{}", next)?;
            screen = next;
        }
    }
}
