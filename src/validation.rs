//! Input validation for parent-entered data: vocabulary words, PINs, prize names, amounts
//! and free-text notes.

/// Longest word the spelling game accepts.
pub const MAX_WORD_LEN: usize = 20;
/// Longest prize name kept.
pub const MAX_PRIZE_NAME_LEN: usize = 60;
/// Longest transaction note kept; longer notes are cut.
pub const MAX_NOTE_LEN: usize = 120;
/// Digits in a parent PIN.
pub const PIN_DIGITS: usize = 4;

/// Vocabulary word validation errors with helpful messages
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WordError {
    #[error("Word is empty")]
    Empty,

    #[error("Word is too long (maximum {max} letters)")]
    TooLong { max: usize },

    #[error("Word may only contain the letters a-z (found: {chars})")]
    InvalidCharacters { chars: String },

    #[error("A picture or emoji is required")]
    MissingGlyph,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("PIN must be exactly 4 digits")]
    InvalidPin,

    #[error("Amount must be a whole number greater than zero")]
    InvalidAmount,

    #[error("Prize name is empty")]
    EmptyName,

    #[error("Prize name is too long (maximum {max} characters)")]
    NameTooLong { max: usize },
}

/// Normalize and validate a vocabulary word: trimmed, lowercased, ASCII letters only.
pub fn validate_word(word: &str) -> Result<String, WordError> {
    let cleaned = word.trim().to_lowercase();
    if cleaned.is_empty() {
        return Err(WordError::Empty);
    }
    if cleaned.chars().count() > MAX_WORD_LEN {
        return Err(WordError::TooLong { max: MAX_WORD_LEN });
    }
    let invalid: Vec<String> = cleaned
        .chars()
        .filter(|c| !c.is_ascii_lowercase())
        .map(|c| format!("{:?}", c))
        .collect();
    if !invalid.is_empty() {
        return Err(WordError::InvalidCharacters {
            chars: invalid.join(", "),
        });
    }
    Ok(cleaned)
}

/// Emoji or picture reference shown for a word; must not be blank.
pub fn validate_glyph(glyph: &str) -> Result<String, WordError> {
    let trimmed = glyph.trim();
    if trimmed.is_empty() {
        return Err(WordError::MissingGlyph);
    }
    Ok(trimmed.to_string())
}

pub fn validate_pin(pin: &str) -> Result<(), InputError> {
    if pin.len() == PIN_DIGITS && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(InputError::InvalidPin)
    }
}

/// Parse a strictly positive amount of currency.
pub fn parse_amount(input: &str) -> Result<u32, InputError> {
    match input.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(InputError::InvalidAmount),
    }
}

pub fn validate_prize_name(name: &str) -> Result<String, InputError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyName);
    }
    if trimmed.chars().count() > MAX_PRIZE_NAME_LEN {
        return Err(InputError::NameTooLong {
            max: MAX_PRIZE_NAME_LEN,
        });
    }
    Ok(trimmed.to_string())
}

/// Clean a free-text note: control characters become spaces, whitespace is trimmed and the
/// result is cut to [`MAX_NOTE_LEN`] characters. Empty input yields `None`.
pub fn sanitize_note(note: &str) -> Option<String> {
    let cleaned: String = note
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_NOTE_LEN).collect())
}
