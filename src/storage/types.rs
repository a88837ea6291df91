use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USER_SCHEMA_VERSION: u8 = 1;
pub const TRANSACTION_SCHEMA_VERSION: u8 = 1;

/// Default number of incorrect taps before a word's answer is revealed.
pub const DEFAULT_INCORRECT_THRESHOLD: u32 = 1;
/// Default maximum currency a child may earn per day from non-bonus rounds.
pub const DEFAULT_DAILY_CAP: u32 = 5;

/// What a word is shown as: an emoji or a reference to a stored picture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Glyph {
    Emoji(String),
    Image(String),
}

impl std::fmt::Display for Glyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Glyph::Emoji(e) => write!(f, "{}", e),
            Glyph::Image(reference) => write!(f, "[picture: {}]", reference),
        }
    }
}

/// One word the child may be asked to spell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub id: String,
    /// Lowercase ASCII letters only.
    pub word: String,
    pub glyph: Glyph,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl VocabularyEntry {
    pub fn new(word: impl Into<String>, glyph: Glyph) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            word: word.into(),
            glyph,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// Process-wide spelling game configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundSettings {
    pub incorrect_threshold: u32,
    pub daily_cap: u32,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            incorrect_threshold: DEFAULT_INCORRECT_THRESHOLD,
            daily_cap: DEFAULT_DAILY_CAP,
        }
    }
}

impl RoundSettings {
    /// Clamp values into their valid ranges (threshold is at least one).
    pub fn normalized(mut self) -> Self {
        self.incorrect_threshold = self.incorrect_threshold.max(1);
        self
    }
}

/// Child account: balance and the hashed parent PIN guarding parent mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
    pub balance: i64,
    pub pin_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl UserRecord {
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            balance: 0,
            pin_hash: None,
            created_at: now,
            updated_at: now,
            schema_version: USER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Parent grant or deduction.
    Manual,
    /// Approved prize purchase.
    Purchase,
    /// Spelling game reward.
    SpellIt,
    /// Coins banked from the nightly session.
    Session,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TransactionKind::Manual => "manual",
            TransactionKind::Purchase => "purchase",
            TransactionKind::SpellIt => "spellit",
            TransactionKind::Session => "session",
        };
        f.write_str(label)
    }
}

/// Entry in a user's transaction log. `amount` is signed: credits are positive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: String,
    pub amount: i64,
    pub kind: TransactionKind,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl TransactionRecord {
    pub fn new(amount: i64, kind: TransactionKind, note: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            amount,
            kind,
            note: note.into(),
            created_at: Utc::now(),
            schema_version: TRANSACTION_SCHEMA_VERSION,
        }
    }
}

/// Per-user, per-day total earned from non-bonus spelling rounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EarningsEntry {
    pub day: NaiveDate,
    pub total_earned: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrizeKind {
    /// One-off: goes unavailable once purchased.
    Item,
    /// Repeatable: can be earned more than once.
    Experience,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prize {
    pub id: String,
    pub name: String,
    pub price: u32,
    pub kind: PrizeKind,
    pub glyph: Glyph,
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

impl Prize {
    pub fn new(name: impl Into<String>, price: u32, kind: PrizeKind, glyph: Glyph) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            price,
            kind,
            glyph,
            available: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
}

/// A child's request to buy a prize, awaiting a parent decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub id: String,
    pub prize_id: String,
    pub prize_name: String,
    pub prize_price: u32,
    pub prize_kind: PrizeKind,
    pub user_id: String,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Trophy case entry written when a purchase is approved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseHistoryEntry {
    pub id: String,
    pub prize_id: String,
    pub prize_name: String,
    pub glyph: Glyph,
    pub price: u32,
    pub user_id: String,
    pub purchased_at: DateTime<Utc>,
}

/// Coins available in one evening's session.
pub const SESSION_COINS: u8 = 3;

/// The nightly behaviour session: a parent revokes coins, then banks the rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: String,
    pub day: NaiveDate,
    pub coins_started: u8,
    pub revoked: Vec<u8>,
    pub banked: bool,
    pub coins_banked: u8,
    pub banked_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new(user_id: &str, day: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            day,
            coins_started: SESSION_COINS,
            revoked: Vec::new(),
            banked: false,
            coins_banked: 0,
            banked_at: None,
        }
    }

    pub fn remaining(&self) -> u8 {
        self.coins_started.saturating_sub(self.revoked.len() as u8)
    }
}

/// Parent-initiated request for an immediate bonus spelling round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BonusTrigger {
    pub triggered_at: DateTime<Utc>,
}
