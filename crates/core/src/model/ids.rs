use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// Card id, the host collection's integer primary key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(i64);

impl CardId {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CardId({})", self.0)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// Deck id. Decks arrive keyed by stringified id in the collection's JSON
/// columns, so this is the one id that also parses from text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeckId(i64);

impl DeckId {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeckId({})", self.0)
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error from parsing a deck id out of a JSON object key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a numeric deck id: {text:?}")]
pub struct ParseIdError {
    text: String,
}

impl FromStr for DeckId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self::new).map_err(|_| ParseIdError {
            text: s.to_owned(),
        })
    }
}

//
// ─── REVLOG ────────────────────────────────────────────────────────────────────
//

/// Review-log row id. The host keys the log by the epoch-millisecond write
/// time, so ids order by time and double as timestamps.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RevlogId(i64);

impl RevlogId {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> i64 {
        self.0
    }

    /// The id reinterpreted as milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for RevlogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevlogId({})", self.0)
    }
}

impl fmt::Display for RevlogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
