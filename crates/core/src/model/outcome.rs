use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur while decoding outcome codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutcomeError {
    #[error("invalid ease code: {0}")]
    InvalidEase(i64),
    #[error("unknown outcome code {0:?}")]
    UnknownCode(String),
}

//
// ─── OUTCOME CODE ─────────────────────────────────────────────────────────────
//

/// Classification of one counted review event.
///
/// The four graded variants correspond to the host's answer ease codes 1-4.
/// `Buried` and `Suspended` mark manually skipped cards; `Undone` marks an
/// entry that was kept in place but grayed out by an acknowledge-mode undo.
///
/// Historical session logs mixed booleans, raw ease integers, and sentinel
/// strings for these values; the deserializer accepts all of those forms and
/// the serializer always emits the canonical lowercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeCode {
    /// Failed recall (ease 1).
    Again,
    /// Recalled with difficulty (ease 2).
    Hard,
    /// Recalled correctly (ease 3).
    Good,
    /// Recalled instantly (ease 4).
    Easy,
    /// Card was buried for the rest of the day.
    Buried,
    /// Card was suspended indefinitely.
    Suspended,
    /// Entry undone in place without shrinking the log.
    Undone,
}

impl OutcomeCode {
    /// Converts a host ease code (1-4) to an `OutcomeCode`.
    ///
    /// # Errors
    ///
    /// Returns `OutcomeError::InvalidEase` for values outside 1-4; the host
    /// also writes such rows for manual scheduling operations, which never
    /// correspond to a counted review.
    pub fn from_ease(value: i64) -> Result<Self, OutcomeError> {
        match value {
            1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            _ => Err(OutcomeError::InvalidEase(value)),
        }
    }

    /// Decodes a legacy string form (canonical names only).
    ///
    /// # Errors
    ///
    /// Returns `OutcomeError::UnknownCode` for unrecognized strings.
    pub fn from_legacy_str(value: &str) -> Result<Self, OutcomeError> {
        match value {
            "again" => Ok(Self::Again),
            "hard" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            "easy" => Ok(Self::Easy),
            "buried" => Ok(Self::Buried),
            "suspended" => Ok(Self::Suspended),
            "undone" => Ok(Self::Undone),
            other => Err(OutcomeError::UnknownCode(other.to_string())),
        }
    }

    /// The canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
            Self::Buried => "buried",
            Self::Suspended => "suspended",
            Self::Undone => "undone",
        }
    }

    /// The host ease code for graded outcomes, `None` for the rest.
    #[must_use]
    pub fn ease(self) -> Option<u8> {
        match self {
            Self::Again => Some(1),
            Self::Hard => Some(2),
            Self::Good => Some(3),
            Self::Easy => Some(4),
            _ => None,
        }
    }

    /// True for graded outcomes above Again (ease 2-4).
    #[must_use]
    pub fn is_pass(self) -> bool {
        matches!(self, Self::Hard | Self::Good | Self::Easy)
    }

    /// True for a failed recall.
    #[must_use]
    pub fn is_again(self) -> bool {
        matches!(self, Self::Again)
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── SERDE (LEGACY-TOLERANT) ──────────────────────────────────────────────────
//

impl Serialize for OutcomeCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

struct OutcomeCodeVisitor;

impl Visitor<'_> for OutcomeCodeVisitor {
    type Value = OutcomeCode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an outcome name, an ease code 1-4, or a legacy pass/fail boolean")
    }

    fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        // Oldest logs stored plain pass/fail.
        Ok(if value {
            OutcomeCode::Good
        } else {
            OutcomeCode::Again
        })
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        OutcomeCode::from_ease(value)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let signed = i64::try_from(value)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))?;
        self.visit_i64(signed)
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        OutcomeCode::from_legacy_str(value)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
    }
}

impl<'de> Deserialize<'de> for OutcomeCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(OutcomeCodeVisitor)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_conversion_works() {
        assert_eq!(OutcomeCode::from_ease(1).unwrap(), OutcomeCode::Again);
        assert_eq!(OutcomeCode::from_ease(4).unwrap(), OutcomeCode::Easy);
        let err = OutcomeCode::from_ease(0).unwrap_err();
        assert!(matches!(err, OutcomeError::InvalidEase(0)));
        assert!(OutcomeCode::from_ease(5).is_err());
    }

    #[test]
    fn ease_round_trips_for_graded_outcomes() {
        for ease in 1..=4 {
            let code = OutcomeCode::from_ease(ease).unwrap();
            assert_eq!(code.ease(), Some(u8::try_from(ease).unwrap()));
        }
        assert_eq!(OutcomeCode::Buried.ease(), None);
        assert_eq!(OutcomeCode::Undone.ease(), None);
    }

    #[test]
    fn pass_fail_predicates() {
        assert!(OutcomeCode::Good.is_pass());
        assert!(OutcomeCode::Easy.is_pass());
        assert!(!OutcomeCode::Again.is_pass());
        assert!(!OutcomeCode::Buried.is_pass());
        assert!(OutcomeCode::Again.is_again());
        assert!(!OutcomeCode::Undone.is_again());
    }

    #[test]
    fn serializes_to_canonical_strings() {
        let json = serde_json::to_string(&OutcomeCode::Suspended).unwrap();
        assert_eq!(json, "\"suspended\"");
    }

    #[test]
    fn deserializes_canonical_strings() {
        let code: OutcomeCode = serde_json::from_str("\"undone\"").unwrap();
        assert_eq!(code, OutcomeCode::Undone);
    }

    #[test]
    fn deserializes_legacy_booleans() {
        let pass: OutcomeCode = serde_json::from_str("true").unwrap();
        let fail: OutcomeCode = serde_json::from_str("false").unwrap();
        assert_eq!(pass, OutcomeCode::Good);
        assert_eq!(fail, OutcomeCode::Again);
    }

    #[test]
    fn deserializes_legacy_ease_integers() {
        let code: OutcomeCode = serde_json::from_str("2").unwrap();
        assert_eq!(code, OutcomeCode::Hard);
        assert!(serde_json::from_str::<OutcomeCode>("7").is_err());
    }

    #[test]
    fn rejects_unknown_strings() {
        let err = OutcomeCode::from_legacy_str("skipped").unwrap_err();
        assert!(matches!(err, OutcomeError::UnknownCode(s) if s == "skipped"));
    }
}
