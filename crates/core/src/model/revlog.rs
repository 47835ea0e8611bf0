use serde::{Deserialize, Serialize};

use crate::model::ids::{CardId, RevlogId};
use crate::model::outcome::{OutcomeCode, OutcomeError};

//
// ─── REVIEW LOG ENTRY ─────────────────────────────────────────────────────────
//

/// One persisted review-log row, as read back from the host.
///
/// The ease code is kept raw; `outcome()` decodes it at the point of use so
/// manual-scheduling rows (ease outside 1-4) stay visible to callers that
/// need to skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevlogEntry {
    pub id: RevlogId,
    pub card_id: CardId,
    pub ease: i64,
    pub taken_millis: i64,
}

impl RevlogEntry {
    #[must_use]
    pub fn new(id: RevlogId, card_id: CardId, ease: i64, taken_millis: i64) -> Self {
        Self {
            id,
            card_id,
            ease,
            taken_millis,
        }
    }

    /// Decodes the ease code into an outcome.
    ///
    /// # Errors
    ///
    /// Returns `OutcomeError::InvalidEase` for rows the host wrote for manual
    /// scheduling operations rather than answers.
    pub fn outcome(&self) -> Result<OutcomeCode, OutcomeError> {
        OutcomeCode::from_ease(self.ease)
    }

    /// Answer duration in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn taken_secs(&self) -> f64 {
        self.taken_millis as f64 / 1000.0
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
