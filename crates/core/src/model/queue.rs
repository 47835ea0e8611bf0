//
// ─── CARD QUEUE ───────────────────────────────────────────────────────────────
//

/// A card's live scheduling queue as reported by the host.
///
/// Negative codes mark cards removed from study: -1 suspended, -2 buried with
/// its siblings, -3 buried by hand. The classifier reads these back after the
/// fact to recover bury/suspend actions whose hooks never fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardQueue {
    New,
    Learning,
    Review,
    DayLearning,
    Preview,
    Suspended,
    SiblingBuried,
    ManuallyBuried,
}

impl CardQueue {
    /// Decodes the host's queue integer; unknown codes yield `None`.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::New),
            1 => Some(Self::Learning),
            2 => Some(Self::Review),
            3 => Some(Self::DayLearning),
            4 => Some(Self::Preview),
            -1 => Some(Self::Suspended),
            -2 => Some(Self::SiblingBuried),
            -3 => Some(Self::ManuallyBuried),
            _ => None,
        }
    }

    /// The host's integer code for this queue.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::New => 0,
            Self::Learning => 1,
            Self::Review => 2,
            Self::DayLearning => 3,
            Self::Preview => 4,
            Self::Suspended => -1,
            Self::SiblingBuried => -2,
            Self::ManuallyBuried => -3,
        }
    }

    #[must_use]
    pub fn is_suspended(self) -> bool {
        matches!(self, Self::Suspended)
    }

    /// True for either flavor of buried card.
    #[must_use]
    pub fn is_buried(self) -> bool {
        matches!(self, Self::SiblingBuried | Self::ManuallyBuried)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
