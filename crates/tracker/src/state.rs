use chrono::{DateTime, Utc};

use chunkbar_core::{CardId, DeckId, OutcomeCode};

//
// ─── MANUAL ACTIONS ───────────────────────────────────────────────────────────
//

/// Kind of manual scheduling action taken on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualKind {
    Bury,
    Suspend,
}

impl ManualKind {
    /// The outcome recorded when the action is counted.
    #[must_use]
    pub fn outcome(self) -> OutcomeCode {
        match self {
            Self::Bury => OutcomeCode::Buried,
            Self::Suspend => OutcomeCode::Suspended,
        }
    }
}

/// A buffered bury/suspend event.
///
/// Buffered actions outlive session rebuilds so they can be reconciled
/// against the persisted review log, which never records them itself.
/// `deck_id` is the deck selected when the action happened; `None` means
/// the selection could not be read at the time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualAction {
    pub card_id: CardId,
    pub deck_id: Option<DeckId>,
    pub kind: ManualKind,
    pub at: DateTime<Utc>,
    pub elapsed_secs: f64,
}

//
// ─── SESSION STATE ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    count: u32,
    status_log: Vec<OutcomeCode>,
    time_log: Vec<f64>,
}

/// The session's review ledger: a gap-free outcome log with its parallel
/// elapsed-time log, an undo history of full snapshots, and the buffer of
/// manual actions awaiting reconciliation.
///
/// `status_log` and `time_log` always hold the same number of entries, and
/// `count` tracks that length across undo restores and rebuilds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    count: u32,
    status_log: Vec<OutcomeCode>,
    time_log: Vec<f64>,
    history: Vec<Snapshot>,
    manual_actions: Vec<ManualAction>,
    initial_total: Option<u32>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn status_log(&self) -> &[OutcomeCode] {
        &self.status_log
    }

    #[must_use]
    pub fn time_log(&self) -> &[f64] {
        &self.time_log
    }

    #[must_use]
    pub fn manual_actions(&self) -> &[ManualAction] {
        &self.manual_actions
    }

    #[must_use]
    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    /// The session total fixed at the first bar refresh, if one happened.
    #[must_use]
    pub fn initial_total(&self) -> Option<u32> {
        self.initial_total
    }

    pub fn set_initial_total(&mut self, total: u32) {
        self.initial_total = Some(total);
    }

    /// Invalidates the fixed total so the next refresh recomputes it.
    pub fn clear_initial_total(&mut self) {
        self.initial_total = None;
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            count: self.count,
            status_log: self.status_log.clone(),
            time_log: self.time_log.clone(),
        }
    }

    /// Counts one event: snapshots the ledger for undo, then appends the
    /// outcome and its elapsed time.
    pub fn record(&mut self, outcome: OutcomeCode, elapsed_secs: f64) {
        self.history.push(self.snapshot());
        self.status_log.push(outcome);
        self.time_log.push(elapsed_secs);
        self.count += 1;
    }

    /// Appends a rebuilt entry without touching the undo history.
    pub fn replay(&mut self, outcome: OutcomeCode, elapsed_secs: f64) {
        self.status_log.push(outcome);
        self.time_log.push(elapsed_secs);
        self.count += 1;
    }

    /// Restores the ledger to the snapshot taken before the last counted
    /// event. Returns `false` when the history is empty.
    pub fn undo_last(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        self.count = snapshot.count;
        self.status_log = snapshot.status_log;
        self.time_log = snapshot.time_log;
        true
    }

    /// Grays out the last entry in place instead of shrinking the log:
    /// the status becomes `Undone` and its elapsed time is zeroed. Returns
    /// `false` when the logs are out of step or empty.
    pub fn mark_last_undone(&mut self) -> bool {
        if self.status_log.len() != self.time_log.len() {
            return false;
        }
        let Some(last) = self.status_log.last_mut() else {
            return false;
        };
        *last = OutcomeCode::Undone;
        if let Some(time) = self.time_log.last_mut() {
            *time = 0.0;
        }
        true
    }

    /// Buffers a manual action for later reconciliation.
    pub fn push_manual(&mut self, action: ManualAction) {
        self.manual_actions.push(action);
    }

    /// Clears the outcome and time logs and the fixed session total. The
    /// undo history and the manual-action buffer survive, because a rebuild
    /// must still honor them.
    pub fn reset_logs(&mut self) {
        self.count = 0;
        self.status_log.clear();
        self.time_log.clear();
        self.initial_total = None;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
