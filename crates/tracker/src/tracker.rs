use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use chunkbar_core::{CalibrationError, CardId, Clock, DeckId, OutcomeCode, TrackerOptions};
use chunkbar_host::{Host, HostError};

use crate::fsrs::apply_deck_calibration;
use crate::reconstruct::rebuild;
use crate::refresh::{ProgressPresenter, RefreshScheduler, SETTLE_DELAY, build_frame};
use crate::state::{ManualAction, ManualKind, SessionState};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors surfaced by tracker operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

//
// ─── SCREENS ──────────────────────────────────────────────────────────────────
//

/// The host screen the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    DeckBrowser,
    Overview,
    Review,
    Other,
}

impl Screen {
    /// Maps the host's state name to a screen.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "deckBrowser" => Self::DeckBrowser,
            "overview" => Self::Overview,
            "review" => Self::Review,
            _ => Self::Other,
        }
    }
}

//
// ─── REVIEW TRACKER ───────────────────────────────────────────────────────────
//

/// Tracks one review session end to end: answers and manual actions feed
/// the ledger, screen changes rebuild it from the persisted review log,
/// and every change is presented as a fresh bar frame.
///
/// The tracker also carries the per-card bookkeeping that disambiguates
/// event sources: bury/suspend arrive both through hooks and through queue
/// inspection at the next question, and only one of them may count.
pub struct ReviewTracker {
    host: Host,
    presenter: Arc<dyn ProgressPresenter>,
    scheduler: Arc<dyn RefreshScheduler>,
    options: TrackerOptions,
    state: SessionState,
    clock: Clock,
    screen: Screen,
    last_card: Option<CardId>,
    was_answered: bool,
    action_handled: bool,
    last_handled_card: Option<CardId>,
    start_time: Option<DateTime<Utc>>,
    last_fsrs_deck: Option<DeckId>,
}

impl ReviewTracker {
    /// Builds a tracker over the given host, decoding options from the
    /// stored configuration.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Host` when the configuration cannot be read.
    pub fn new(
        host: Host,
        presenter: Arc<dyn ProgressPresenter>,
        scheduler: Arc<dyn RefreshScheduler>,
    ) -> Result<Self, TrackerError> {
        let user = host.config.load()?;
        let options = TrackerOptions::from_value(&user);
        Ok(Self {
            host,
            presenter,
            scheduler,
            options,
            state: SessionState::new(),
            clock: Clock::default(),
            screen: Screen::Other,
            last_card: None,
            was_answered: false,
            action_handled: false,
            last_handled_card: None,
            start_time: None,
            last_fsrs_deck: None,
        })
    }

    /// Replaces the tracker's clock, for deterministic tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// A new question is on screen.
    ///
    /// Before tracking switches to the new card, the previous card's queue
    /// is inspected: if it left the session without an answer and without a
    /// handled action, a bury or suspend happened through a path with no
    /// hook, and the event is recovered here. Queue read failures are
    /// ignored.
    pub fn question_shown(&mut self, card: CardId) {
        if let Some(prev) = self.last_card {
            if !self.was_answered && !self.action_handled {
                if let Ok(queue) = self.host.cards.queue_state(prev) {
                    if queue.is_suspended() {
                        self.buffer_manual_event(prev, ManualKind::Suspend);
                    } else if queue.is_buried() {
                        self.buffer_manual_event(prev, ManualKind::Bury);
                    }
                }
            }
        }
        self.last_card = Some(card);
        self.was_answered = false;
        self.action_handled = false;
        self.start_time = Some(self.clock.now());
    }

    /// A card was answered with the given ease code.
    ///
    /// Ease codes outside 1-4 are ignored entirely. Passes always count;
    /// fails count only under an acknowledged fail policy. A refresh is
    /// always scheduled after the settle delay, counted or not, because the
    /// scheduler counts have moved either way.
    pub fn answered(&mut self, card: CardId, ease: i64) {
        let Ok(outcome) = OutcomeCode::from_ease(ease) else {
            return;
        };

        let elapsed = self.answer_elapsed_secs(card);
        self.was_answered = true;
        self.action_handled = true;
        self.last_handled_card = Some(card);

        if outcome.is_pass() || self.options.fail_policy.is_acknowledge() {
            self.state.record(outcome, elapsed);
        }
        self.scheduler.request_refresh(SETTLE_DELAY);
    }

    /// The current card was buried by hand.
    pub fn buried(&mut self, card: CardId) {
        self.manual_event(card, ManualKind::Bury);
    }

    /// The current card was suspended.
    pub fn suspended(&mut self, card: CardId) {
        self.manual_event(card, ManualKind::Suspend);
    }

    /// The last review was undone.
    ///
    /// Outside the review screen this is not ours to handle. Under the
    /// acknowledge policy the entry is grayed out in place; otherwise the
    /// ledger rolls back one snapshot.
    pub fn undone(&mut self) {
        if self.screen != Screen::Review {
            return;
        }
        if self.options.undo_policy.is_acknowledge() {
            self.state.mark_last_undone();
        } else {
            self.state.undo_last();
        }
        self.last_handled_card = None;
        self.action_handled = false;
        self.scheduler.request_refresh(SETTLE_DELAY);
    }

    /// The host switched screens.
    ///
    /// Overview and review trigger the deck calibration check first, so a
    /// rebuild already runs with the updated table. Entering review resets
    /// the per-card bookkeeping and rebuilds the session from the log.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` when the calibration check or the rebuild
    /// fails.
    pub fn state_changed(&mut self, screen: Screen) -> Result<(), TrackerError> {
        self.screen = screen;
        if matches!(screen, Screen::Overview | Screen::Review) {
            self.run_fsrs_check(false)?;
        }
        if screen == Screen::Review {
            self.last_card = None;
            self.was_answered = false;
            self.action_handled = false;
            self.last_handled_card = None;
            rebuild(&mut self.state, &self.host, &self.options)?;
            self.scheduler.request_refresh(SETTLE_DELAY);
        }
        Ok(())
    }

    /// A sync finished; during review the log may have changed under us.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Host` when the rebuild fails.
    pub fn sync_finished(&mut self) -> Result<(), TrackerError> {
        if self.screen == Screen::Review {
            rebuild(&mut self.state, &self.host, &self.options)?;
            self.scheduler.request_refresh(SETTLE_DELAY);
        }
        Ok(())
    }

    /// Re-reads the stored configuration and invalidates the fixed session
    /// total, then recalibrates when the chunk size changed and automatic
    /// recalibration is on.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` when the configuration cannot be read or the
    /// follow-up calibration fails.
    pub fn reload_config(&mut self) -> Result<(), TrackerError> {
        let user = self.host.config.load()?;
        let fresh = TrackerOptions::from_value(&user);
        let chunk_changed = fresh.chunk_size != self.options.chunk_size;
        self.options = fresh;
        self.state.clear_initial_total();
        if chunk_changed && self.options.fsrs_auto_chunk {
            self.run_fsrs_check(true)?;
        }
        Ok(())
    }

    /// Forces a deck calibration pass for the selected deck.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` when the check fails.
    pub fn recalibrate(&mut self) -> Result<(), TrackerError> {
        self.run_fsrs_check(true)
    }

    /// Assembles and presents a frame from the current ledger; the deferred
    /// refresh requests land here when the host timer fires. When the
    /// scheduler counts cannot be read there is nothing to show, and the
    /// previous frame stands.
    pub fn refresh_now(&mut self) {
        let Ok(counts) = self.host.scheduler.counts() else {
            return;
        };
        let frame = build_frame(&mut self.state, &self.options, counts);
        self.presenter.present(&frame);
    }

    fn run_fsrs_check(&mut self, force: bool) -> Result<(), TrackerError> {
        let Some(deck) = self.host.decks.selected_deck() else {
            return Ok(());
        };
        let update = apply_deck_calibration(
            &self.host,
            &self.options,
            &mut self.last_fsrs_deck,
            deck,
            force,
        )?;
        if update.applied {
            self.reload_config()?;
        }
        for message in &update.messages {
            self.presenter.notify(message);
        }
        Ok(())
    }

    fn manual_event(&mut self, card: CardId, kind: ManualKind) {
        if self.action_handled || self.last_handled_card == Some(card) {
            return;
        }
        self.action_handled = true;
        self.buffer_manual_event(card, kind);
    }

    fn buffer_manual_event(&mut self, card: CardId, kind: ManualKind) {
        let elapsed = if self.options.use_capped_duration {
            match self.host.cards.time_taken_millis(card) {
                Ok(millis) => millis_to_secs(millis),
                Err(_) => 0.0,
            }
        } else {
            self.wall_elapsed_secs()
        };

        let action = ManualAction {
            card_id: card,
            deck_id: self.host.decks.selected_deck(),
            kind,
            at: self.clock.now(),
            elapsed_secs: elapsed,
        };
        self.state.push_manual(action);
        self.last_handled_card = Some(card);

        let counted = match kind {
            ManualKind::Bury => self.options.bury_policy.is_acknowledge(),
            ManualKind::Suspend => self.options.suspend_policy.is_acknowledge(),
        };
        if counted {
            self.state.record(kind.outcome(), elapsed);
            self.scheduler.request_refresh(SETTLE_DELAY);
        }
    }

    fn answer_elapsed_secs(&self, card: CardId) -> f64 {
        if self.options.use_capped_duration {
            if let Ok(millis) = self.host.cards.time_taken_millis(card) {
                return millis_to_secs(millis);
            }
        }
        self.wall_elapsed_secs()
    }

    fn wall_elapsed_secs(&self) -> f64 {
        self.start_time
            .map_or(0.0, |start| self.clock.seconds_since(start))
    }
}

#[allow(clippy::cast_precision_loss)]
fn millis_to_secs(millis: u64) -> f64 {
    millis as f64 / 1000.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
