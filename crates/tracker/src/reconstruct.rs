use chrono::Duration;

use chunkbar_core::{RevlogEntry, RevlogId, TrackerOptions};
use chunkbar_host::Host;

use crate::state::{ManualAction, ManualKind, SessionState};
use crate::tracker::TrackerError;

//
// ─── SESSION REBUILD ──────────────────────────────────────────────────────────
//

/// Half-width of the window inside which a persisted review-log entry
/// supersedes a buffered manual action on the same card.
pub const RECONCILE_WINDOW_MS: i64 = 5_000;

/// Rebuilds the session ledger from the persisted review log.
///
/// The outcome and time logs are cleared (undo history and the
/// manual-action buffer survive), today's entries for cards in the selected
/// deck's tree are replayed, and buffered manual actions are merged back in
/// afterwards unless an entry for the same card lands inside the
/// reconciliation window.
///
/// # Errors
///
/// Returns `TrackerError::Host` when the deck tree or the review log
/// cannot be read.
pub fn rebuild(
    state: &mut SessionState,
    host: &Host,
    options: &TrackerOptions,
) -> Result<(), TrackerError> {
    state.reset_logs();

    let Some(deck) = host.decks.selected_deck() else {
        return Ok(());
    };
    let cards = host.decks.card_ids_in_tree(deck)?;
    if cards.is_empty() {
        return Ok(());
    }

    let cutoff = (host.scheduler.day_cutoff() - Duration::days(1)).timestamp_millis();
    let entries = host.revlog.entries_since(RevlogId::new(cutoff))?;

    for entry in &entries {
        if !cards.contains(&entry.card_id) {
            continue;
        }
        // rows with an ease outside 1-4 are manual scheduling operations
        let Ok(outcome) = entry.outcome() else {
            continue;
        };
        if outcome.is_pass() || options.fail_policy.is_acknowledge() {
            state.replay(outcome, entry.taken_secs());
        }
    }

    // Matched against the unfiltered entry list: a nearby row supersedes
    // the buffered action even when its card has left the tree.
    let reconciled: Vec<ManualAction> = state
        .manual_actions()
        .iter()
        .copied()
        .filter(|action| {
            let in_deck = action.deck_id == Some(deck)
                || (action.deck_id.is_none() && cards.contains(&action.card_id));
            in_deck && policy_counts(options, action.kind) && !superseded(action, &entries)
        })
        .collect();
    for action in reconciled {
        state.replay(action.kind.outcome(), action.elapsed_secs);
    }

    Ok(())
}

fn policy_counts(options: &TrackerOptions, kind: ManualKind) -> bool {
    match kind {
        ManualKind::Bury => options.bury_policy.is_acknowledge(),
        ManualKind::Suspend => options.suspend_policy.is_acknowledge(),
    }
}

fn superseded(action: &ManualAction, entries: &[RevlogEntry]) -> bool {
    let at_ms = action.at.timestamp_millis();
    entries.iter().any(|entry| {
        entry.card_id == action.card_id
            && (entry.id.timestamp_millis() - at_ms).abs() < RECONCILE_WINDOW_MS
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
