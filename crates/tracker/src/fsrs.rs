use serde_json::{Value, json};

use chunkbar_core::{Calibration, DeckId, TrackerOptions, calibrate};
use chunkbar_host::{DeckQueries, Host, HostError};

use crate::tracker::TrackerError;

//
// ─── DECK-DRIVEN CALIBRATION ──────────────────────────────────────────────────
//

/// Result of a deck calibration pass. `messages` carries user-facing
/// notices in the order they should be shown.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalibrationUpdate {
    pub applied: bool,
    pub messages: Vec<String>,
}

/// Mean desired-retention target across the deck's tree, when any member
/// carries one.
///
/// # Errors
///
/// Returns `HostError` when the tree or a preset cannot be read.
pub fn average_retention(
    decks: &dyn DeckQueries,
    deck: DeckId,
) -> Result<Option<f64>, HostError> {
    let tree = decks.deck_and_children(deck)?;
    let mut sum = 0.0;
    let mut found = 0u32;
    for member in tree {
        if let Some(target) = decks.desired_retention(member)? {
            sum += target;
            found += 1;
        }
    }
    if found == 0 {
        Ok(None)
    } else {
        Ok(Some(sum / f64::from(found)))
    }
}

/// Aligns the chunk evaluation table with the deck's retention target.
///
/// Does nothing while the feature is off, and checks each deck only once
/// until `force` overrides the guard. A deck without readable targets falls
/// back to the configured retention, with a notice. When the target yields
/// a table different from the active one, the new weights and intervals
/// are written to the stored configuration; the caller is expected to
/// reload its options afterwards.
///
/// # Errors
///
/// Returns `TrackerError::Host` for configuration I/O failures and
/// `TrackerError::Calibration` when the target cannot be calibrated.
pub fn apply_deck_calibration(
    host: &Host,
    options: &TrackerOptions,
    last_checked: &mut Option<DeckId>,
    deck: DeckId,
    force: bool,
) -> Result<CalibrationUpdate, TrackerError> {
    if !options.fsrs_use_deck {
        return Ok(CalibrationUpdate::default());
    }
    if *last_checked == Some(deck) && !force {
        return Ok(CalibrationUpdate::default());
    }
    *last_checked = Some(deck);

    let deck_name = host
        .decks
        .deck_name(deck)
        .unwrap_or_else(|_| "Unknown Deck".to_owned());

    let mut update = CalibrationUpdate::default();
    let fetched = average_retention(host.decks.as_ref(), deck).unwrap_or(None);
    let retention = match fetched {
        Some(target) => target,
        None => {
            update.messages.push(format!(
                "Could not fetch FSRS targets for '{deck_name}', using default {:.0}%",
                options.fsrs_retention * 100.0
            ));
            options.fsrs_retention
        }
    };

    let calibration = calibrate(options.chunk_size, retention)?;
    if calibration.weights == options.weights && calibration.intervals == options.intervals {
        return Ok(update);
    }

    write_calibration(host, &calibration)?;
    update.applied = true;
    update.messages.push(format!(
        "Updated coloring intervals for {:.0}% desired retention",
        retention * 100.0
    ));
    Ok(update)
}

fn write_calibration(host: &Host, calibration: &Calibration) -> Result<(), TrackerError> {
    let mut user = host.config.load()?;
    if !user.is_object() {
        user = json!({});
    }
    if !user["chunk_evaluation"].is_object() {
        user["chunk_evaluation"] = json!({});
    }
    user["chunk_evaluation"]["weights"] = to_value(&calibration.weights)?;
    user["chunk_evaluation"]["intervals"] = to_value(&calibration.intervals)?;
    host.config.save(&user)?;
    Ok(())
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, TrackerError> {
    serde_json::to_value(value)
        .map_err(|err| HostError::Serialization(err.to_string()).into())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
