//! Derives a retention-calibrated interval table from a chunk size and a
//! target retention fraction, for pass-rate coloring under binary weights.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluation::{Bound, ColorKey, Interval, Weights};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors from invalid calibration inputs.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CalibrationError {
    #[error("chunk size must be at least 1, got {provided}")]
    InvalidChunkSize { provided: u32 },
    #[error("retention must lie in [0, 1], got {provided}")]
    InvalidRetention { provided: f64 },
}

//
// ─── CALIBRATION ───────────────────────────────────────────────────────────────
//

/// A weights-plus-intervals pair ready to drop into the `chunk_evaluation`
/// section of the configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub weights: Weights,
    pub intervals: Vec<Interval>,
}

/// Builds a pass/fail interval table centered on the target retention.
///
/// Weights come out binary (`again = 0`, everything else `1`) so a chunk
/// average equals its pass rate and lives on the same `[0, 1]` scale as the
/// retention target. The breakpoints bracket the target between reachable
/// chunk averages:
///
/// - `steps = { i / chunk_size : i = 0..=chunk_size }`
/// - `x` is the largest step strictly below `retention`, or `0.0`
/// - `y` is the smallest step strictly above `retention`, or `1.0`
///
/// giving five enabled bands `[0, x)` again, `[x, R)` again with hard
/// stripes, `[R, R]` hard, `(R, y]` hard with good stripes and `(y, 1]`
/// good, plus two disabled placeholder rows so the table keeps the same
/// seven-row shape as the manual grade ladder. When `retention` is `1.0`
/// the `y` fallback collapses the good band to the empty `(1, 1]`; that
/// collapse is long-standing behavior and is kept as is.
///
/// # Errors
///
/// Returns [`CalibrationError::InvalidChunkSize`] when `chunk_size` is zero
/// and [`CalibrationError::InvalidRetention`] when `retention` is outside
/// `[0, 1]` or not a number.
///
/// # Examples
///
/// ```
/// # use chunkbar_core::calibration::calibrate;
/// let calibration = calibrate(10, 0.9).unwrap();
/// assert_eq!(calibration.intervals[1].start, 0.8);
/// assert_eq!(calibration.intervals[3].end, 1.0);
/// ```
pub fn calibrate(chunk_size: u32, retention: f64) -> Result<Calibration, CalibrationError> {
    if chunk_size == 0 {
        return Err(CalibrationError::InvalidChunkSize {
            provided: chunk_size,
        });
    }
    if !(0.0..=1.0).contains(&retention) {
        return Err(CalibrationError::InvalidRetention {
            provided: retention,
        });
    }

    let step = |i: u32| f64::from(i) / f64::from(chunk_size);
    let x = (0..=chunk_size)
        .map(step)
        .filter(|&s| s < retention)
        .last()
        .unwrap_or(0.0);
    let y = (0..=chunk_size)
        .map(step)
        .find(|&s| s > retention)
        .unwrap_or(1.0);

    let intervals = vec![
        Interval::new(Bound::Inclusive, 0.0, x, Bound::Exclusive, ColorKey::Again),
        Interval::new(Bound::Inclusive, x, retention, Bound::Exclusive, ColorKey::Again)
            .with_pattern(ColorKey::Hard),
        Interval::new(
            Bound::Inclusive,
            retention,
            retention,
            Bound::Inclusive,
            ColorKey::Hard,
        ),
        Interval::new(Bound::Exclusive, retention, y, Bound::Inclusive, ColorKey::Hard)
            .with_pattern(ColorKey::Good),
        Interval::new(Bound::Exclusive, y, 1.0, Bound::Inclusive, ColorKey::Good),
        Interval::new(Bound::Exclusive, 1.0, 1.0, Bound::Exclusive, ColorKey::Good)
            .with_pattern(ColorKey::Easy)
            .disabled(),
        Interval::new(Bound::Inclusive, 1.0, 1.0, Bound::Inclusive, ColorKey::Easy).disabled(),
    ];

    Ok(Calibration {
        weights: Weights::binary(),
        intervals,
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
