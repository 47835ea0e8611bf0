//! Chunk evaluation: weighted scoring of outcome slices and resolution of a
//! score against an ordered color-interval table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::OutcomeCode;

/// Comparison tolerance used for interval membership at shared boundaries.
pub const SCORE_EPSILON: f64 = 1e-9;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors from decoding interval-table rows out of configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IntervalError {
    #[error("unknown bracket {0:?}, expected \"[\", \"(\", \")\" or \"]\"")]
    UnknownBracket(String),
}

//
// ─── COLOR KEYS ────────────────────────────────────────────────────────────────
//

/// Symbolic color identifier resolved by the presentation layer.
///
/// Serialized as the lowercase name; the pre-rename spellings `"done"` and
/// `"fail"` still decode for configurations written by old releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorKey {
    #[serde(alias = "fail")]
    Again,
    Hard,
    #[serde(alias = "done")]
    Good,
    Easy,
    Buried,
    Suspended,
    Undo,
}

impl ColorKey {
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
            Self::Undo => "undo",
        }
    }
}

//
// ─── WEIGHTS ───────────────────────────────────────────────────────────────────
//

/// Per-outcome contribution to a chunk average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub again: f64,
    pub hard: f64,
    pub good: f64,
    pub easy: f64,
}

impl Weights {
    /// The 1-4 grade ladder matching the host's raw ease codes.
    #[must_use]
    pub fn graded() -> Self {
        Self {
            again: 1.0,
            hard: 2.0,
            good: 3.0,
            easy: 4.0,
        }
    }

    /// Pass/fail weighting used by retention calibration.
    #[must_use]
    pub fn binary() -> Self {
        Self {
            again: 0.0,
            hard: 1.0,
            good: 1.0,
            easy: 1.0,
        }
    }

    /// Contribution of one outcome to a chunk average.
    ///
    /// `Undone` contributes the fail weight; `Buried` and `Suspended`
    /// contribute the good weight, with all-buried/all-suspended chunks
    /// recolored after interval resolution.
    #[must_use]
    pub fn for_outcome(&self, code: OutcomeCode) -> f64 {
        match code {
            OutcomeCode::Again | OutcomeCode::Undone => self.again,
            OutcomeCode::Hard => self.hard,
            OutcomeCode::Good | OutcomeCode::Buried | OutcomeCode::Suspended => self.good,
            OutcomeCode::Easy => self.easy,
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::graded()
    }
}

//
// ─── INTERVALS ─────────────────────────────────────────────────────────────────
//

/// Whether a range endpoint includes its boundary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Inclusive,
    Exclusive,
}

/// One row of the interval table: a score range mapped to a color, plus an
/// optional stripe companion used where two ranges touch at a shared edge.
///
/// The persisted form uses bracket strings (`"["`/`"("` and `")"`/`"]"`) and
/// the `start_val`/`end_val`/`color_key`/`pattern_key` field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IntervalRepr", into = "IntervalRepr")]
pub struct Interval {
    pub enabled: bool,
    pub start: f64,
    pub start_bound: Bound,
    pub end: f64,
    pub end_bound: Bound,
    pub color: ColorKey,
    pub pattern: Option<ColorKey>,
}

impl Interval {
    /// An enabled, patternless interval over the given range.
    #[must_use]
    pub fn new(start_bound: Bound, start: f64, end: f64, end_bound: Bound, color: ColorKey) -> Self {
        Self {
            enabled: true,
            start,
            start_bound,
            end,
            end_bound,
            color,
            pattern: None,
        }
    }

    /// Attaches a stripe companion color.
    #[must_use]
    pub fn with_pattern(mut self, pattern: ColorKey) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Marks the row disabled; kept in the table for schema symmetry.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Epsilon-tolerant membership test.
    #[must_use]
    pub fn contains(&self, score: f64) -> bool {
        let above_start = match self.start_bound {
            Bound::Inclusive => score >= self.start - SCORE_EPSILON,
            Bound::Exclusive => score > self.start + SCORE_EPSILON,
        };
        let below_end = match self.end_bound {
            Bound::Inclusive => score <= self.end + SCORE_EPSILON,
            Bound::Exclusive => score < self.end - SCORE_EPSILON,
        };
        above_start && below_end
    }
}

/// Persisted shape of an `Interval`, bracket strings and all.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntervalRepr {
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default = "default_start_bracket")]
    start_bracket: String,
    start_val: f64,
    end_val: f64,
    #[serde(default = "default_end_bracket")]
    end_bracket: String,
    color_key: ColorKey,
    #[serde(default)]
    pattern_key: Option<ColorKey>,
}

fn default_enabled() -> bool {
    true
}

fn default_start_bracket() -> String {
    "[".to_string()
}

fn default_end_bracket() -> String {
    ")".to_string()
}

impl TryFrom<IntervalRepr> for Interval {
    type Error = IntervalError;

    fn try_from(repr: IntervalRepr) -> Result<Self, Self::Error> {
        let start_bound = match repr.start_bracket.as_str() {
            "[" => Bound::Inclusive,
            "(" => Bound::Exclusive,
            _ => return Err(IntervalError::UnknownBracket(repr.start_bracket)),
        };
        let end_bound = match repr.end_bracket.as_str() {
            "]" => Bound::Inclusive,
            ")" => Bound::Exclusive,
            _ => return Err(IntervalError::UnknownBracket(repr.end_bracket)),
        };

        Ok(Self {
            enabled: repr.enabled,
            start: repr.start_val,
            start_bound,
            end: repr.end_val,
            end_bound,
            color: repr.color_key,
            pattern: repr.pattern_key,
        })
    }
}

impl From<Interval> for IntervalRepr {
    fn from(interval: Interval) -> Self {
        Self {
            enabled: interval.enabled,
            start_bracket: match interval.start_bound {
                Bound::Inclusive => "[".to_string(),
                Bound::Exclusive => "(".to_string(),
            },
            start_val: interval.start,
            end_val: interval.end,
            end_bracket: match interval.end_bound {
                Bound::Inclusive => "]".to_string(),
                Bound::Exclusive => ")".to_string(),
            },
            color_key: interval.color,
            pattern_key: interval.pattern,
        }
    }
}

/// The stock grade-ladder table: solid bands spanning the graded weight
/// range `[1, 4]` with single-point stripe rows at the 1.5/2.5/3.5 edges
/// shared by neighboring bands.
#[must_use]
pub fn default_intervals() -> Vec<Interval> {
    vec![
        Interval::new(Bound::Inclusive, 1.0, 1.5, Bound::Exclusive, ColorKey::Again),
        Interval::new(Bound::Inclusive, 1.5, 1.5, Bound::Inclusive, ColorKey::Hard)
            .with_pattern(ColorKey::Again),
        Interval::new(Bound::Exclusive, 1.5, 2.5, Bound::Exclusive, ColorKey::Hard),
        Interval::new(Bound::Inclusive, 2.5, 2.5, Bound::Inclusive, ColorKey::Good)
            .with_pattern(ColorKey::Hard),
        Interval::new(Bound::Exclusive, 2.5, 3.5, Bound::Exclusive, ColorKey::Good),
        Interval::new(Bound::Inclusive, 3.5, 3.5, Bound::Inclusive, ColorKey::Easy)
            .with_pattern(ColorKey::Good),
        Interval::new(Bound::Exclusive, 3.5, 4.0, Bound::Inclusive, ColorKey::Easy),
    ]
}

//
// ─── EVALUATION ────────────────────────────────────────────────────────────────
//

/// Resolved presentation choice for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkStyle {
    pub color: ColorKey,
    pub pattern: Option<ColorKey>,
}

impl ChunkStyle {
    #[must_use]
    pub fn solid(color: ColorKey) -> Self {
        Self {
            color,
            pattern: None,
        }
    }
}

/// Weighted mean outcome of a chunk slice.
///
/// An empty slice scores `weights.good`, the optimistic default for chunks
/// that have no events yet.
///
/// # Examples
///
/// ```
/// # use chunkbar_core::evaluation::{chunk_score, Weights};
/// # use chunkbar_core::model::OutcomeCode;
/// let slice = [OutcomeCode::Good, OutcomeCode::Easy];
/// assert_eq!(chunk_score(&slice, &Weights::graded()), 3.5);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn chunk_score(slice: &[OutcomeCode], weights: &Weights) -> f64 {
    if slice.is_empty() {
        return weights.good;
    }
    let sum: f64 = slice.iter().map(|&code| weights.for_outcome(code)).sum();
    sum / slice.len() as f64
}

/// Resolves a score against the ordered interval table.
///
/// Every enabled row is tested and later matches override earlier ones, so a
/// score sitting exactly on a shared edge lands in the higher of the two
/// touching rows while that row's `pattern` key still names the lower color.
/// The scan stops once a row starts above the score; if nothing matched, the
/// style falls back to solid Good.
///
/// # Examples
///
/// ```
/// # use chunkbar_core::evaluation::{default_intervals, resolve_style, ColorKey};
/// let style = resolve_style(3.5, &default_intervals());
/// assert_eq!(style.color, ColorKey::Easy);
/// assert_eq!(style.pattern, Some(ColorKey::Good));
/// ```
#[must_use]
pub fn resolve_style(score: f64, intervals: &[Interval]) -> ChunkStyle {
    let mut style = ChunkStyle::solid(ColorKey::Good);
    for interval in intervals {
        if interval.start > score + SCORE_EPSILON {
            break;
        }
        if !interval.enabled {
            continue;
        }
        if interval.contains(score) {
            style = ChunkStyle {
                color: interval.color,
                pattern: interval.pattern,
            };
        }
    }
    style
}

/// Scores a chunk slice and resolves its display style, applying the
/// whole-chunk overrides for buried/suspended/undone content.
#[must_use]
pub fn evaluate_chunk(slice: &[OutcomeCode], weights: &Weights, intervals: &[Interval]) -> ChunkStyle {
    whole_chunk_override(slice)
        .unwrap_or_else(|| resolve_style(chunk_score(slice, weights), intervals))
}

/// A chunk made up entirely of non-grade outcomes gets a fixed color: all
/// Undone, all Buried, all Suspended, or a Buried/Suspended mix resolved by
/// majority with ties going to Buried. Never fires on an empty slice.
fn whole_chunk_override(slice: &[OutcomeCode]) -> Option<ChunkStyle> {
    if slice.is_empty() {
        return None;
    }
    if slice.iter().all(|&code| code == OutcomeCode::Undone) {
        return Some(ChunkStyle::solid(ColorKey::Undo));
    }

    let buried = slice
        .iter()
        .filter(|&&code| code == OutcomeCode::Buried)
        .count();
    let suspended = slice
        .iter()
        .filter(|&&code| code == OutcomeCode::Suspended)
        .count();
    if buried + suspended == slice.len() {
        let color = if suspended > buried {
            ColorKey::Suspended
        } else {
            ColorKey::Buried
        };
        return Some(ChunkStyle::solid(color));
    }
    None
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use OutcomeCode::{Again, Buried, Easy, Good, Hard, Suspended, Undone};

    fn custom_weights() -> Weights {
        Weights {
            again: 0.0,
            hard: 1.0,
            good: 2.0,
            easy: 3.0,
        }
    }

    #[test]
    fn all_good_slice_scores_exact_weight() {
        let slice = [Good; 5];
        assert_eq!(chunk_score(&slice, &custom_weights()), 2.0);
    }

    #[test]
    fn empty_slice_scores_good_weight() {
        assert_eq!(chunk_score(&[], &custom_weights()), 2.0);
        assert_eq!(chunk_score(&[], &Weights::graded()), 3.0);
    }

    #[test]
    fn undone_scores_as_fail_and_buried_as_pass() {
        let weights = Weights::graded();
        assert_eq!(chunk_score(&[Undone], &weights), weights.again);
        assert_eq!(chunk_score(&[Buried], &weights), weights.good);
        assert_eq!(chunk_score(&[Suspended], &weights), weights.good);
    }

    #[test]
    fn mean_is_arithmetic() {
        let slice = [Again, Hard, Good, Easy];
        assert_eq!(chunk_score(&slice, &Weights::graded()), 2.5);
    }

    #[test]
    fn stock_table_boundary_scores_take_stripe_rows() {
        let table = default_intervals();

        let at_edge = resolve_style(2.5, &table);
        assert_eq!(at_edge.color, ColorKey::Good);
        assert_eq!(at_edge.pattern, Some(ColorKey::Hard));

        let below = resolve_style(2.49, &table);
        assert_eq!(below.color, ColorKey::Hard);
        assert_eq!(below.pattern, None);

        let above = resolve_style(2.51, &table);
        assert_eq!(above.color, ColorKey::Good);
        assert_eq!(above.pattern, None);
    }

    #[test]
    fn epsilon_absorbs_float_error_at_edges() {
        let table = default_intervals();
        let exact = resolve_style(1.5, &table);
        let nudged = resolve_style(1.5 + 1e-10, &table);
        let shaved = resolve_style(1.5 - 1e-10, &table);
        assert_eq!(exact, nudged);
        assert_eq!(exact, shaved);
        assert_eq!(exact.color, ColorKey::Hard);
        assert_eq!(exact.pattern, Some(ColorKey::Again));
    }

    #[test]
    fn later_matching_row_overrides_earlier() {
        let table = vec![
            Interval::new(Bound::Inclusive, 0.0, 2.0, Bound::Inclusive, ColorKey::Again),
            Interval::new(Bound::Inclusive, 1.0, 3.0, Bound::Inclusive, ColorKey::Hard)
                .with_pattern(ColorKey::Again),
        ];
        let style = resolve_style(1.5, &table);
        assert_eq!(style.color, ColorKey::Hard);
        assert_eq!(style.pattern, Some(ColorKey::Again));
    }

    #[test]
    fn disabled_rows_are_skipped() {
        let table = vec![
            Interval::new(Bound::Inclusive, 0.0, 4.0, Bound::Inclusive, ColorKey::Easy).disabled(),
            Interval::new(Bound::Inclusive, 0.0, 2.0, Bound::Exclusive, ColorKey::Again),
        ];
        assert_eq!(resolve_style(1.0, &table).color, ColorKey::Again);
    }

    #[test]
    fn unmatched_score_falls_back_to_good() {
        let table = vec![Interval::new(
            Bound::Inclusive,
            0.0,
            1.0,
            Bound::Exclusive,
            ColorKey::Again,
        )];
        assert_eq!(resolve_style(9.0, &table), ChunkStyle::solid(ColorKey::Good));
        assert_eq!(resolve_style(9.0, &[]), ChunkStyle::solid(ColorKey::Good));
    }

    #[test]
    fn all_buried_chunk_forces_buried() {
        let style = evaluate_chunk(&[Buried; 4], &Weights::graded(), &default_intervals());
        assert_eq!(style, ChunkStyle::solid(ColorKey::Buried));
    }

    #[test]
    fn all_suspended_chunk_forces_suspended() {
        let style = evaluate_chunk(&[Suspended; 3], &Weights::graded(), &default_intervals());
        assert_eq!(style, ChunkStyle::solid(ColorKey::Suspended));
    }

    #[test]
    fn all_undone_chunk_forces_undo() {
        let style = evaluate_chunk(&[Undone; 2], &Weights::graded(), &default_intervals());
        assert_eq!(style, ChunkStyle::solid(ColorKey::Undo));
    }

    #[test]
    fn buried_suspended_mix_resolves_by_majority() {
        let weights = Weights::graded();
        let table = default_intervals();

        let buried_heavy = [Buried, Buried, Suspended];
        assert_eq!(
            evaluate_chunk(&buried_heavy, &weights, &table),
            ChunkStyle::solid(ColorKey::Buried)
        );

        let suspended_heavy = [Buried, Suspended, Suspended];
        assert_eq!(
            evaluate_chunk(&suspended_heavy, &weights, &table),
            ChunkStyle::solid(ColorKey::Suspended)
        );
    }

    #[test]
    fn buried_suspended_tie_favors_buried() {
        let tie = [Buried, Suspended, Buried, Suspended];
        let style = evaluate_chunk(&tie, &Weights::graded(), &default_intervals());
        assert_eq!(style, ChunkStyle::solid(ColorKey::Buried));
    }

    #[test]
    fn mixed_grade_chunk_is_not_overridden() {
        let slice = [Buried, Good, Good, Good];
        let style = evaluate_chunk(&slice, &Weights::graded(), &default_intervals());
        assert_eq!(style.color, ColorKey::Good);
    }

    #[test]
    fn empty_chunk_evaluates_without_override() {
        let style = evaluate_chunk(&[], &Weights::graded(), &default_intervals());
        assert_eq!(style, ChunkStyle::solid(ColorKey::Good));
    }

    #[test]
    fn interval_round_trips_through_json() {
        let interval = Interval::new(Bound::Exclusive, 1.5, 2.5, Bound::Exclusive, ColorKey::Hard)
            .with_pattern(ColorKey::Again);
        let json = serde_json::to_value(&interval).unwrap();
        assert_eq!(json["start_bracket"], "(");
        assert_eq!(json["end_bracket"], ")");
        assert_eq!(json["color_key"], "hard");
        assert_eq!(json["pattern_key"], "again");

        let back: Interval = serde_json::from_value(json).unwrap();
        assert_eq!(back, interval);
    }

    #[test]
    fn interval_decode_fills_missing_fields() {
        let json = serde_json::json!({
            "start_val": 0.0,
            "end_val": 1.0,
            "color_key": "again",
        });
        let interval: Interval = serde_json::from_value(json).unwrap();
        assert!(interval.enabled);
        assert_eq!(interval.start_bound, Bound::Inclusive);
        assert_eq!(interval.end_bound, Bound::Exclusive);
        assert_eq!(interval.pattern, None);
    }

    #[test]
    fn interval_decode_rejects_unknown_bracket() {
        let json = serde_json::json!({
            "start_bracket": "{",
            "start_val": 0.0,
            "end_val": 1.0,
            "end_bracket": ")",
            "color_key": "again",
        });
        assert!(serde_json::from_value::<Interval>(json).is_err());
    }

    #[test]
    fn color_key_accepts_legacy_aliases() {
        let good: ColorKey = serde_json::from_str("\"done\"").unwrap();
        let again: ColorKey = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(good, ColorKey::Good);
        assert_eq!(again, ColorKey::Again);
        assert_eq!(serde_json::to_string(&ColorKey::Undo).unwrap(), "\"undo\"");
    }
}
