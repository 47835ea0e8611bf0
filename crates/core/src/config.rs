//! Layered configuration: nested-path resolution over a user document and
//! the shipped defaults, plus the typed options decoded from them.

use serde_json::{Value, json};

use crate::evaluation::{Bound, ColorKey, Interval, Weights, default_intervals};

//
// ─── PATH RESOLUTION ───────────────────────────────────────────────────────────
//

/// One step of a nested lookup path: an object key or an array index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSeg<'a> {
    Key(&'a str),
    Index(usize),
}

fn step<'v>(value: &'v Value, seg: PathSeg<'_>) -> Option<&'v Value> {
    match seg {
        PathSeg::Key(key) => value.as_object()?.get(key),
        PathSeg::Index(index) => value.as_array()?.get(index),
    }
}

/// Walks `path` through both documents in parallel and returns the user's
/// value when it resolved to something non-null, the default's otherwise.
///
/// The cursors advance independently, so a user document that goes off-path
/// early (missing key, wrong shape, explicit null) still lets deeper
/// defaults through. `None` means neither document had a usable value;
/// lookup never fails louder than that.
#[must_use]
pub fn resolve<'v>(user: &'v Value, defaults: &'v Value, path: &[PathSeg<'_>]) -> Option<&'v Value> {
    let mut over = Some(user);
    let mut base = Some(defaults);
    for &seg in path {
        over = over.and_then(|value| step(value, seg));
        base = base.and_then(|value| step(value, seg));
    }
    over.filter(|value| !value.is_null())
        .or_else(|| base.filter(|value| !value.is_null()))
}

/// Borrowed user-plus-defaults pair for repeated lookups.
#[derive(Debug, Clone, Copy)]
pub struct ConfigView<'v> {
    user: &'v Value,
    defaults: &'v Value,
}

impl<'v> ConfigView<'v> {
    #[must_use]
    pub fn new(user: &'v Value, defaults: &'v Value) -> Self {
        Self { user, defaults }
    }

    /// See [`resolve`].
    #[must_use]
    pub fn get(&self, path: &[PathSeg<'_>]) -> Option<&'v Value> {
        resolve(self.user, self.defaults, path)
    }

    fn bool_at(&self, path: &[PathSeg<'_>], fallback: bool) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(fallback)
    }

    fn f64_at(&self, path: &[PathSeg<'_>], fallback: f64) -> f64 {
        self.get(path).and_then(Value::as_f64).unwrap_or(fallback)
    }

    fn u32_at(&self, path: &[PathSeg<'_>], fallback: u32) -> u32 {
        self.get(path)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(fallback)
    }

    fn str_at(&self, path: &[PathSeg<'_>]) -> Option<&'v str> {
        self.get(path).and_then(Value::as_str)
    }
}

//
// ─── POLICIES ──────────────────────────────────────────────────────────────────
//

/// Whether a fail/bury/suspend event advances the session logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPolicy {
    #[default]
    Ignore,
    Acknowledge,
}

impl EventPolicy {
    /// `"count"` is the pre-rename spelling of acknowledge; anything
    /// unrecognized falls back to ignore.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "acknowledge" | "count" => Self::Acknowledge,
            _ => Self::Ignore,
        }
    }

    #[must_use]
    pub fn is_acknowledge(self) -> bool {
        matches!(self, Self::Acknowledge)
    }
}

/// How an undo event rewrites the session logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndoPolicy {
    /// Pop the latest snapshot and restore it (classic undo).
    #[default]
    Undo,
    /// Keep the count; rewrite the last entry to `Undone` instead.
    Acknowledge,
}

impl UndoPolicy {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "acknowledge" => Self::Acknowledge,
            _ => Self::Undo,
        }
    }

    #[must_use]
    pub fn is_acknowledge(self) -> bool {
        matches!(self, Self::Acknowledge)
    }
}

//
// ─── TRACKER OPTIONS ───────────────────────────────────────────────────────────
//

/// The decoded option set the tracker works from.
///
/// Decoding never fails: every field degrades to its shipped default when
/// the documents are missing, malformed, or out of range.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerOptions {
    pub chunk_size: u32,
    pub fail_policy: EventPolicy,
    pub bury_policy: EventPolicy,
    pub suspend_policy: EventPolicy,
    pub undo_policy: UndoPolicy,
    pub double_new: bool,
    pub use_capped_duration: bool,
    pub weights: Weights,
    pub intervals: Vec<Interval>,
    pub fsrs_retention: f64,
    pub fsrs_use_deck: bool,
    pub fsrs_auto_chunk: bool,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            fail_policy: EventPolicy::Ignore,
            bury_policy: EventPolicy::Ignore,
            suspend_policy: EventPolicy::Ignore,
            undo_policy: UndoPolicy::Undo,
            double_new: true,
            use_capped_duration: true,
            weights: Weights::graded(),
            intervals: default_intervals(),
            fsrs_retention: 0.9,
            fsrs_use_deck: false,
            fsrs_auto_chunk: false,
        }
    }
}

impl TrackerOptions {
    /// Decodes options from a user document layered over the given defaults.
    #[must_use]
    pub fn from_documents(user: &Value, defaults: &Value) -> Self {
        let view = ConfigView::new(user, defaults);
        let fallback = Self::default();

        let chunk_size = view
            .u32_at(&[PathSeg::Key("chunk_size")], fallback.chunk_size)
            .max(1);

        let policy = |key: &str, fallback: EventPolicy| {
            view.str_at(&[PathSeg::Key(key)])
                .map_or(fallback, EventPolicy::parse)
        };

        let mut fsrs_retention = view.f64_at(
            &[PathSeg::Key("fsrs_retention")],
            fallback.fsrs_retention,
        );
        if !(0.0..=1.0).contains(&fsrs_retention) {
            fsrs_retention = fallback.fsrs_retention;
        }

        Self {
            chunk_size,
            fail_policy: policy("fail_policy", fallback.fail_policy),
            bury_policy: policy("bury_policy", fallback.bury_policy),
            suspend_policy: policy("suspend_policy", fallback.suspend_policy),
            undo_policy: view
                .str_at(&[PathSeg::Key("undo_policy")])
                .map_or(fallback.undo_policy, UndoPolicy::parse),
            double_new: view.bool_at(&[PathSeg::Key("double_new")], fallback.double_new),
            use_capped_duration: view.bool_at(
                &[PathSeg::Key("timer"), PathSeg::Key("use_anki_cap")],
                fallback.use_capped_duration,
            ),
            weights: decode_weights(&view, fallback.weights),
            intervals: decode_intervals(&view),
            fsrs_retention,
            fsrs_use_deck: view.bool_at(&[PathSeg::Key("fsrs_use_deck")], fallback.fsrs_use_deck),
            fsrs_auto_chunk: view.bool_at(
                &[PathSeg::Key("fsrs_auto_chunk")],
                fallback.fsrs_auto_chunk,
            ),
        }
    }

    /// Decodes options against the shipped defaults.
    #[must_use]
    pub fn from_value(user: &Value) -> Self {
        Self::from_documents(user, &default_config())
    }
}

fn decode_weights(view: &ConfigView<'_>, fallback: Weights) -> Weights {
    let weight = |key: &str, fallback: f64| {
        view.f64_at(
            &[
                PathSeg::Key("chunk_evaluation"),
                PathSeg::Key("weights"),
                PathSeg::Key(key),
            ],
            fallback,
        )
    };
    Weights {
        again: weight("again", fallback.again),
        hard: weight("hard", fallback.hard),
        good: weight("good", fallback.good),
        easy: weight("easy", fallback.easy),
    }
}

/// Decodes the interval table row by row, resolving every field through the
/// user/default layering so a sparse user row keeps its defaulted siblings.
/// Rows that lack a usable range or color in both documents are dropped; a
/// table that comes out empty is replaced by the stock ladder.
fn decode_intervals(view: &ConfigView<'_>) -> Vec<Interval> {
    let table_len = |doc: &Value| {
        doc.get("chunk_evaluation")
            .and_then(|section| section.get("intervals"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    };
    let rows = table_len(view.user).max(table_len(view.defaults));

    let mut intervals = Vec::with_capacity(rows);
    for row in 0..rows {
        if let Some(interval) = decode_interval_row(view, row) {
            intervals.push(interval);
        }
    }
    if intervals.is_empty() {
        default_intervals()
    } else {
        intervals
    }
}

fn decode_interval_row(view: &ConfigView<'_>, row: usize) -> Option<Interval> {
    let field = |name: &'static str| {
        view.get(&[
            PathSeg::Key("chunk_evaluation"),
            PathSeg::Key("intervals"),
            PathSeg::Index(row),
            PathSeg::Key(name),
        ])
    };
    let color = |name: &'static str| {
        field(name).and_then(|value| serde_json::from_value::<ColorKey>(value.clone()).ok())
    };

    let start = field("start_val").and_then(Value::as_f64)?;
    let end = field("end_val").and_then(Value::as_f64)?;
    let start_bound = match field("start_bracket").and_then(Value::as_str) {
        Some("(") => Bound::Exclusive,
        _ => Bound::Inclusive,
    };
    let end_bound = match field("end_bracket").and_then(Value::as_str) {
        Some("]") => Bound::Inclusive,
        _ => Bound::Exclusive,
    };

    Some(Interval {
        enabled: field("enabled").and_then(Value::as_bool).unwrap_or(true),
        start,
        start_bound,
        end,
        end_bound,
        color: color("color_key")?,
        pattern: color("pattern_key"),
    })
}

//
// ─── SHIPPED DEFAULTS ──────────────────────────────────────────────────────────
//

/// The defaults document the user configuration is layered over.
#[must_use]
pub fn default_config() -> Value {
    json!({
        "chunk_size": 10,
        "fail_policy": "ignore",
        "bury_policy": "ignore",
        "suspend_policy": "ignore",
        "undo_policy": "undo",
        "double_new": true,
        "timer": {
            "use_anki_cap": true
        },
        "chunk_evaluation": {
            "weights": {
                "again": 1.0,
                "hard": 2.0,
                "good": 3.0,
                "easy": 4.0
            },
            "intervals": [
                { "enabled": true, "start_bracket": "[", "start_val": 1.0, "end_val": 1.5, "end_bracket": ")", "color_key": "again", "pattern_key": null },
                { "enabled": true, "start_bracket": "[", "start_val": 1.5, "end_val": 1.5, "end_bracket": "]", "color_key": "hard", "pattern_key": "again" },
                { "enabled": true, "start_bracket": "(", "start_val": 1.5, "end_val": 2.5, "end_bracket": ")", "color_key": "hard", "pattern_key": null },
                { "enabled": true, "start_bracket": "[", "start_val": 2.5, "end_val": 2.5, "end_bracket": "]", "color_key": "good", "pattern_key": "hard" },
                { "enabled": true, "start_bracket": "(", "start_val": 2.5, "end_val": 3.5, "end_bracket": ")", "color_key": "good", "pattern_key": null },
                { "enabled": true, "start_bracket": "[", "start_val": 3.5, "end_val": 3.5, "end_bracket": "]", "color_key": "easy", "pattern_key": "good" },
                { "enabled": true, "start_bracket": "(", "start_val": 3.5, "end_val": 4.0, "end_bracket": "]", "color_key": "easy", "pattern_key": null }
            ]
        },
        "fsrs_retention": 0.9,
        "fsrs_use_deck": false,
        "fsrs_auto_chunk": false
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
