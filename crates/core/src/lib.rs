//! Core domain for the dual progress bar: review outcome modeling, chunk
//! evaluation, retention calibration, and layered configuration.

#![forbid(unsafe_code)]

pub mod calibration;
pub mod config;
pub mod evaluation;
pub mod model;
pub mod time;

pub use calibration::{Calibration, CalibrationError, calibrate};
pub use config::{
    ConfigView, EventPolicy, PathSeg, TrackerOptions, UndoPolicy, default_config, resolve,
};
pub use evaluation::{
    Bound, ChunkStyle, ColorKey, Interval, IntervalError, SCORE_EPSILON, Weights, chunk_score,
    default_intervals, evaluate_chunk, resolve_style,
};
pub use model::{
    CardId, CardQueue, DeckId, OutcomeCode, OutcomeError, ParseIdError, RevlogEntry, RevlogId,
};
pub use time::{Clock, FIXED_TEST_TIMESTAMP, fixed_clock, fixed_now};
