//! Session tracking for the dual progress bar: the review ledger, rebuilds
//! from the persisted review log, frame assembly, and FSRS-driven
//! recalibration of the coloring table.

#![forbid(unsafe_code)]

pub mod fsrs;
pub mod reconstruct;
pub mod refresh;
pub mod state;
pub mod tracker;

pub use fsrs::{CalibrationUpdate, apply_deck_calibration, average_retention};
pub use reconstruct::{RECONCILE_WINDOW_MS, rebuild};
pub use refresh::{
    BarFrame, ChunkSegment, ProgressPresenter, RefreshScheduler, SETTLE_DELAY, build_frame,
};
pub use state::{ManualAction, ManualKind, SessionState};
pub use tracker::{ReviewTracker, Screen, TrackerError};
