use std::time::Duration;

use serde::Serialize;

use chunkbar_core::{ChunkStyle, TrackerOptions, evaluate_chunk};
use chunkbar_host::QueueCounts;

use crate::state::SessionState;

//
// ─── PRESENTATION SEAM ────────────────────────────────────────────────────────
//

/// Delay between a session mutation and the refresh it requests, giving
/// the host time to finish moving cards between queues.
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Receives assembled frames and user-facing notices.
pub trait ProgressPresenter: Send + Sync {
    fn present(&self, frame: &BarFrame);
    fn notify(&self, message: &str);
}

/// Schedules a deferred refresh on the host's timer.
pub trait RefreshScheduler: Send + Sync {
    fn request_refresh(&self, delay: Duration);
}

//
// ─── BAR FRAME ────────────────────────────────────────────────────────────────
//

/// One render-ready snapshot of both bars: session totals for the progress
/// bar and the evaluated chunk trail for the quality bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarFrame {
    pub completed: u32,
    pub remaining: u32,
    pub total: u32,
    pub initial_total: u32,
    pub chunks: Vec<ChunkSegment>,
}

/// One chunk of the quality trail. The last segment may be shorter than
/// the configured chunk size while its chunk is still in progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkSegment {
    pub style: ChunkStyle,
    pub len: u32,
    pub mean_secs: f64,
}

/// Assembles a frame from the session ledger and live scheduler counts.
///
/// The first assembly of a session fixes `initial_total`; with an
/// acknowledged fail policy, counted fails are subtracted from it because
/// the failed cards come back and do not shrink the remaining work.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn build_frame(
    state: &mut SessionState,
    options: &TrackerOptions,
    counts: QueueCounts,
) -> BarFrame {
    let remaining = if options.double_new {
        counts.new * 2 + counts.learning + counts.review
    } else {
        counts.total()
    };
    let completed = state.count();
    let total = completed + remaining;

    let initial_total = match state.initial_total() {
        Some(fixed) => fixed,
        None => {
            let first = if options.fail_policy.is_acknowledge() {
                let mut fails = 0u32;
                for outcome in state.status_log() {
                    if outcome.is_again() {
                        fails += 1;
                    }
                }
                total.saturating_sub(fails)
            } else {
                total
            };
            state.set_initial_total(first);
            first
        }
    };

    let size = options.chunk_size.max(1) as usize;
    let chunks = state
        .status_log()
        .chunks(size)
        .zip(state.time_log().chunks(size))
        .map(|(statuses, times)| ChunkSegment {
            style: evaluate_chunk(statuses, &options.weights, &options.intervals),
            len: statuses.len() as u32,
            mean_secs: mean(times),
        })
        .collect();

    BarFrame {
        completed,
        remaining,
        total,
        initial_total,
        chunks,
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    use chunkbar_core::{ChunkStyle, ColorKey, EventPolicy, OutcomeCode};

    fn counts(new: u32, learning: u32, review: u32) -> QueueCounts {
        QueueCounts {
            new,
            learning,
            review,
        }
    }

    #[test]
    fn remaining_doubles_new_cards_when_configured() {
        let mut state = SessionState::new();
        let mut options = TrackerOptions::default();

        let frame = build_frame(&mut state, &options, counts(2, 1, 5));
        assert_eq!(frame.remaining, 10);

        let mut state = SessionState::new();
        options.double_new = false;
        let frame = build_frame(&mut state, &options, counts(2, 1, 5));
        assert_eq!(frame.remaining, 8);
    }

    #[test]
    fn initial_total_is_fixed_on_the_first_frame() {
        let mut state = SessionState::new();
        let options = TrackerOptions::default();

        let first = build_frame(&mut state, &options, counts(0, 0, 10));
        assert_eq!(first.initial_total, 10);

        let second = build_frame(&mut state, &options, counts(0, 0, 3));
        assert_eq!(second.total, 3);
        assert_eq!(second.initial_total, 10);
    }

    #[test]
    fn acknowledged_fails_shrink_the_initial_denominator() {
        let mut state = SessionState::new();
        state.replay(OutcomeCode::Again, 12.0);
        state.replay(OutcomeCode::Good, 4.0);
        state.replay(OutcomeCode::Good, 5.0);

        let options = TrackerOptions {
            fail_policy: EventPolicy::Acknowledge,
            ..TrackerOptions::default()
        };

        let frame = build_frame(&mut state, &options, counts(0, 0, 5));
        assert_eq!(frame.total, 8);
        assert_eq!(frame.initial_total, 7);
    }

    #[test]
    fn frame_chunks_follow_the_evaluation_table() {
        let mut state = SessionState::new();
        for _ in 0..10 {
            state.replay(OutcomeCode::Good, 3.0);
        }
        state.replay(OutcomeCode::Again, 20.0);
        state.replay(OutcomeCode::Again, 18.0);

        let options = TrackerOptions::default();
        let frame = build_frame(&mut state, &options, counts(0, 0, 0));

        assert_eq!(frame.chunks.len(), 2);
        assert_eq!(frame.chunks[0].style, ChunkStyle::solid(ColorKey::Good));
        assert_eq!(frame.chunks[0].len, 10);
        assert_eq!(frame.chunks[1].style, ChunkStyle::solid(ColorKey::Again));
        assert_eq!(frame.chunks[1].len, 2);
    }

    #[test]
    fn chunk_seconds_average_the_time_log() {
        let mut state = SessionState::new();
        state.replay(OutcomeCode::Good, 2.0);
        state.replay(OutcomeCode::Good, 4.0);
        state.replay(OutcomeCode::Good, 6.0);

        let options = TrackerOptions {
            chunk_size: 2,
            ..TrackerOptions::default()
        };

        let frame = build_frame(&mut state, &options, counts(0, 0, 0));
        assert_eq!(frame.chunks.len(), 2);
        assert!((frame.chunks[0].mean_secs - 3.0).abs() < f64::EPSILON);
        assert!((frame.chunks[1].mean_secs - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_sessions_produce_no_chunks() {
        let mut state = SessionState::new();
        let options = TrackerOptions::default();

        let frame = build_frame(&mut state, &options, counts(1, 0, 0));
        assert!(frame.chunks.is_empty());
        assert_eq!(frame.completed, 0);
        assert_eq!(frame.total, 2);
    }
}
