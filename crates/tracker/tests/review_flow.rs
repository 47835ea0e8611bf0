use std::sync::{Arc, Mutex};

use chrono::Duration;

use chunkbar_core::{CardId, CardQueue, ColorKey, DeckId, default_config, fixed_clock, fixed_now};
use chunkbar_host::{Host, InMemoryHost};
use chunkbar_tracker::{
    BarFrame, ProgressPresenter, RefreshScheduler, ReviewTracker, SETTLE_DELAY, Screen,
};

#[derive(Default)]
struct FrameSink {
    frames: Mutex<Vec<BarFrame>>,
    notices: Mutex<Vec<String>>,
}

impl ProgressPresenter for FrameSink {
    fn present(&self, frame: &BarFrame) {
        self.frames.lock().unwrap().push(frame.clone());
    }

    fn notify(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_owned());
    }
}

#[derive(Default)]
struct SettleTimer {
    delays: Mutex<Vec<std::time::Duration>>,
}

impl RefreshScheduler for SettleTimer {
    fn request_refresh(&self, delay: std::time::Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

#[test]
fn review_pass_with_an_undo_keeps_both_bars_consistent() {
    let backend = InMemoryHost::new();
    backend.set_config(default_config());
    backend.add_deck(DeckId::new(1), "Smoke");
    backend.select_deck(Some(DeckId::new(1)));
    for id in [10, 11, 12] {
        backend.add_card(CardId::new(id), DeckId::new(1), CardQueue::Review);
    }
    backend.set_counts(0, 0, 3);
    backend.set_day_cutoff(fixed_now() + Duration::hours(8));
    backend.set_time_taken(CardId::new(10), 6_000);
    backend.set_time_taken(CardId::new(12), 3_000);

    let presenter = Arc::new(FrameSink::default());
    let scheduler = Arc::new(SettleTimer::default());
    let mut tracker = ReviewTracker::new(
        Host::from_memory(backend.clone()),
        presenter.clone(),
        scheduler.clone(),
    )
    .unwrap()
    .with_clock(fixed_clock());

    tracker.state_changed(Screen::Review).unwrap();

    // Good, an ignored Again, then Easy.
    for (card, ease) in [(10, 3), (11, 1), (12, 4)] {
        tracker.question_shown(CardId::new(card));
        tracker.answered(CardId::new(card), ease);
    }
    backend.set_counts(0, 0, 1);
    tracker.refresh_now();

    // One deferred refresh from entering review, one per answer.
    {
        let delays = scheduler.delays.lock().unwrap();
        assert_eq!(delays.len(), 4);
        assert!(delays.iter().all(|delay| *delay == SETTLE_DELAY));
    }

    let frame = presenter.frames.lock().unwrap().last().cloned().unwrap();
    assert_eq!(frame.completed, 2);
    assert_eq!(frame.remaining, 1);
    assert_eq!(frame.total, 3);
    assert_eq!(frame.initial_total, 3);
    assert_eq!(frame.chunks.len(), 1);
    let segment = &frame.chunks[0];
    assert_eq!(segment.len, 2);
    assert!((segment.mean_secs - 4.5).abs() < 1e-9);
    assert_eq!(segment.style.color, ColorKey::Easy);
    assert_eq!(segment.style.pattern, Some(ColorKey::Good));

    tracker.undone();
    tracker.refresh_now();

    let frame = presenter.frames.lock().unwrap().last().cloned().unwrap();
    assert_eq!(frame.completed, 1);
    assert_eq!(frame.total, 2);
    assert_eq!(frame.initial_total, 3);
    assert_eq!(frame.chunks[0].style.color, ColorKey::Good);
    assert_eq!(frame.chunks[0].style.pattern, None);
    assert!(presenter.notices.lock().unwrap().is_empty());
}
