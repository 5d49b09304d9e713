// Scheduling tests for the playback path
//
// Runs against a manual clock and a recording sink, so the timing
// arithmetic is checked exactly: units book back-to-back regardless of
// arrival bursts, and interruption drains the backlog and rebases
// scheduling to the present.

use lingua_live::audio::{OutputSink, PlaybackClock, PlaybackScheduler};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
struct ManualClock(Arc<Mutex<Duration>>);

impl ManualClock {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Duration::ZERO)))
    }

    fn set(&self, at: Duration) {
        *self.0.lock().unwrap() = at;
    }
}

impl PlaybackClock for ManualClock {
    fn now(&self) -> Duration {
        *self.0.lock().unwrap()
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    submitted: Arc<Mutex<Vec<usize>>>,
    cancels: Arc<Mutex<usize>>,
}

impl RecordingSink {
    fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    fn cancel_count(&self) -> usize {
        *self.cancels.lock().unwrap()
    }
}

impl OutputSink for RecordingSink {
    fn submit(&mut self, samples: Vec<f32>, _sample_rate: u32) -> anyhow::Result<()> {
        self.submitted.lock().unwrap().push(samples.len());
        Ok(())
    }

    fn cancel_all(&mut self) {
        *self.cancels.lock().unwrap() += 1;
    }
}

const RATE: u32 = 24000;

/// PCM16LE zeros spanning the given number of milliseconds at 24kHz
fn pcm_ms(ms: u64) -> Vec<u8> {
    vec![0u8; (RATE as u64 * ms / 1000) as usize * 2]
}

fn scheduler() -> (PlaybackScheduler, ManualClock, RecordingSink) {
    let clock = ManualClock::new();
    let sink = RecordingSink::default();
    let scheduler = PlaybackScheduler::new(Box::new(clock.clone()), Box::new(sink.clone()), RATE);
    (scheduler, clock, sink)
}

#[test]
fn test_back_to_back_chunks_are_gapless() {
    let (mut scheduler, _clock, sink) = scheduler();

    let first = scheduler.enqueue(&pcm_ms(500)).unwrap();
    let second = scheduler.enqueue(&pcm_ms(250)).unwrap();

    assert_eq!(first.start_at, Duration::ZERO);
    assert_eq!(first.duration, Duration::from_millis(500));
    assert_eq!(second.start_at, first.start_at + first.duration);
    assert_eq!(scheduler.next_start(), Duration::from_millis(750));
    assert_eq!(scheduler.active_units().len(), 2);
    assert_eq!(sink.submit_count(), 2);
}

#[test]
fn test_start_times_never_decrease_across_bursts() {
    let (mut scheduler, clock, _sink) = scheduler();

    let mut starts = Vec::new();
    for (at_ms, chunk_ms) in [(0u64, 100u64), (0, 100), (350, 50), (350, 50), (900, 20)] {
        clock.set(Duration::from_millis(at_ms));
        starts.push(scheduler.enqueue(&pcm_ms(chunk_ms)).unwrap().start_at);
    }

    for pair in starts.windows(2) {
        assert!(pair[1] >= pair[0], "start times must be non-decreasing");
    }
}

#[test]
fn test_enqueue_after_idle_starts_at_now() {
    let (mut scheduler, clock, _sink) = scheduler();

    scheduler.enqueue(&pcm_ms(100)).unwrap();

    // Backlog drained long ago; new chunk starts now rather than at the
    // stale next_start
    clock.set(Duration::from_secs(5));
    let unit = scheduler.enqueue(&pcm_ms(100)).unwrap();

    assert_eq!(unit.start_at, Duration::from_secs(5));
    // The finished unit was reaped
    assert_eq!(scheduler.active_units().len(), 1);
}

#[test]
fn test_interrupt_drains_active_units_and_rebases() {
    let (mut scheduler, clock, sink) = scheduler();

    scheduler.enqueue(&pcm_ms(1000)).unwrap();
    scheduler.enqueue(&pcm_ms(1000)).unwrap();

    clock.set(Duration::from_millis(300));
    scheduler.interrupt();

    assert!(scheduler.active_units().is_empty());
    assert_eq!(scheduler.next_start(), Duration::from_millis(300));
    assert_eq!(sink.cancel_count(), 1);
}

#[test]
fn test_enqueue_after_interrupt_ignores_stale_backlog() {
    let (mut scheduler, clock, _sink) = scheduler();

    scheduler.enqueue(&pcm_ms(10_000)).unwrap();

    clock.set(Duration::from_millis(400));
    scheduler.interrupt();

    let unit = scheduler.enqueue(&pcm_ms(100)).unwrap();

    // No stale backlog survives: the new unit starts at interrupt time,
    // not behind the discarded 10s unit
    assert!(unit.start_at >= Duration::from_millis(400));
    assert_eq!(unit.start_at, Duration::from_millis(400));
}

#[test]
fn test_shutdown_is_idempotent() {
    let (mut scheduler, _clock, sink) = scheduler();

    scheduler.enqueue(&pcm_ms(500)).unwrap();

    scheduler.shutdown();
    scheduler.shutdown();

    assert!(scheduler.active_units().is_empty());
    assert_eq!(sink.cancel_count(), 2); // halting an empty set is a no-op in effect
}

#[test]
fn test_empty_payload_is_rejected() {
    let (mut scheduler, _clock, _sink) = scheduler();

    assert!(scheduler.enqueue(&[]).is_err());
    assert!(scheduler.active_units().is_empty());
    assert_eq!(scheduler.next_start(), Duration::ZERO);
}

#[test]
fn test_reap_keeps_still_playing_units() {
    let (mut scheduler, clock, _sink) = scheduler();

    scheduler.enqueue(&pcm_ms(100)).unwrap();
    scheduler.enqueue(&pcm_ms(100)).unwrap();

    // First unit done, second mid-play
    clock.set(Duration::from_millis(150));
    scheduler.reap();

    assert_eq!(scheduler.active_units().len(), 1);
    assert_eq!(
        scheduler.active_units()[0].start_at,
        Duration::from_millis(100)
    );
}
