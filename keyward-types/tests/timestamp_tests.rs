use keyward_types::{Clock, ManualClock, SystemClock, Timestamp};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

// ── Timestamp ─────────────────────────────────────────────────────

#[test]
fn timestamp_ordering_follows_millis() {
    let a = Timestamp::from_millis(100);
    let b = Timestamp::from_millis(200);
    assert!(a < b);
    assert_eq!(a.offset_millis(100), b);
}

#[test]
fn timestamp_datetime_roundtrip() {
    let ts = Timestamp::from_millis(1_700_000_000_123);
    let dt = ts.to_datetime();
    assert_eq!(Timestamp::from(dt), ts);
}

#[test]
fn timestamp_display_is_utc_datetime() {
    let ts = Timestamp::from_millis(0);
    assert_eq!(ts.to_string(), "1970-01-01 00:00:00.000");
}

#[test]
fn wall_is_after_2020() {
    assert!(Timestamp::wall().as_millis() > 1_577_836_800_000);
}

// ── SystemClock ───────────────────────────────────────────────────

#[test]
fn system_clock_is_strictly_increasing() {
    let clock = SystemClock::new();
    let mut prev = clock.now();
    for _ in 0..1_000 {
        let next = clock.now();
        assert!(next > prev);
        prev = next;
    }
}

#[test]
fn system_clock_is_unique_across_threads() {
    let clock = Arc::new(SystemClock::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let clock = Arc::clone(&clock);
            thread::spawn(move || (0..250).map(|_| clock.now()).collect::<Vec<_>>())
        })
        .collect();

    let mut all: Vec<Timestamp> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let total = all.len();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), total);
}

// ── ManualClock ───────────────────────────────────────────────────

#[test]
fn manual_clock_steps_per_read() {
    let clock = ManualClock::starting_at(Timestamp::from_millis(10_000));
    assert_eq!(clock.now(), Timestamp::from_millis(10_000));
    assert_eq!(clock.now(), Timestamp::from_millis(11_000));
    assert_eq!(clock.peek(), Timestamp::from_millis(12_000));
}

#[test]
fn manual_clock_advance() {
    let clock = ManualClock::with_step(Timestamp::from_millis(0), 1);
    clock.advance(500);
    assert_eq!(clock.now(), Timestamp::from_millis(500));
}

#[test]
fn manual_clock_zero_step_still_advances() {
    let clock = ManualClock::with_step(Timestamp::from_millis(0), 0);
    let a = clock.now();
    let b = clock.now();
    assert!(b > a);
}

proptest! {
    #[test]
    fn offset_is_reversible(start in -1_000_000_000i64..1_000_000_000, delta in -1_000_000i64..1_000_000) {
        let ts = Timestamp::from_millis(start);
        prop_assert_eq!(ts.offset_millis(delta).offset_millis(-delta), ts);
    }
}
