use echoprobe_core::Builder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// The fatal-error path needs no network or privilege: resolution fails
// before any socket is opened or packet sent.

#[test]
fn test_unresolvable_target_fails_fast() {
    let report = Builder::new("no..such..host")
        .count(5)
        .build()
        .unwrap()
        .run();
    assert_eq!(None, report.addr);
    assert_eq!(1, report.results.len());
    let result = &report.results[0];
    assert_eq!(0, result.sequence.0);
    assert!(!result.success);
    assert_eq!(None, result.round_trip);
    let stats = report.statistics();
    assert_eq!(1, stats.sent());
    assert_eq!(0, stats.received());
    assert!((stats.loss_pct() - 100.0).abs() < f64::EPSILON);
}

#[test]
fn test_results_are_delivered_to_the_callback() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let report = Builder::new("no..such..host")
        .build()
        .unwrap()
        .run_with(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    assert_eq!(report.results.len(), seen.load(Ordering::SeqCst));
}

#[test]
fn test_unresolvable_target_spawn_and_wait() {
    let handle = Builder::new("no..such..host")
        .build()
        .unwrap()
        .spawn_with(|_| {})
        .unwrap();
    let report = handle.wait().unwrap();
    assert_eq!(1, report.results.len());
    assert!(!report.results[0].success);
}
