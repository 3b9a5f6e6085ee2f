//! Tests for the off-thread annotation worker

use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::AnnotateError;
use crate::scanner::{
    MatchingConfig, Role, RoleKind, RoleRegistry, Segment, TextRange, UnicodeWordSegmenter,
    WordSegmenter, WorkerHandle,
};

/// Segmenter that stalls before delegating, to force timeouts
struct SlowSegmenter(Duration);

impl WordSegmenter for SlowSegmenter {
    fn segments(&self, text: &str) -> Vec<Segment> {
        thread::sleep(self.0);
        UnicodeWordSegmenter.segments(text)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn registry(version: u64) -> RoleRegistry {
    RoleRegistry::new(
        version,
        vec![
            Role::new("Frodo", RoleKind::Character),
            Role::regex("digits", r"\d+"),
        ],
    )
}

#[test]
fn test_build_then_search() {
    init_tracing();
    let worker = WorkerHandle::spawn().unwrap();
    let built = worker.build(registry(1)).unwrap();
    assert_eq!(built.version, 1);
    assert!(built.rebuilt);

    let found = worker.search("Frodo has 3 rings", MatchingConfig::default()).unwrap();
    assert_eq!(found.version, Some(1));
    assert_eq!(found.annotation.occurrences_by_role["Frodo"], vec![TextRange::new(0, 5)]);
    assert_eq!(found.annotation.occurrences_by_role["digits"], vec![TextRange::new(10, 11)]);
}

#[test]
fn test_search_before_build_is_empty() {
    let worker = WorkerHandle::spawn().unwrap();
    let found = worker.search("Frodo", MatchingConfig::default()).unwrap();
    assert_eq!(found.version, None);
    assert!(found.annotation.is_empty());
}

#[test]
fn test_same_version_build_is_noop() {
    let worker = WorkerHandle::spawn().unwrap();
    assert!(worker.build(registry(2)).unwrap().rebuilt);
    assert!(!worker.build(registry(2)).unwrap().rebuilt);
    assert!(worker.build(registry(3)).unwrap().rebuilt);
}

#[test]
fn test_request_ids_are_unique() {
    let worker = WorkerHandle::spawn().unwrap();
    let a = worker.build(registry(1)).unwrap();
    let b = worker.search("x", MatchingConfig::default()).unwrap();
    let c = worker.search("y", MatchingConfig::default()).unwrap();
    assert!(a.id < b.id && b.id < c.id);
}

#[test]
fn test_slow_search_times_out_and_cancels() {
    init_tracing();
    let mut worker = WorkerHandle::spawn_with(SlowSegmenter(Duration::from_millis(300)), Duration::from_secs(10)).unwrap();
    worker
        .build(RoleRegistry::new(1, vec![Role::new("a", RoleKind::Vocabulary)]))
        .unwrap();
    worker.set_timeout(Duration::from_millis(20));

    let cancel = CancellationToken::new();
    let err = worker
        .search_with_cancel("a", MatchingConfig::default(), cancel.clone())
        .unwrap_err();

    assert!(matches!(err, AnnotateError::Timeout { .. }));
    assert!(cancel.is_cancelled());
}

#[test]
fn test_worker_stays_usable_after_timeout() {
    let mut worker = WorkerHandle::spawn_with(SlowSegmenter(Duration::from_millis(100)), Duration::from_secs(10)).unwrap();
    worker
        .build(RoleRegistry::new(1, vec![Role::new("a", RoleKind::Vocabulary)]))
        .unwrap();

    worker.set_timeout(Duration::from_millis(1));
    let err = worker.search("a", MatchingConfig::default()).unwrap_err();
    assert!(matches!(err, AnnotateError::Timeout { .. }));

    // Queued behind the abandoned search; no short hits, so no stall of its own
    worker.set_timeout(Duration::from_secs(10));
    let found = worker.search("bbb", MatchingConfig::default()).unwrap();
    assert!(found.annotation.is_empty());
    assert_eq!(found.version, Some(1));
}

#[test]
fn test_shutdown_disconnects() {
    let worker = WorkerHandle::spawn().unwrap();
    worker.build(registry(1)).unwrap();
    worker.shutdown();

    let err = worker.search("Frodo", MatchingConfig::default()).unwrap_err();
    assert_eq!(err, AnnotateError::WorkerDisconnected);
}
