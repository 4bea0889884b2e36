//! Invocation protocol scenarios: basic calls, keyword handling and failure
//! propagation through the observer.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::fake_pyplot;
use mplot::runtime::RuntimeBackend;
use mplot::{args, build_keyword, invoke, kwargs, FailureKind, Pyplot, NO_KWARGS};

#[test]
fn basic_call_round_trips_a_title() {
    let fake = fake_pyplot();
    let pyplot = Pyplot::attach(&fake.runtime).unwrap();
    let mut fig = pyplot.figure().unwrap();

    let ax = fig.axes0();
    let result = invoke(ax.object(), "set_title", args!["hello"], kwargs![]).unwrap();
    assert!(!result.truthy()); // returns the foreign None

    let title = invoke(ax.object(), "get_title", args![], kwargs![]).unwrap();
    assert_eq!(title.to_text().as_deref(), Some("hello"));
}

#[test]
fn keyword_interleaving_builds_exactly_the_declared_entries() {
    let fake = fake_pyplot();
    let dict = build_keyword(&fake.runtime, kwargs!["a" => 1i64, "b" => "x"])
        .unwrap()
        .unwrap();

    let entries = fake.mock.dict_entries(dict.raw());
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "a");
    assert_eq!(fake.mock.as_int(entries[0].1), Some(1));
    assert_eq!(entries[1].0, "b");
    assert_eq!(fake.mock.as_str(entries[1].1).as_deref(), Some("x"));
}

#[test]
fn empty_kwargs_behaves_like_omitted_kwargs() {
    let fake = fake_pyplot();
    let pyplot = Pyplot::attach(&fake.runtime).unwrap();
    let mut fig = pyplot.figure().unwrap();
    let ax = fig.axes0();

    // The sentinel is not an error, and both spellings produce the same
    // foreign call result.
    assert!(build_keyword(&fake.runtime, NO_KWARGS).unwrap().is_none());
    ax.plot(&[3.0, 4.0, 5.0], kwargs![]).unwrap();
    ax.plot(&[3.0, 4.0, 5.0], NO_KWARGS).unwrap();
}

#[test]
fn missing_method_notifies_the_observer_exactly_once() {
    let fake = fake_pyplot();
    let pyplot = Pyplot::attach(&fake.runtime).unwrap();
    let mut fig = pyplot.figure().unwrap();
    let ax = fig.axes0();

    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    let _guard = fake.runtime.scoped_observer(Arc::new(move |report| {
        assert_eq!(report.kind, FailureKind::Call);
        assert!(report
            .diagnostic
            .as_deref()
            .unwrap_or_default()
            .contains("set_theme"));
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    let err = invoke(ax.object(), "set_theme", args!["dark"], kwargs![]).unwrap_err();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(err.to_string().contains("set_theme"));

    // The sticky foreign error was cleared before the host error surfaced;
    // unrelated calls keep working.
    assert!(!fake.mock.error_pending());
    ax.set_title("still alive").unwrap();
}

#[test]
fn capturing_observer_turns_failures_into_flags() {
    let fake = fake_pyplot();
    let pyplot = Pyplot::attach(&fake.runtime).unwrap();
    let mut fig = pyplot.figure().unwrap();

    let failed = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&failed);
    let _guard = fake.runtime.scoped_observer(Arc::new(move |_report| {
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    // Mismatched parallel sequences: a call failure, not a crash.
    let result = fig.axes0().bar_xy(&["a", "b"], &[3i64, 2, 4], kwargs![]);
    assert!(result.is_err());
    assert_eq!(failed.load(Ordering::SeqCst), 1);
}

#[test]
fn mismatched_tick_labels_surface_as_call_failure() {
    let fake = fake_pyplot();
    let pyplot = Pyplot::attach(&fake.runtime).unwrap();
    let mut fig = pyplot.figure().unwrap();
    let _quiet = fake.runtime.scoped_observer(Arc::new(|_| {}));

    let err = fig
        .axes0()
        .set_y_ticks(&[4.0], kwargs!["labels" => vec!["M", "N"]])
        .unwrap_err();
    assert!(err
        .diagnostic()
        .unwrap_or_default()
        .contains("number of labels"));
}

#[test]
fn duplicate_keys_resolve_last_write_wins() {
    let fake = fake_pyplot();
    let dict = build_keyword(
        &fake.runtime,
        kwargs!["color" => "red", "color" => "blue"],
    )
    .unwrap()
    .unwrap();

    let entries = fake.mock.dict_entries(dict.raw());
    assert_eq!(entries.len(), 1);
    assert_eq!(fake.mock.as_str(entries[0].1).as_deref(), Some("blue"));
}
