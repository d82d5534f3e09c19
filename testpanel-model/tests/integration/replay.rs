// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use color_eyre::eyre::{Result, ensure};
use indoc::indoc;
use pretty_assertions::assert_eq;
use testpanel_model::{
    config::ReporterConfig,
    events::{ReporterEvent, read_event_log},
    log::{Instrument, LogId},
    runnable::{AttemptId, RunnableId},
    store::Store,
    test::TestState,
};

/// A recorded run of two tests, one event per line. `r2` fails once and passes on retry, and `r3`
/// fails on every attempt.
const FLAKY_RUN: &str = indoc! {r#"
    {"type": "runnables-ready", "props": {"tests": [{"id": "r2", "title": "loads the dashboard", "level": 1, "retries": 1}, {"id": "r3", "title": "saves settings", "level": 1, "retries": 1}]}}
    {"type": "test-started", "props": {"id": "r2", "hooks": [{"hookId": "h1", "hookName": "test body"}]}}
    {"type": "log-added", "props": {"id": 1, "testId": "r2", "instrument": "command", "hookId": "h1", "name": "visit", "state": "passed"}}
    {"type": "log-added", "props": {"id": 2, "testId": "r2", "instrument": "command", "hookId": "h1", "name": "get"}}
    {"type": "log-changed", "props": {"id": 2, "testId": "r2", "instrument": "command", "state": "failed", "err": {"name": "AssertionError", "message": "Timed out retrying"}}}
    {"type": "test-finished", "props": {"id": "r2", "retries": 1, "state": "failed", "err": {"name": "AssertionError", "message": "Timed out retrying"}}}
    {"type": "test-started", "props": {"id": "r2", "currentRetry": 1, "retries": 1}}
    {"type": "log-added", "props": {"id": 3, "testId": "r2", "testCurrentRetry": 1, "instrument": "route", "name": "GET /api/widgets"}}
    {"type": "log-added", "props": {"id": 4, "testId": "r2", "testCurrentRetry": 1, "instrument": "command", "name": "get", "state": "passed"}}
    {"type": "test-finished", "props": {"id": "r2", "currentRetry": 1, "retries": 1, "state": "passed"}}
    {"type": "test-started", "props": {"id": "r3"}}
    {"type": "test-finished", "props": {"id": "r3", "retries": 1, "state": "failed", "err": {"message": "first"}}}
    {"type": "test-started", "props": {"id": "r3", "currentRetry": 1, "retries": 1}}
    {"type": "test-finished", "props": {"id": "r3", "currentRetry": 1, "retries": 1, "state": "failed", "err": {"name": "Error", "message": "second"}}}
"#};

fn replay(input: &str) -> Result<Store> {
    let mut store = Store::new(ReporterConfig::default());
    for event in read_event_log(input.as_bytes())? {
        store.apply(&event)?;
    }
    Ok(store)
}

#[test]
fn replay_flaky_run() -> Result<()> {
    let store = replay(FLAKY_RUN)?;
    ensure!(!store.has_single_test(), "two tests were loaded");

    let flaky = store
        .test(&RunnableId::new("r2"))
        .expect("r2 was loaded");
    assert_eq!(flaky.state(), TestState::Passed);
    assert!(flaky.is_finished());
    assert!(flaky.has_retried());
    assert!(!flaky.is_active());
    assert!(!flaky.is_open(), "passing tests are closed");
    assert!(flaky.err().is_empty());

    let first = flaky
        .get_attempt_by_index(AttemptId(0))
        .expect("first attempt exists");
    assert_eq!(first.state(), TestState::Failed);
    assert_eq!(
        first.command_matching_err().map(|command| command.id()),
        Some(LogId(2))
    );
    assert!(!flaky.is_attempt_open(AttemptId(0)));
    assert!(flaky.is_attempt_open(AttemptId(1)));

    let second = flaky
        .get_attempt_by_index(AttemptId(1))
        .expect("retry exists");
    assert_eq!(second.logs(Instrument::Route).count(), 1);
    assert_eq!(second.logs(Instrument::Command).count(), 1);
    assert!(second.duration().is_some());

    let failing = store
        .test(&RunnableId::new("r3"))
        .expect("r3 was loaded");
    assert_eq!(failing.state(), TestState::Failed);
    assert!(failing.is_open(), "failed tests are open");
    assert!(!failing.has_retried());
    assert_eq!(failing.err().display_message(), "Error: second");

    Ok(())
}

#[test]
fn summary_serializes_as_camel_case() -> Result<()> {
    let store = replay(FLAKY_RUN)?;
    let json = serde_json::to_value(store.summary())?;

    assert_eq!(
        json[0],
        serde_json::json!({
            "id": "r2",
            "title": "loads the dashboard",
            "state": "passed",
            "attempts": [0, 1],
            "isOpen": false,
            "hasRetried": true,
            "isFinished": true,
            "isLongRunning": false,
        })
    );
    assert_eq!(json[1]["err"], "Error: second");
    Ok(())
}

#[test]
fn toggling_overrides_auto_open() -> Result<()> {
    let mut store = replay(FLAKY_RUN)?;
    let id = RunnableId::new("r3");

    let test = store.test_mut(&id).expect("r3 was loaded");
    test.toggle_open();
    assert!(!test.is_open());

    // A later failure doesn't reopen a test the user closed.
    store.apply(&ReporterEvent::TestFinished(
        serde_json::from_str(r#"{"id": "r3", "currentRetry": 1, "retries": 1, "state": "failed"}"#)?,
    ))?;
    assert!(!store.test(&id).expect("r3 was loaded").is_open());
    Ok(())
}

#[test]
fn prev_attempts_are_restored() -> Result<()> {
    let store = replay(indoc! {r#"
        {"type": "runnables-ready", "props": {"tests": [{"id": "r1", "title": "restored", "currentRetry": 2, "retries": 3, "prevAttempts": [{"id": "r1", "currentRetry": 0, "state": "failed", "err": {"message": "a"}}, {"id": "r1", "currentRetry": 1, "state": "failed", "err": {"message": "b"}}]}]}}
        {"type": "test-started", "props": {"id": "r1", "currentRetry": 2, "retries": 3}}
    "#})?;

    let test = store.test(&RunnableId::new("r1")).expect("r1 was loaded");
    let attempts: Vec<_> = test
        .attempts()
        .map(|attempt| (attempt.id().0, attempt.state()))
        .collect();
    assert_eq!(
        attempts,
        [
            (0, TestState::Failed),
            (1, TestState::Failed),
            (2, TestState::Active),
        ]
    );
    assert!(test.is_active());
    assert!(test.is_open(), "the only test is open");
    assert!(!test.is_finished());
    Ok(())
}
