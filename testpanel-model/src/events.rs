// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payloads delivered by the test runner, and the events that carry them.
//!
//! Field names on the wire are camelCase, matching what the runner emits.

use crate::{
    err_info::ErrInfo,
    errors::EventLogError,
    log::{HookId, Instrument, LogId, LogState},
    runnable::{AttemptId, RunnableId},
    test::TestState,
};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// Properties describing a test, sent when the test is registered, started or finished.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestProps {
    /// The test's ID.
    pub id: RunnableId,

    /// The test's title.
    #[serde(default)]
    pub title: String,

    /// Nesting depth of the test within its suites.
    #[serde(default)]
    pub level: u32,

    /// The retry index these properties refer to.
    #[serde(default)]
    pub current_retry: AttemptId,

    /// The number of retries configured for the test. A test can run `retries + 1` times.
    #[serde(default)]
    pub retries: u32,

    /// The outcome, set once an attempt has finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TestState>,

    /// The error the attempt failed with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<ErrInfo>,

    /// Hooks that commands of this attempt are grouped under.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookProps>,

    /// Attempts that ran before this model was created, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prev_attempts: Vec<TestProps>,
}

impl TestProps {
    /// Creates properties for a test with the given ID and title, at retry index 0.
    pub fn new(id: impl Into<RunnableId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Returns true if these properties describe the last attempt the test is allowed.
    pub fn is_last_retry(&self) -> bool {
        self.current_retry.0 >= self.retries
    }
}

/// A hook that groups commands within an attempt.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookProps {
    /// The hook's ID.
    pub hook_id: HookId,

    /// The name shown for the hook, for example `before each`.
    pub hook_name: String,
}

/// Properties of a log entry, sent when it is added and whenever it changes.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogProps {
    /// The log entry's ID.
    pub id: LogId,

    /// The test this entry belongs to.
    pub test_id: RunnableId,

    /// The attempt this entry belongs to.
    #[serde(default)]
    pub test_current_retry: AttemptId,

    /// Which kind of log this is.
    pub instrument: Instrument,

    /// The hook a command runs under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<HookId>,

    /// The name of the command, agent, route or session.
    #[serde(default)]
    pub name: String,

    /// A short description shown next to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The state of the entry. Entries without one are treated as pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LogState>,

    /// The error the entry failed with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<ErrInfo>,
}

impl LogProps {
    /// Creates properties for a pending command at retry index 0.
    pub fn command(id: u64, test_id: impl Into<RunnableId>, name: impl Into<String>) -> Self {
        Self {
            id: LogId(id),
            test_id: test_id.into(),
            test_current_retry: AttemptId::FIRST,
            instrument: Instrument::Command,
            hook_id: None,
            name: name.into(),
            message: None,
            state: None,
            err: None,
        }
    }
}

/// An event sent by the test runner to the reporter.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "props", rename_all = "kebab-case")]
pub enum ReporterEvent {
    /// The set of tests for the run is known. Replaces any tests seen so far.
    RunnablesReady {
        /// The tests in the run, in display order.
        tests: Vec<TestProps>,
    },

    /// An attempt of a test started.
    TestStarted(TestProps),

    /// An attempt of a test finished.
    TestFinished(TestProps),

    /// A log entry was added to an attempt.
    LogAdded(LogProps),

    /// A log entry changed.
    LogChanged(LogProps),
}

impl ReporterEvent {
    /// Returns the name of the event, as used in the `type` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunnablesReady { .. } => "runnables-ready",
            Self::TestStarted(_) => "test-started",
            Self::TestFinished(_) => "test-finished",
            Self::LogAdded(_) => "log-added",
            Self::LogChanged(_) => "log-changed",
        }
    }
}

/// Reads a recorded event log: one JSON-encoded [`ReporterEvent`] per line.
///
/// Blank lines are skipped. Line numbers in errors are one-based.
pub fn read_event_log(reader: impl BufRead) -> Result<Vec<ReporterEvent>, EventLogError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|error| EventLogError::Read {
            line: line_number,
            error,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|error| EventLogError::Parse {
            line: line_number,
            error,
        })?;
        events.push(event);
    }

    Ok(events)
}
