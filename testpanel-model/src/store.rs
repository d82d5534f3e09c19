// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The set of tests shown in the panel, and routing of runner events to them.

use crate::{
    config::ReporterConfig,
    errors::DuplicateTestError,
    events::{LogProps, ReporterEvent, TestProps},
    runnable::{AttemptId, RunnableId},
    test::{Test, TestState},
};
use indexmap::{IndexMap, map::Entry};
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

/// Holds the tests of a run, in display order.
///
/// Events from the runner are routed to the test they address. Events for tests the store doesn't
/// know about are ignored.
#[derive(Clone, Debug)]
pub struct Store {
    tests: IndexMap<RunnableId, Test>,
    config: ReporterConfig,
}

impl Store {
    /// Creates an empty store.
    pub fn new(config: ReporterConfig) -> Self {
        Self {
            tests: IndexMap::new(),
            config,
        }
    }

    /// Returns the config tests in this store are created with.
    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Adds a test.
    pub fn add_test(&mut self, props: &TestProps) -> Result<&mut Test, DuplicateTestError> {
        let index = match self.tests.entry(props.id.clone()) {
            Entry::Occupied(entry) => return Err(DuplicateTestError::new(entry.key().clone())),
            Entry::Vacant(entry) => {
                let index = entry.index();
                entry.insert(Test::new(props, self.config));
                index
            }
        };
        self.refresh_single_test();

        Ok(&mut self.tests[index])
    }

    /// Replaces all tests with the given ones.
    ///
    /// On error, the store is left empty.
    pub fn set_runnables(&mut self, tests: &[TestProps]) -> Result<(), DuplicateTestError> {
        self.tests.clear();
        for props in tests {
            if let Err(error) = self.add_test(props) {
                self.tests.clear();
                return Err(error);
            }
        }
        debug!("store: loaded {} tests", self.tests.len());
        Ok(())
    }

    /// Returns true if exactly one test is loaded.
    pub fn has_single_test(&self) -> bool {
        self.tests.len() == 1
    }

    /// Returns the test with the given ID.
    pub fn test(&self, id: &RunnableId) -> Option<&Test> {
        self.tests.get(id)
    }

    /// Returns the test with the given ID, for mutation.
    pub fn test_mut(&mut self, id: &RunnableId) -> Option<&mut Test> {
        self.tests.get_mut(id)
    }

    /// Returns the tests, in display order.
    pub fn tests(&self) -> impl ExactSizeIterator<Item = &Test> + '_ {
        self.tests.values()
    }

    /// Starts an attempt of the test addressed by `props.id`.
    pub fn start(&mut self, props: &TestProps) {
        self.with_test(&props.id, |test| test.start(props));
    }

    /// Finishes an attempt of the test addressed by `props.id`.
    pub fn finish(&mut self, props: &TestProps) {
        self.with_test(&props.id, |test| test.finish(props));
    }

    /// Adds a log entry to the test addressed by `props.test_id`.
    pub fn add_log(&mut self, props: &LogProps) {
        self.with_test(&props.test_id, |test| test.add_log(props));
    }

    /// Updates a log entry of the test addressed by `props.test_id`.
    pub fn update_log(&mut self, props: &LogProps) {
        self.with_test(&props.test_id, |test| test.update_log(props));
    }

    /// Applies an event from the runner.
    pub fn apply(&mut self, event: &ReporterEvent) -> Result<(), DuplicateTestError> {
        match event {
            ReporterEvent::RunnablesReady { tests } => self.set_runnables(tests)?,
            ReporterEvent::TestStarted(props) => self.start(props),
            ReporterEvent::TestFinished(props) => self.finish(props),
            ReporterEvent::LogAdded(props) => self.add_log(props),
            ReporterEvent::LogChanged(props) => self.update_log(props),
        }
        Ok(())
    }

    /// Marks commands that have been pending past the long-running threshold as of `now`.
    pub fn tick(&mut self, now: Instant) {
        for test in self.tests.values_mut() {
            test.check_long_running(now);
        }
    }

    /// Returns a summary of the derived state of each test, in display order.
    pub fn summary(&self) -> Vec<TestSummary> {
        self.tests.values().map(TestSummary::new).collect()
    }

    fn refresh_single_test(&mut self) {
        let has_single_test = self.has_single_test();
        for test in self.tests.values_mut() {
            test.set_has_single_test(has_single_test);
        }
    }

    fn with_test(&mut self, id: &RunnableId, f: impl FnOnce(&mut Test)) {
        match self.tests.get_mut(id) {
            Some(test) => f(test),
            None => debug!("store: ignoring event for unknown test {id}"),
        }
    }
}

/// A snapshot of the derived state of a test.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    /// The test's ID.
    pub id: RunnableId,

    /// The test's title.
    pub title: String,

    /// The state of the last attempt.
    pub state: TestState,

    /// The retry indexes of the attempts, in order.
    pub attempts: Vec<AttemptId>,

    /// Whether the test is open in the panel.
    pub is_open: bool,

    /// Whether the test passed after at least one retry.
    pub has_retried: bool,

    /// Whether the last allowed attempt has finished.
    pub is_finished: bool,

    /// Whether any attempt has a long-running command.
    pub is_long_running: bool,

    /// The display message of the last attempt's error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl TestSummary {
    /// Creates a summary of the given test.
    pub fn new(test: &Test) -> Self {
        let err = test.err();
        Self {
            id: test.id().clone(),
            title: test.title().to_owned(),
            state: test.state(),
            attempts: test.attempts().map(|attempt| attempt.id()).collect(),
            is_open: test.is_open(),
            has_retried: test.has_retried(),
            is_finished: test.is_finished(),
            is_long_running: test.is_long_running(),
            err: (!err.is_empty()).then(|| err.display_message()),
        }
    }
}
