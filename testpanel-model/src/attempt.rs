// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single run of a test.

use crate::{
    err_info::ErrInfo,
    events::{HookProps, LogProps, TestProps},
    log::{Hook, HookId, Instrument, LogEntry, LogId},
    runnable::AttemptId,
    stopwatch::{StopwatchSnapshot, StopwatchStart, stopwatch},
    test::TestState,
};
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One run of a test, identified by its retry index.
///
/// Attempts are owned by a [`Test`](crate::test::Test), which routes runner events to the attempt
/// they address.
#[derive(Clone, Debug)]
pub struct Attempt {
    id: AttemptId,
    state: Option<TestState>,
    is_active: bool,
    err: ErrInfo,
    is_open: Option<bool>,
    hooks: IndexMap<HookId, Hook>,
    commands: IndexMap<LogId, LogEntry>,
    agents: IndexMap<LogId, LogEntry>,
    routes: IndexMap<LogId, LogEntry>,
    sessions: IndexMap<LogId, LogEntry>,
    timing: AttemptTiming,
}

#[derive(Clone, Debug)]
enum AttemptTiming {
    NotStarted,
    Running(StopwatchStart),
    Finished(StopwatchSnapshot),
}

impl Attempt {
    pub(crate) fn new(props: &TestProps) -> Self {
        let mut attempt = Self {
            id: props.current_retry,
            state: props.state,
            is_active: false,
            err: props.err.clone().unwrap_or_default(),
            is_open: None,
            hooks: IndexMap::new(),
            commands: IndexMap::new(),
            agents: IndexMap::new(),
            routes: IndexMap::new(),
            sessions: IndexMap::new(),
            timing: AttemptTiming::NotStarted,
        };
        attempt.add_hooks(&props.hooks);
        attempt
    }

    /// Returns the retry index of this attempt.
    pub fn id(&self) -> AttemptId {
        self.id
    }

    /// Returns the state of this attempt.
    ///
    /// Until the runner reports an outcome, an attempt is `Active` while it runs and `Processing`
    /// otherwise.
    pub fn state(&self) -> TestState {
        match self.state {
            Some(state) => state,
            None if self.is_active => TestState::Active,
            None => TestState::Processing,
        }
    }

    /// Returns the error this attempt failed with, or the empty error.
    pub fn err(&self) -> &ErrInfo {
        &self.err
    }

    /// Returns true while the attempt is running.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns true if any of this attempt's commands is long-running.
    pub fn is_long_running(&self) -> bool {
        self.commands.values().any(|command| command.is_long_running())
    }

    /// Returns true if this attempt is expanded in the panel.
    ///
    /// Unless it was explicitly opened or closed, an attempt is open while it is running or if it
    /// is the test's last attempt.
    pub fn is_open(&self, is_last: bool) -> bool {
        self.is_open.unwrap_or(self.is_active || is_last)
    }

    /// Returns the hooks of this attempt, in order.
    pub fn hooks(&self) -> impl Iterator<Item = &Hook> + '_ {
        self.hooks.values()
    }

    /// Returns the log entries for the given instrument, in the order they were added.
    pub fn logs(&self, instrument: Instrument) -> impl Iterator<Item = &LogEntry> + '_ {
        self.log_map(instrument).values()
    }

    /// Returns the log entry with the given instrument and ID.
    pub fn log(&self, instrument: Instrument, id: LogId) -> Option<&LogEntry> {
        self.log_map(instrument).get(&id)
    }

    /// Returns the command whose error matches this attempt's error.
    ///
    /// Hooks are searched in order and the last matching command wins. Returns `None` if the
    /// attempt has no error message.
    pub fn command_matching_err(&self) -> Option<&LogEntry> {
        if self.err.message.is_empty() {
            return None;
        }

        self.hooks
            .values()
            .filter_map(|hook| {
                hook.command_ids()
                    .iter()
                    .rev()
                    .filter_map(|id| self.commands.get(id))
                    .find(|command| {
                        command
                            .err()
                            .is_some_and(|err| err.message == self.err.message)
                    })
            })
            .last()
    }

    /// Returns the wall-clock time this attempt started at, if it has started.
    pub fn start_time(&self) -> Option<DateTime<Local>> {
        match &self.timing {
            AttemptTiming::NotStarted => None,
            AttemptTiming::Running(start) => Some(start.start_time()),
            AttemptTiming::Finished(snapshot) => Some(snapshot.start_time),
        }
    }

    /// Returns the wall-clock time this attempt finished at, if it has finished.
    pub fn end_time(&self) -> Option<DateTime<Local>> {
        match &self.timing {
            AttemptTiming::Finished(snapshot) => Some(snapshot.end_time()),
            AttemptTiming::NotStarted | AttemptTiming::Running(_) => None,
        }
    }

    /// Returns how long this attempt ran for, if it has finished.
    pub fn duration(&self) -> Option<Duration> {
        match &self.timing {
            AttemptTiming::Finished(snapshot) => Some(snapshot.duration),
            AttemptTiming::NotStarted | AttemptTiming::Running(_) => None,
        }
    }

    pub(crate) fn start(&mut self) {
        debug!("attempt {} started", self.id);
        self.is_active = true;
        self.timing = AttemptTiming::Running(stopwatch());
    }

    pub(crate) fn finish(&mut self, props: &TestProps) {
        if let Some(state) = props.state {
            self.state = Some(state);
        }
        if let Some(err) = &props.err {
            self.err.update(err);
        }
        self.add_hooks(&props.hooks);
        self.is_active = false;
        // Commands left pending when the attempt ends are no longer running.
        for command in self.commands.values_mut() {
            command.clear_long_running();
        }

        if let AttemptTiming::Running(start) = &self.timing {
            self.timing = AttemptTiming::Finished(start.snapshot());
        }
        debug!("attempt {} finished with state {}", self.id, self.state());
    }

    pub(crate) fn add_log(&mut self, props: &LogProps, now: Instant) {
        let entry = LogEntry::new(props, now);
        if self
            .log_map_mut(props.instrument)
            .insert(props.id, entry)
            .is_some()
        {
            warn!(
                "attempt {}: log entry {} was added twice, keeping the newer one",
                self.id, props.id
            );
            return;
        }
        if props.instrument == Instrument::Command {
            self.hook_for_command(props.hook_id.as_ref())
                .add_command(props.id);
        }
    }

    pub(crate) fn update_log(&mut self, props: &LogProps) {
        match self.log_map_mut(props.instrument).get_mut(&props.id) {
            Some(entry) => entry.update(props),
            None => debug!(
                "attempt {}: ignoring update for unknown log entry {}",
                self.id, props.id
            ),
        }
    }

    pub(crate) fn check_long_running(&mut self, now: Instant, threshold: Duration) {
        for command in self.commands.values_mut() {
            command.check_long_running(now, threshold);
        }
    }

    pub(crate) fn set_is_open(&mut self, is_open: bool) {
        self.is_open = Some(is_open);
    }

    fn add_hooks(&mut self, hooks: &[HookProps]) {
        for hook in hooks {
            self.hooks
                .entry(hook.hook_id.clone())
                .or_insert_with(|| Hook::new(hook.hook_id.clone(), hook.hook_name.clone()));
        }
    }

    fn hook_for_command(&mut self, hook_id: Option<&HookId>) -> &mut Hook {
        let hook_id = hook_id.cloned().unwrap_or_else(|| HookId::new(TEST_BODY_HOOK));
        self.hooks.entry(hook_id).or_insert_with_key(|hook_id| {
            debug!("attempt: creating hook {hook_id} on demand");
            Hook::new(hook_id.clone(), hook_id.as_str())
        })
    }

    fn log_map(&self, instrument: Instrument) -> &IndexMap<LogId, LogEntry> {
        match instrument {
            Instrument::Command => &self.commands,
            Instrument::Agent => &self.agents,
            Instrument::Route => &self.routes,
            Instrument::Session => &self.sessions,
        }
    }

    fn log_map_mut(&mut self, instrument: Instrument) -> &mut IndexMap<LogId, LogEntry> {
        match instrument {
            Instrument::Command => &mut self.commands,
            Instrument::Agent => &mut self.agents,
            Instrument::Route => &mut self.routes,
            Instrument::Session => &mut self.sessions,
        }
    }
}

/// Hook that commands without a hook ID are grouped under.
const TEST_BODY_HOOK: &str = "test body";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogState;
    use pretty_assertions::assert_eq;

    fn props_with_hooks() -> TestProps {
        TestProps {
            hooks: vec![
                HookProps {
                    hook_id: HookId::new("h1"),
                    hook_name: "before each".to_owned(),
                },
                HookProps {
                    hook_id: HookId::new("h2"),
                    hook_name: "test body".to_owned(),
                },
            ],
            ..TestProps::new("r1", "does a thing")
        }
    }

    fn command(id: u64, hook: &str, err_message: Option<&str>) -> LogProps {
        LogProps {
            hook_id: Some(HookId::new(hook)),
            state: Some(if err_message.is_some() {
                LogState::Failed
            } else {
                LogState::Passed
            }),
            err: err_message.map(|message| ErrInfo::new("AssertionError", message)),
            ..LogProps::command(id, "r1", "should")
        }
    }

    #[test]
    fn state_transitions() {
        let mut attempt = Attempt::new(&TestProps::new("r1", "t"));
        assert_eq!(attempt.state(), TestState::Processing);
        assert_eq!(attempt.duration(), None);

        attempt.start();
        assert_eq!(attempt.state(), TestState::Active);
        assert!(attempt.is_active());
        assert!(attempt.start_time().is_some());

        attempt.finish(&TestProps {
            state: Some(TestState::Passed),
            ..TestProps::new("r1", "t")
        });
        assert_eq!(attempt.state(), TestState::Passed);
        assert!(!attempt.is_active());
        assert!(attempt.duration().is_some());
        assert!(attempt.end_time() >= attempt.start_time());
    }

    #[test]
    fn is_open_defaults() {
        let mut attempt = Attempt::new(&TestProps::new("r1", "t"));
        assert!(!attempt.is_open(false));
        assert!(attempt.is_open(true));

        attempt.start();
        assert!(attempt.is_open(false), "running attempts are open");

        attempt.set_is_open(false);
        assert!(!attempt.is_open(true), "explicit flag wins");
    }

    #[test]
    fn commands_are_grouped_by_hook() {
        let mut attempt = Attempt::new(&props_with_hooks());
        let now = Instant::now();
        attempt.add_log(&command(1, "h1", None), now);
        attempt.add_log(&command(2, "h2", None), now);
        attempt.add_log(&command(3, "h2", None), now);
        attempt.add_log(&command(4, "h3", None), now);

        let hooks: Vec<_> = attempt
            .hooks()
            .map(|hook| (hook.name(), hook.command_ids().to_vec()))
            .collect();
        assert_eq!(
            hooks,
            [
                ("before each", vec![LogId(1)]),
                ("test body", vec![LogId(2), LogId(3)]),
                ("h3", vec![LogId(4)]),
            ]
        );
    }

    #[test]
    fn command_matching_err_picks_last_match() {
        let mut attempt = Attempt::new(&TestProps {
            err: Some(ErrInfo::new("AssertionError", "expected 1 to equal 2")),
            ..props_with_hooks()
        });
        let now = Instant::now();
        attempt.add_log(&command(1, "h1", Some("expected 1 to equal 2")), now);
        attempt.add_log(&command(2, "h2", Some("expected 1 to equal 2")), now);
        attempt.add_log(&command(3, "h2", None), now);
        attempt.add_log(&command(4, "h2", Some("something else")), now);

        let matching = attempt.command_matching_err().expect("a command matches");
        assert_eq!(matching.id(), LogId(2));
    }

    #[test]
    fn command_matching_err_without_err() {
        let mut attempt = Attempt::new(&props_with_hooks());
        attempt.add_log(&command(1, "h1", Some("")), Instant::now());
        assert!(attempt.command_matching_err().is_none());
    }

    #[test]
    fn logs_are_kept_per_instrument() {
        let mut attempt = Attempt::new(&props_with_hooks());
        let now = Instant::now();
        attempt.add_log(&command(1, "h1", None), now);
        attempt.add_log(
            &LogProps {
                instrument: Instrument::Route,
                ..LogProps::command(1, "r1", "GET /users")
            },
            now,
        );

        let counts: Vec<_> = Instrument::variants()
            .into_iter()
            .map(|instrument| attempt.logs(instrument).count())
            .collect();
        assert_eq!(counts, [1, 0, 1, 0]);
        assert_eq!(
            attempt
                .log(Instrument::Route, LogId(1))
                .map(|route| route.name()),
            Some("GET /users")
        );

        // Routes are not part of any hook.
        let hook_commands: usize = attempt.hooks().map(|hook| hook.command_ids().len()).sum();
        assert_eq!(hook_commands, 1);
    }

    #[test]
    fn duplicate_command_is_listed_once() {
        let mut attempt = Attempt::new(&props_with_hooks());
        let now = Instant::now();
        attempt.add_log(&command(1, "h2", None), now);
        attempt.add_log(&command(1, "h2", Some("retried")), now);

        assert_eq!(attempt.logs(Instrument::Command).count(), 1);
        let hooks: Vec<_> = attempt
            .hooks()
            .map(|hook| (hook.name(), hook.command_ids().to_vec()))
            .collect();
        assert_eq!(
            hooks,
            [("before each", vec![]), ("test body", vec![LogId(1)])]
        );
        let entry = attempt
            .log(Instrument::Command, LogId(1))
            .expect("command was added");
        assert_eq!(entry.state(), LogState::Failed, "the newer entry wins");
    }

    #[test]
    fn finishing_clears_long_running_commands() {
        let mut attempt = Attempt::new(&props_with_hooks());
        attempt.start();
        let start = Instant::now();
        attempt.add_log(&LogProps::command(1, "r1", "wait"), start);
        attempt.check_long_running(start + Duration::from_secs(2), Duration::from_secs(1));
        assert!(attempt.is_long_running());

        attempt.finish(&TestProps {
            state: Some(TestState::Passed),
            ..TestProps::new("r1", "does a thing")
        });
        assert!(!attempt.is_long_running());
        let entry = attempt
            .log(Instrument::Command, LogId(1))
            .expect("command was added");
        assert!(entry.is_pending());
        assert!(!entry.is_long_running());
    }

    #[test]
    fn update_log_ignores_unknown_entries() {
        let mut attempt = Attempt::new(&props_with_hooks());
        attempt.update_log(&command(9, "h1", Some("boom")));
        assert_eq!(attempt.logs(Instrument::Command).count(), 0);
    }
}
