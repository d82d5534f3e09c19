// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log entries recorded against an attempt: commands, agents, routes and sessions.

use crate::{err_info::ErrInfo, events::LogProps};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{
    fmt,
    time::{Duration, Instant},
};
use tracing::debug;

/// The identifier of a log entry.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize,
)]
#[serde(transparent)]
pub struct LogId(pub u64);

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The identifier of a hook within an attempt.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct HookId(SmolStr);

impl HookId {
    /// Creates a new hook ID.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    /// Returns the ID as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The kind of a log entry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instrument {
    /// A command run by the test.
    Command,
    /// A spy or stub.
    Agent,
    /// An intercepted network route.
    Route,
    /// A cached session.
    Session,
}

impl Instrument {
    /// Returns all known instruments, in display order.
    pub fn variants() -> [Self; 4] {
        [Self::Command, Self::Agent, Self::Route, Self::Session]
    }
}

/// The state of a log entry.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogState {
    /// Still running.
    #[default]
    Pending,
    /// Completed successfully.
    Passed,
    /// Completed with an error.
    Failed,
}

/// A single entry in an attempt's log.
#[derive(Clone, Debug)]
pub struct LogEntry {
    id: LogId,
    instrument: Instrument,
    hook_id: Option<HookId>,
    name: String,
    message: Option<String>,
    state: LogState,
    err: Option<ErrInfo>,
    created_at: Instant,
    is_long_running: bool,
}

impl LogEntry {
    pub(crate) fn new(props: &LogProps, now: Instant) -> Self {
        Self {
            id: props.id,
            instrument: props.instrument,
            hook_id: props.hook_id.clone(),
            name: props.name.clone(),
            message: props.message.clone(),
            state: props.state.unwrap_or_default(),
            err: props.err.clone(),
            created_at: now,
            is_long_running: false,
        }
    }

    /// Returns the ID.
    pub fn id(&self) -> LogId {
        self.id
    }

    /// Returns the kind of entry.
    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    /// Returns the hook this entry was recorded under, if any.
    pub fn hook_id(&self) -> Option<&HookId> {
        self.hook_id.as_ref()
    }

    /// Returns the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the current state.
    pub fn state(&self) -> LogState {
        self.state
    }

    /// Returns the error this entry failed with, if any.
    pub fn err(&self) -> Option<&ErrInfo> {
        self.err.as_ref()
    }

    /// Returns true if the entry is still pending.
    pub fn is_pending(&self) -> bool {
        self.state == LogState::Pending
    }

    /// Returns true if the entry has been pending for longer than the long-running threshold.
    pub fn is_long_running(&self) -> bool {
        self.is_long_running
    }

    pub(crate) fn update(&mut self, props: &LogProps) {
        if let Some(state) = props.state {
            self.state = state;
        }
        if props.message.is_some() {
            self.message.clone_from(&props.message);
        }
        if let Some(err) = &props.err {
            match &mut self.err {
                Some(existing) => existing.update(err),
                None => self.err = Some(err.clone()),
            }
        }
        if !self.is_pending() {
            self.is_long_running = false;
        }
    }

    pub(crate) fn clear_long_running(&mut self) {
        self.is_long_running = false;
    }

    pub(crate) fn check_long_running(&mut self, now: Instant, threshold: Duration) {
        if self.is_long_running || !self.is_pending() {
            return;
        }
        let pending_for = now.saturating_duration_since(self.created_at);
        if pending_for >= threshold {
            debug!(
                "log entry {} ({}) pending for {:?}, marking long-running",
                self.id, self.name, pending_for
            );
            self.is_long_running = true;
        }
    }
}

/// A group of commands within an attempt, such as `before each` or the test body.
#[derive(Clone, Debug)]
pub struct Hook {
    hook_id: HookId,
    name: String,
    command_ids: Vec<LogId>,
}

impl Hook {
    pub(crate) fn new(hook_id: HookId, name: impl Into<String>) -> Self {
        Self {
            hook_id,
            name: name.into(),
            command_ids: Vec::new(),
        }
    }

    /// Returns the ID.
    pub fn hook_id(&self) -> &HookId {
        &self.hook_id
    }

    /// Returns the name shown for this hook.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the IDs of the commands run under this hook, in order.
    pub fn command_ids(&self) -> &[LogId] {
        &self.command_ids
    }

    pub(crate) fn add_command(&mut self, id: LogId) {
        self.command_ids.push(id);
    }
}
