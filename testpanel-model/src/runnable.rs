// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers and the common header shared by nodes in the runnable tree.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// The identifier of a test or suite, as assigned by the test runner.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RunnableId(SmolStr);

impl RunnableId {
    /// Creates a new runnable ID.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    /// Returns the ID as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RunnableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RunnableId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The zero-based retry index of an attempt.
///
/// The first run of a test is attempt 0, the first retry is attempt 1, and so on.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize,
)]
#[serde(transparent)]
pub struct AttemptId(pub u32);

impl AttemptId {
    /// The first attempt of any test.
    pub const FIRST: Self = Self(0);
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The kind of node a [`Runnable`] is.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunnableKind {
    /// A test case.
    Test,
    /// A suite grouping tests and other suites.
    Suite,
}

impl RunnableKind {
    /// Returns the string form of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Suite => "suite",
        }
    }
}

/// Header data common to every node in the runnable tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Runnable {
    id: RunnableId,
    title: String,
    level: u32,
    kind: RunnableKind,
}

impl Runnable {
    /// Creates a new runnable header.
    pub fn new(id: RunnableId, title: impl Into<String>, level: u32, kind: RunnableKind) -> Self {
        Self {
            id,
            title: title.into(),
            level,
            kind,
        }
    }

    /// Returns the ID.
    pub fn id(&self) -> &RunnableId {
        &self.id
    }

    /// Returns the title shown for this runnable.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the nesting depth of this runnable. Top-level runnables are at level 0.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Returns the kind of runnable.
    pub fn kind(&self) -> RunnableKind {
        self.kind
    }
}
