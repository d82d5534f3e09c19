// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors reported by tests, as displayed in the panel.

use serde::{Deserialize, Serialize};

/// An error raised by a test, an attempt or a command.
///
/// The default value is the empty error, which is what a test with no failures reports.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrInfo {
    /// The error's name, for example `AssertionError`.
    #[serde(default)]
    pub name: String,

    /// The error message.
    #[serde(default)]
    pub message: String,

    /// The stack trace, if one was captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// A link to documentation about this error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,

    /// The source location the error points to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_frame: Option<CodeFrame>,
}

impl ErrInfo {
    /// Creates an error with the given name and message.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Returns true if this is the empty error.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.message.is_empty()
    }

    /// Returns the message as displayed in the panel: `name: message`.
    pub fn display_message(&self) -> String {
        match (self.name.is_empty(), self.message.is_empty()) {
            (false, false) => format!("{}: {}", self.name, self.message),
            (false, true) => self.name.clone(),
            (true, _) => self.message.clone(),
        }
    }

    /// Overwrites fields with the ones that are set in `other`.
    pub fn update(&mut self, other: &ErrInfo) {
        if !other.name.is_empty() {
            self.name.clone_from(&other.name);
        }
        if !other.message.is_empty() {
            self.message.clone_from(&other.message);
        }
        if other.stack.is_some() {
            self.stack.clone_from(&other.stack);
        }
        if other.docs_url.is_some() {
            self.docs_url.clone_from(&other.docs_url);
        }
        if other.code_frame.is_some() {
            self.code_frame.clone_from(&other.code_frame);
        }
    }
}

/// A source location an error points to, with a rendered excerpt.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFrame {
    /// Path of the file, relative to the project root.
    pub relative_file: String,

    /// One-based line number.
    pub line: u32,

    /// One-based column number.
    pub column: u32,

    /// The rendered source excerpt.
    #[serde(default)]
    pub frame: String,

    /// Language of the file, used for highlighting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}
