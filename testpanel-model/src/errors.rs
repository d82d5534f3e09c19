// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testpanel.

use crate::runnable::RunnableId;
use camino::{FromPathBufError, Utf8PathBuf};
use thiserror::Error;

/// An error that occurred while loading the reporter config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file was explicitly specified but does not exist.
    #[error("config file not found at {path}")]
    FileNotFound {
        /// The path that was specified.
        path: Utf8PathBuf,
    },

    /// The config file could not be read.
    #[error("failed to read config file {path}")]
    Read {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying I/O error.
        #[source]
        error: std::io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config file {path}")]
    Parse {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying TOML parse error.
        #[source]
        error: toml::de::Error,
    },

    /// A config directory path was not valid UTF-8.
    #[error("config directory path is not valid UTF-8")]
    NonUtf8Path {
        /// The underlying error.
        #[source]
        error: FromPathBufError,
    },
}

/// A test with the same ID was added to a [`Store`](crate::store::Store) twice.
#[derive(Clone, Debug, Error)]
#[error("test `{id}` was already added")]
pub struct DuplicateTestError {
    id: RunnableId,
}

impl DuplicateTestError {
    pub(crate) fn new(id: RunnableId) -> Self {
        Self { id }
    }

    /// Returns the ID of the test that was added twice.
    pub fn id(&self) -> &RunnableId {
        &self.id
    }
}

/// An error that occurred while reading a recorded event log.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// A line could not be read.
    #[error("failed to read event log at line {line}")]
    Read {
        /// The one-based line number.
        line: usize,

        /// The underlying I/O error.
        #[source]
        error: std::io::Error,
    },

    /// A line was not a valid event.
    #[error("failed to parse event at line {line}")]
    Parse {
        /// The one-based line number.
        line: usize,

        /// The underlying JSON error.
        #[source]
        error: serde_json::Error,
    },
}
