// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::{FromPathBufError, Utf8PathBuf};
use owo_colors::OwoColorize;
use std::error::Error;
use testpanel_model::errors::{ConfigError, DuplicateTestError, EventLogError};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `testpanel` failures.
///
/// Unknown or unexpected failures always result in exit code 1.
pub enum TestpanelExitCode {}

impl TestpanelExitCode {
    /// No errors occurred and every test passed or was skipped.
    pub const OK: i32 = 0;

    /// One or more tests failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// Writing data to stdout produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// The event log could not be read or parsed.
    pub const EVENT_LOG_ERROR: i32 = 97;

    /// A user issue happened while setting up a testpanel invocation.
    pub const SETUP_ERROR: i32 = 96;
}

// The #[error()] strings are placeholders. Errors are meant to be printed with display_to_stderr,
// which colorizes them.

/// An expected error that testpanel reports and exits on.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine current directory")]
    CurrentDirInvalid { error: std::io::Error },
    #[error("current directory is not valid UTF-8")]
    CurrentDirNotUtf8 { error: FromPathBufError },
    #[error("failed to load config")]
    ConfigLoad { error: ConfigError },
    #[error("failed to open event log")]
    EventLogOpen {
        path: Utf8PathBuf,
        error: std::io::Error,
    },
    #[error("failed to read event log")]
    EventLogRead {
        source_name: String,
        error: EventLogError,
    },
    #[error("duplicate test in event log")]
    DuplicateTest { error: DuplicateTestError },
    #[error("failed to write output")]
    WriteOutput { error: std::io::Error },
    #[error("{count} tests failed")]
    TestsFailed { count: usize },
}

impl ExpectedError {
    pub(crate) fn write_output(error: std::io::Error) -> Self {
        Self::WriteOutput { error }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. }
            | Self::CurrentDirNotUtf8 { .. }
            | Self::ConfigLoad { .. } => TestpanelExitCode::SETUP_ERROR,
            Self::EventLogOpen { .. } | Self::EventLogRead { .. } | Self::DuplicateTest { .. } => {
                TestpanelExitCode::EVENT_LOG_ERROR
            }
            Self::WriteOutput { .. } => TestpanelExitCode::WRITE_OUTPUT_ERROR,
            Self::TestsFailed { .. } => TestpanelExitCode::TEST_RUN_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirInvalid { error } => {
                error!("could not determine current directory");
                Some(error as &dyn Error)
            }
            Self::CurrentDirNotUtf8 { error } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    error.as_path().display().style(styles.bold)
                );
                None
            }
            Self::ConfigLoad { error } => {
                error!("failed to load testpanel config");
                Some(error as &dyn Error)
            }
            Self::EventLogOpen { path, error } => {
                error!("failed to open event log `{}`", path.style(styles.bold));
                Some(error as &dyn Error)
            }
            Self::EventLogRead { source_name, error } => {
                error!(
                    "failed to read events from `{}`",
                    source_name.style(styles.bold)
                );
                Some(error as &dyn Error)
            }
            Self::DuplicateTest { error } => {
                error!("{error}");
                None
            }
            Self::WriteOutput { error } => {
                error!("failed to write output");
                Some(error as &dyn Error)
            }
            Self::TestsFailed { count } => {
                let noun = if *count == 1 { "test" } else { "tests" };
                error!("{} {noun} failed", count.style(styles.bold));
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
