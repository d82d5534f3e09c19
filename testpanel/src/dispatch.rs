// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    display::{PanelDisplay, Styles},
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
};
use testpanel_model::{
    config::{ConfigLocation, ReporterConfig},
    events::{ReporterEvent, read_event_log},
    store::Store,
    test::TestState,
};
use tracing::debug;

/// `EVENTS` value that reads the event log from standard input.
const STDIN_PATH: &str = "-";
const STDIN_SOURCE_NAME: &str = "<stdin>";

/// Replays recorded test runner events and shows the reporter panel.
///
/// Each line of the event log is one JSON event, as emitted by the test runner. The events are
/// applied in order, and the resulting state of every test is printed.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct TestpanelApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: ./testpanel.toml, then the user config directory]
    ///
    /// Pass `none` to skip loading a config file.
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "TESTPANEL_CONFIG_FILE"
    )]
    config_file: Option<String>,
}

impl ConfigOpts {
    fn load(&self, cwd: &Utf8Path) -> Result<ReporterConfig> {
        let location = ConfigLocation::from_cli_or_env(self.config_file.as_deref());
        ReporterConfig::load(cwd, location).map_err(|error| ExpectedError::ConfigLoad { error })
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay an event log and print the state of each test
    Replay {
        /// Path to the event log, or `-` for standard input
        #[arg(value_name = "EVENTS")]
        events: Utf8PathBuf,

        /// Output format
        #[arg(
            short = 'T',
            long,
            value_enum,
            default_value_t,
            help_heading = "OUTPUT OPTIONS",
            value_name = "FMT"
        )]
        message_format: MessageFormat,
    },
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormat {
    #[default]
    Human,
    Json,
}

impl TestpanelApp {
    /// Initializes logging and color support.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, writing results to `writer`.
    pub fn exec(self, output: OutputContext, writer: &mut dyn Write) -> Result<()> {
        let cwd = current_dir()?;
        let config = self.config_opts.load(&cwd)?;
        debug!("using reporter config: {config:?}");

        match self.command {
            Command::Replay {
                events,
                message_format,
            } => {
                let events = read_events(&events)?;
                let store = replay(config, &events)?;
                write_store(&store, output, message_format, writer)?;

                let failed = store
                    .tests()
                    .filter(|test| test.state() == TestState::Failed)
                    .count();
                if failed > 0 {
                    return Err(ExpectedError::TestsFailed { count: failed });
                }
                Ok(())
            }
        }
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(|error| ExpectedError::CurrentDirInvalid { error })?;
    Utf8PathBuf::try_from(cwd).map_err(|error| ExpectedError::CurrentDirNotUtf8 { error })
}

fn read_events(path: &Utf8Path) -> Result<Vec<ReporterEvent>> {
    if path.as_str() == STDIN_PATH {
        return read_events_from(io::stdin().lock(), STDIN_SOURCE_NAME);
    }

    let file = File::open(path).map_err(|error| ExpectedError::EventLogOpen {
        path: path.to_owned(),
        error,
    })?;
    read_events_from(BufReader::new(file), path.as_str())
}

fn read_events_from(reader: impl BufRead, source_name: &str) -> Result<Vec<ReporterEvent>> {
    let events = read_event_log(reader).map_err(|error| ExpectedError::EventLogRead {
        source_name: source_name.to_owned(),
        error,
    })?;
    debug!("read {} events from {source_name}", events.len());
    Ok(events)
}

fn replay(config: ReporterConfig, events: &[ReporterEvent]) -> Result<Store> {
    let mut store = Store::new(config);
    for event in events {
        store
            .apply(event)
            .map_err(|error| ExpectedError::DuplicateTest { error })?;
    }
    Ok(store)
}

fn write_store(
    store: &Store,
    output: OutputContext,
    message_format: MessageFormat,
    writer: &mut dyn Write,
) -> Result<()> {
    let summary = store.summary();
    match message_format {
        MessageFormat::Human => {
            let mut styles = Styles::default();
            if output.color.should_colorize(supports_color::Stream::Stdout) {
                styles.colorize();
            }
            PanelDisplay::new(&summary, &styles)
                .write(writer)
                .map_err(ExpectedError::write_output)?;
        }
        MessageFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, &summary)
                .map_err(|error| ExpectedError::write_output(error.into()))?;
            writeln!(writer).map_err(ExpectedError::write_output)?;
        }
    }
    writer.flush().map_err(ExpectedError::write_output)
}
