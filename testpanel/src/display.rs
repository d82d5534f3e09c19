// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable rendering of the reporter panel.

use owo_colors::{OwoColorize, Style, style};
use std::io::{self, Write};
use testpanel_model::{store::TestSummary, test::TestState};

#[derive(Clone, Debug, Default)]
pub(crate) struct Styles {
    pass: Style,
    fail: Style,
    flaky: Style,
    running: Style,
    skip: Style,
    count: Style,
    dim: Style,
}

impl Styles {
    pub(crate) fn colorize(&mut self) {
        self.pass = style().green().bold();
        self.fail = style().red().bold();
        self.flaky = style().magenta().bold();
        self.running = style().cyan().bold();
        self.skip = style().yellow().bold();
        self.count = style().bold();
        self.dim = style().dimmed();
    }
}

pub(crate) struct PanelDisplay<'a> {
    summary: &'a [TestSummary],
    styles: &'a Styles,
}

impl<'a> PanelDisplay<'a> {
    pub(crate) fn new(summary: &'a [TestSummary], styles: &'a Styles) -> Self {
        Self { summary, styles }
    }

    pub(crate) fn write(&self, writer: &mut dyn Write) -> io::Result<()> {
        let mut counts = Counts::default();

        for test in self.summary {
            let (label, label_style) = self.label(test);
            counts.record(test);

            // Pad before styling so escape codes don't count towards the width.
            write!(
                writer,
                "{} {}",
                format!("{label:>7}").style(label_style),
                test.title
            )?;
            if test.attempts.len() > 1 {
                write!(
                    writer,
                    " {}",
                    format!("({} attempts)", test.attempts.len()).style(self.styles.dim)
                )?;
            }
            if test.is_long_running {
                write!(writer, " {}", "[long-running]".style(self.styles.running))?;
            }
            writeln!(writer)?;

            if test.is_open {
                if let Some(err) = &test.err {
                    for line in err.lines() {
                        writeln!(writer, "        {line}")?;
                    }
                }
            }
        }

        counts.write(writer, self.styles)
    }

    fn label(&self, test: &TestSummary) -> (&'static str, Style) {
        match test.state {
            TestState::Passed if test.has_retried => ("FLAKY", self.styles.flaky),
            TestState::Passed => ("PASS", self.styles.pass),
            TestState::Failed => ("FAIL", self.styles.fail),
            TestState::Active => ("RUNNING", self.styles.running),
            TestState::Processing => ("QUEUED", self.styles.dim),
            TestState::Pending => ("SKIP", self.styles.skip),
        }
    }
}

#[derive(Debug, Default)]
struct Counts {
    total: usize,
    passed: usize,
    flaky: usize,
    failed: usize,
}

impl Counts {
    fn record(&mut self, test: &TestSummary) {
        self.total += 1;
        match test.state {
            TestState::Passed => {
                self.passed += 1;
                if test.has_retried {
                    self.flaky += 1;
                }
            }
            TestState::Failed => self.failed += 1,
            TestState::Active | TestState::Processing | TestState::Pending => {}
        }
    }

    fn other(&self) -> usize {
        self.total - self.passed - self.failed
    }

    fn write(&self, writer: &mut dyn Write, styles: &Styles) -> io::Result<()> {
        let noun = if self.total == 1 { "test" } else { "tests" };
        write!(
            writer,
            "{} {noun}: {} passed",
            self.total.style(styles.count),
            self.passed.style(styles.pass),
        )?;
        if self.flaky > 0 {
            write!(writer, " ({} flaky)", self.flaky.style(styles.flaky))?;
        }
        write!(writer, ", {} failed", self.failed.style(styles.fail))?;
        if self.other() > 0 {
            write!(writer, ", {} other", self.other().style(styles.skip))?;
        }
        writeln!(writer)
    }
}
