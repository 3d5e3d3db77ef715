//! Table rows for the console and the plain-text sample dump.
//!
//! The dump holds one line per supported rate, ascending:
//! `<baud> <sample_0_ns> <sample_1_ns> ...`

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use clap::ValueEnum;
use indicatif::ProgressBar;

use crate::constants::DEFAULT_DISPLAY_DIVISOR;
use crate::error::{LatencyError, LatencyResult};
use crate::interface::BaudRate;
use crate::stats::{RateResult, SweepResult};
use crate::sweep::SweepObserver;
use crate::util::create_progress_bar;

/// Scale used for the console table. The dump is always in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DisplayUnit {
    #[value(name = "ns")]
    Nanoseconds,

    #[default]
    #[value(name = "us")]
    Microseconds,

    #[value(name = "ms")]
    Milliseconds,
}

impl DisplayUnit {
    pub fn divisor(&self) -> u64 {
        match self {
            DisplayUnit::Nanoseconds => 1,
            DisplayUnit::Microseconds => DEFAULT_DISPLAY_DIVISOR,
            DisplayUnit::Milliseconds => DEFAULT_DISPLAY_DIVISOR * DEFAULT_DISPLAY_DIVISOR,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayUnit::Nanoseconds => "ns",
            DisplayUnit::Microseconds => "us",
            DisplayUnit::Milliseconds => "ms",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    unit: DisplayUnit,
}

impl Reporter {
    pub fn new(unit: DisplayUnit) -> Self {
        Reporter { unit }
    }

    pub fn unit_banner(&self) -> String {
        format!("Time shown in {}", self.unit.label())
    }

    pub fn header(&self) -> String {
        format!(
            "{:>7}  {:>10} {:>10} {:>10} {:>10} {:>10}",
            "Speed", "Ideal", "Minimum", "Average", "Maximum", "Delta"
        )
    }

    /// Rate and ideal columns, known before the port is even opened
    pub fn row_prefix(&self, baud: BaudRate, ideal_ns: u64) -> String {
        format!("{:>7}: {:>10} ", baud, ideal_ns / self.unit.divisor())
    }

    /// Measured columns and the `*T`/`*E` marker, or `(Unsupported)`
    pub fn row_suffix(&self, result: &RateResult) -> String {
        let (Some(m), Some(delta)) = (&result.measurement, result.delta_ns()) else {
            return "(Unsupported)".to_string();
        };

        let div = self.unit.divisor();
        let marker = if m.timed_out {
            "*T "
        } else if m.has_errors {
            "*E "
        } else {
            ""
        };

        format!(
            "{:>10} {:>10} {:>10} {:>10}{}",
            m.min_ns / div,
            m.avg_ns / div,
            m.max_ns / div,
            delta / div as i64,
            marker
        )
    }

    pub fn format_row(&self, result: &RateResult) -> String {
        format!(
            "{}{}",
            self.row_prefix(result.baud, result.ideal_ns),
            self.row_suffix(result)
        )
    }

    /// Write every supported rate's samples, ascending by rate
    pub fn persist<W: Write>(&self, results: &SweepResult, mut writer: W) -> LatencyResult<()> {
        for (baud, result) in results {
            let Some(samples) = result.samples() else {
                continue;
            };

            let mut line = baud.to_string();
            for sample in samples {
                line.push(' ');
                line.push_str(&sample.to_string());
            }
            writeln!(writer, "{}", line)
                .map_err(|e| LatencyError::Output(format!("Failed to write results: {}", e)))?;
        }

        writer
            .flush()
            .map_err(|e| LatencyError::Output(format!("Failed to flush results: {}", e)))?;
        Ok(())
    }

    /// Parse a dump written by [`Reporter::persist`]
    pub fn load<R: BufRead>(reader: R) -> LatencyResult<BTreeMap<BaudRate, Vec<u64>>> {
        let mut loaded = BTreeMap::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line
                .map_err(|e| LatencyError::Output(format!("Failed to read results: {}", e)))?;
            let mut fields = line.split_whitespace();
            let Some(baud) = fields.next() else {
                continue;
            };

            let malformed =
                |what: &str| LatencyError::Output(format!("Line {}: bad {}", number + 1, what));
            let baud: BaudRate = baud.parse().map_err(|_| malformed("baud rate"))?;
            let samples = fields
                .map(|field| field.parse::<u64>().map_err(|_| malformed("sample")))
                .collect::<LatencyResult<Vec<_>>>()?;

            loaded.insert(baud, samples);
        }

        Ok(loaded)
    }
}

/// Streams table rows to `out` as rates complete.
///
/// Without a progress bar the rate and ideal columns are printed as soon as
/// a rate starts, so a slow rate shows what it is working on. With a
/// progress bar the whole row is printed once the rate is done.
pub struct ConsoleReporter<W: Write> {
    reporter: Reporter,
    out: W,
    show_progress: bool,
    progress: Option<ProgressBar>,
    sample_count: u64,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(reporter: Reporter, out: W, sample_count: usize) -> Self {
        ConsoleReporter {
            reporter,
            out,
            show_progress: false,
            progress: None,
            sample_count: sample_count as u64,
        }
    }

    pub fn progress_bar(&mut self, enable: bool) {
        self.show_progress = enable;
    }

    pub fn print_header(&mut self) -> LatencyResult<()> {
        let banner = self.reporter.unit_banner();
        let header = self.reporter.header();
        writeln!(self.out, "{}", banner).map_err(console_error)?;
        self.write_line(&header)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, text: &str) -> LatencyResult<()> {
        write!(self.out, "{}\r\n", text).map_err(console_error)?;
        self.out.flush().map_err(console_error)
    }
}

impl<W: Write> SweepObserver for ConsoleReporter<W> {
    fn rate_started(&mut self, baud: BaudRate, ideal_ns: u64) -> LatencyResult<()> {
        if self.show_progress {
            self.progress = Some(create_progress_bar(
                self.sample_count,
                &format!("{} baud", baud),
            ));
            return Ok(());
        }

        let prefix = self.reporter.row_prefix(baud, ideal_ns);
        write!(self.out, "{}", prefix).map_err(console_error)?;
        self.out.flush().map_err(console_error)
    }

    fn sample_recorded(&mut self, _baud: BaudRate, _index: usize) {
        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
    }

    fn rate_finished(&mut self, result: &RateResult) -> LatencyResult<()> {
        if !self.show_progress {
            let suffix = self.reporter.row_suffix(result);
            return self.write_line(&suffix);
        }

        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
        let row = self.reporter.format_row(result);
        self.write_line(&row)
    }
}

fn console_error(e: std::io::Error) -> LatencyError {
    LatencyError::Output(format!("Failed to write to console: {}", e))
}
