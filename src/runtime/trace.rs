//! Human-readable simulation trace.
//!
//! Simulation writes one line per step to a caller-supplied [`TraceSink`].
//! Every line is also emitted as a `tracing` event under the
//! `stepsim::simulation` target, so the trace can be collected by any
//! subscriber as well.

use serde_json::Value;
use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

/// Verbosity of a trace line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraceLevel {
    /// What a state is doing: `Running Pass 1`, `Passing`, ...
    Step,
    /// The data after a pipeline stage.
    Detail,
}

/// Destination for simulation trace lines.
pub trait TraceSink {
    fn write_line(&mut self, level: TraceLevel, line: &str);
}

/// Collects lines in memory.
///
/// # Example
///
/// ```rust
/// use stepsim::runtime::{MemorySink, TraceLevel, TraceSink};
///
/// let mut sink = MemorySink::new();
/// sink.write_line(TraceLevel::Step, "Running Pass 1");
/// sink.write_line(TraceLevel::Detail, "State input after applying input path of $: {}");
/// sink.write_line(TraceLevel::Step, "Passing");
///
/// assert_eq!(sink.steps(), vec!["Running Pass 1", "Passing"]);
/// assert_eq!(sink.step_output(), "Running Pass 1\nPassing\n");
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Vec<(TraceLevel, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[(TraceLevel, String)] {
        &self.lines
    }

    pub fn steps(&self) -> Vec<&str> {
        self.at(TraceLevel::Step)
    }

    pub fn details(&self) -> Vec<&str> {
        self.at(TraceLevel::Detail)
    }

    /// Step lines, each terminated by a newline.
    pub fn step_output(&self) -> String {
        self.steps().iter().map(|line| format!("{line}\n")).collect()
    }

    fn at(&self, level: TraceLevel) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.as_str())
            .collect()
    }
}

impl TraceSink for MemorySink {
    fn write_line(&mut self, level: TraceLevel, line: &str) {
        self.lines.push((level, line.to_string()));
    }
}

/// Writes lines to any [`io::Write`]. Detail lines are skipped unless
/// enabled with [`WriterSink::with_details`].
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
    details: bool,
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            details: false,
        }
    }

    pub fn with_details(mut self, details: bool) -> Self {
        self.details = details;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for WriterSink<W> {
    fn write_line(&mut self, level: TraceLevel, line: &str) {
        if level == TraceLevel::Detail && !self.details {
            return;
        }
        if let Err(err) = writeln!(self.writer, "{line}") {
            tracing::warn!(
                target: "stepsim::simulation",
                error = %err,
                "Failed to write trace line"
            );
        }
    }
}

/// Discards every line.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn write_line(&mut self, _level: TraceLevel, _line: &str) {}
}

/// Writes to the sink and mirrors each line to `tracing`, tagged with the
/// state currently running.
pub(crate) struct Tracer<'a> {
    sink: &'a mut dyn TraceSink,
    state: String,
}

impl<'a> Tracer<'a> {
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        Self {
            sink,
            state: String::new(),
        }
    }

    pub fn current_state(&self) -> &str {
        &self.state
    }

    pub fn set_state(&mut self, state: impl Into<String>) {
        self.state = state.into();
    }

    /// Start tracing a state: `Running <name>`.
    pub fn enter(&mut self, state: &str) {
        self.set_state(state);
        self.step(format_args!("Running {state}"));
    }

    pub fn step(&mut self, line: impl fmt::Display) {
        let line = line.to_string();
        tracing::debug!(target: "stepsim::simulation", state = %self.state, "{line}");
        self.sink.write_line(TraceLevel::Step, &line);
    }

    pub fn detail(&mut self, label: impl fmt::Display, value: &Value) {
        let line = format!("{label}: {value}");
        tracing::trace!(target: "stepsim::simulation", state = %self.state, "{line}");
        self.sink.write_line(TraceLevel::Detail, &line);
    }

    pub fn retry(&mut self, error: &str, attempt: u32, limit: u32, delay: Duration) {
        let seconds = delay.as_secs_f64();
        tracing::warn!(
            target: "stepsim::simulation",
            state = %self.state,
            error = error,
            attempt = attempt,
            max_attempts = limit,
            delay_seconds = seconds,
            "Retrying state"
        );
        self.sink.write_line(
            TraceLevel::Step,
            &format!("Retrying {error} after {seconds} seconds (attempt {attempt} of {limit})"),
        );
    }

    pub fn failure(&mut self, error: &str, cause: &str) {
        tracing::error!(
            target: "stepsim::simulation",
            state = %self.state,
            error = error,
            cause = cause,
            "Simulation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writer_sink_skips_details_by_default() {
        let mut sink = WriterSink::new(Vec::new());
        sink.write_line(TraceLevel::Step, "Running A");
        sink.write_line(TraceLevel::Detail, "hidden");

        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "Running A\n");
    }

    #[test]
    fn writer_sink_can_include_details() {
        let mut sink = WriterSink::new(Vec::new()).with_details(true);
        sink.write_line(TraceLevel::Step, "Running A");
        sink.write_line(TraceLevel::Detail, "shown");

        assert_eq!(
            String::from_utf8(sink.into_inner()).unwrap(),
            "Running A\nshown\n"
        );
    }

    #[test]
    fn tracer_formats_lines() {
        let mut sink = MemorySink::new();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.enter("Pass 1");
            tracer.detail("State input after applying input path of $", &json!({"a": 1}));
            tracer.retry("States.ALL", 1, 3, Duration::from_secs(2));
            assert_eq!(tracer.current_state(), "Pass 1");
        }

        assert_eq!(
            sink.steps(),
            vec![
                "Running Pass 1",
                "Retrying States.ALL after 2 seconds (attempt 1 of 3)"
            ]
        );
        assert_eq!(
            sink.details(),
            vec![r#"State input after applying input path of $: {"a":1}"#]
        );
    }

    #[test]
    fn null_sink_accepts_lines() {
        let mut sink = NullSink;
        sink.write_line(TraceLevel::Step, "ignored");
    }
}
