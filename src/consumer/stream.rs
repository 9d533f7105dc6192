use crate::consumer::classifier::{ClassificationResult, Classifier};
use crate::consumer::driver::InferenceDriver;
use crate::consumer::sink::PredictionSink;
use crate::consumer::window::StreamWindow;
use crate::defaults;
use crate::error::Result;
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use crate::wire;
use std::io::{BufRead, Read};
use std::sync::Arc;

/// What happened to one input line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Blank line, skipped silently.
    Empty,
    /// Unparsable record, skipped; the window is unchanged.
    Malformed,
    /// Value pushed, window not yet full.
    Filling { seen: u64 },
    /// Value pushed and the window classified.
    Classified(ClassificationResult),
    /// Value pushed but the classifier failed for this window.
    ClassifierFailed(String),
}

/// Counters for one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub lines: u64,
    pub empty: u64,
    pub malformed: u64,
    pub inferences: u64,
    pub failures: u64,
}

/// Sequential consumer: one line in, at most one inference out.
pub struct StreamConsumer<C: Classifier> {
    window: StreamWindow,
    driver: InferenceDriver<C>,
    reporter: Arc<dyn ErrorReporter>,
    stats: ConsumerStats,
}

impl<C: Classifier> StreamConsumer<C> {
    /// Consumer with a window sized by the classifier.
    pub fn new(classifier: C) -> Self {
        let size = classifier.window_size();
        Self {
            window: StreamWindow::new(size),
            driver: InferenceDriver::new(classifier),
            reporter: Arc::new(LogReporter),
            stats: ConsumerStats::default(),
        }
    }

    /// Consumer with an explicit window size, checked against the classifier.
    pub fn with_window_size(classifier: C, size: usize) -> Result<Self> {
        let consumer = Self::new(classifier);
        consumer.driver.check_window_size(size)?;
        Ok(consumer)
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Handle one line of the producer protocol.
    pub fn feed_line(&mut self, line: &str) -> LineOutcome {
        self.stats.lines += 1;

        let record = match wire::parse_record(line) {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.stats.empty += 1;
                return LineOutcome::Empty;
            }
            Err(e) => {
                self.stats.malformed += 1;
                log::debug!("Skipping line: {}", e);
                return LineOutcome::Malformed;
            }
        };

        self.window.push(record.imu_magnitude);
        if !self.window.is_full() {
            return LineOutcome::Filling {
                seen: self.window.pushes(),
            };
        }

        match self.driver.infer(&self.window) {
            Ok(result) => {
                self.stats.inferences += 1;
                LineOutcome::Classified(result)
            }
            Err(e) => {
                self.stats.failures += 1;
                let message = e.to_string();
                self.reporter
                    .report("inference", &StationError::Recoverable(message.clone()));
                LineOutcome::ClassifierFailed(message)
            }
        }
    }

    /// Count a line that was discarded before parsing, such as a record
    /// cut off by a dropped connection or one longer than
    /// `defaults::MAX_LINE_BYTES`.
    pub fn reject_line(&mut self, reason: &str) -> LineOutcome {
        self.stats.lines += 1;
        self.stats.malformed += 1;
        log::debug!("Discarding line: {}", reason);
        LineOutcome::Malformed
    }

    /// Handle a line and pass any result to `sink`.
    pub fn process_line(
        &mut self,
        line: &str,
        sink: &mut dyn PredictionSink,
    ) -> Result<LineOutcome> {
        let outcome = self.feed_line(line);
        if let LineOutcome::Classified(result) = &outcome
            && let Err(e) = sink.handle(result)
        {
            self.reporter.report(
                sink.name(),
                &StationError::Fatal(format!("output failed: {}", e)),
            );
            return Err(e);
        }
        Ok(outcome)
    }

    /// Handle one transport message, which may hold many lines.
    pub fn feed_message(&mut self, message: &str, sink: &mut dyn PredictionSink) -> Result<()> {
        for line in message.lines() {
            self.process_line(line, sink)?;
        }
        Ok(())
    }

    /// Consume `reader` to end of input.
    ///
    /// Invalid UTF-8 is replaced rather than treated as an I/O error, so a
    /// corrupt line is skipped like any other malformed record. Lines longer
    /// than `defaults::MAX_LINE_BYTES` are discarded whole. An unterminated
    /// last line is still parsed.
    pub fn run<R: BufRead>(
        &mut self,
        mut reader: R,
        sink: &mut dyn PredictionSink,
    ) -> Result<ConsumerStats> {
        let mut buf = Vec::new();
        let mut overlong = false;
        loop {
            buf.clear();
            let n = (&mut reader)
                .take(defaults::MAX_LINE_BYTES as u64)
                .read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }
            let terminated = buf.ends_with(b"\n");
            if overlong {
                overlong = !terminated;
                continue;
            }
            if !terminated && n == defaults::MAX_LINE_BYTES {
                overlong = true;
                self.reject_line("line too long");
                continue;
            }
            let line = String::from_utf8_lossy(&buf);
            self.process_line(&line, sink)?;
        }
        sink.finish()?;
        log::info!(
            "Input ended after {} lines ({} inferences, {} malformed, {} classifier failures)",
            self.stats.lines,
            self.stats.inferences,
            self.stats.malformed,
            self.stats.failures
        );
        Ok(self.stats)
    }

    pub fn window(&self) -> &StreamWindow {
        &self.window
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    pub fn classifier(&self) -> &C {
        self.driver.classifier()
    }
}
