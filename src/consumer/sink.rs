use crate::consumer::classifier::ClassificationResult;
use crate::error::{KnockstreamError, Result};
use crate::wire;
use std::io::Write;

/// Pluggable output for inference results.
/// Pairs with the line reader for input - this handles classification output.
pub trait PredictionSink: Send {
    /// Handle one result. Called once per successful inference.
    fn handle(&mut self, result: &ClassificationResult) -> Result<()>;

    /// Called at end of input.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Writes `PRED` lines, flushing after each so a reading process sees
/// results as they happen.
pub struct PredLineSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> PredLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl PredLineSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> PredictionSink for PredLineSink<W> {
    fn handle(&mut self, result: &ClassificationResult) -> Result<()> {
        writeln!(self.writer, "{}", wire::format_prediction(result))?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pred"
    }
}

/// Writes one JSON object per result: `{"scores":[["noise",0.1],...]}`.
pub struct JsonSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> PredictionSink for JsonSink<W> {
    fn handle(&mut self, result: &ClassificationResult) -> Result<()> {
        let json = serde_json::to_string(result).map_err(|e| KnockstreamError::Other(e.to_string()))?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Sink that keeps every result in memory.
#[derive(Debug, Default)]
pub struct CollectorSink {
    results: Vec<ClassificationResult>,
    finished: bool,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[ClassificationResult] {
        &self.results
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl PredictionSink for CollectorSink {
    fn handle(&mut self, result: &ClassificationResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

impl<S: PredictionSink + ?Sized> PredictionSink for Box<S> {
    fn handle(&mut self, result: &ClassificationResult) -> Result<()> {
        (**self).handle(result)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
