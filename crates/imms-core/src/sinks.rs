//! Outcome sink implementations.

use std::io::Write;

use imms_model::OutcomeRecord;

use crate::error::SinkError;
use crate::ports::OutcomeSink;

/// Keeps every record in memory, in publish order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<OutcomeRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<OutcomeRecord> {
        self.records
    }
}

impl OutcomeSink for MemorySink {
    fn publish(&mut self, record: &OutcomeRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutcomeSink for JsonLinesSink<W> {
    fn publish(&mut self, record: &OutcomeRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Publishes each record to several sinks, in registration order.
///
/// Stops at the first sink that fails.
#[derive(Default)]
pub struct MultiSink<'a> {
    sinks: Vec<Box<dyn OutcomeSink + 'a>>,
}

impl<'a> MultiSink<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    #[must_use]
    pub fn with(mut self, sink: impl OutcomeSink + 'a) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: impl OutcomeSink + 'a) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl OutcomeSink for MultiSink<'_> {
    fn publish(&mut self, record: &OutcomeRecord) -> Result<(), SinkError> {
        self.sinks.iter_mut().try_for_each(|sink| sink.publish(record))
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.sinks.iter_mut().try_for_each(|sink| sink.finish())
    }
}
