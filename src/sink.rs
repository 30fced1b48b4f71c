use crate::error::{PipelineError, Result};
use crossbeam::channel::Sender;
use parking_lot::Mutex;
use std::io::{self, Write};

/// Where a terminal stage writes its outputs, one line per record
pub trait Sink: Send + Sync {
    /// Emit one output line produced by `stage`
    fn emit(&self, stage: &str, line: &str) -> Result<()>;
}

/// Writes lines to any `Write`, by default stdout.
///
/// With prefixing on each line reads `[stage] line`.
pub struct WriterSink {
    writer: Mutex<Box<dyn Write + Send>>,
    prefix: bool,
}

impl WriterSink {
    /// Create a sink on stdout with stage-name prefixes
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Create a prefixing sink over an arbitrary writer
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            prefix: true,
        }
    }

    /// Enable or disable the `[stage]` prefix
    pub fn with_prefix(mut self, prefix: bool) -> Self {
        self.prefix = prefix;
        self
    }
}

impl Sink for WriterSink {
    fn emit(&self, stage: &str, line: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        let written = if self.prefix {
            writeln!(writer, "[{stage}] {line}")
        } else {
            writeln!(writer, "{line}")
        };
        written
            .and_then(|()| writer.flush())
            .map_err(|e| PipelineError::Sink(e.to_string()))
    }
}

/// Sends bare output lines over a crossbeam channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<String>,
}

impl ChannelSink {
    /// Create a sink feeding `sender`
    pub fn new(sender: Sender<String>) -> Self {
        Self { sender }
    }
}

impl Sink for ChannelSink {
    fn emit(&self, _stage: &str, line: &str) -> Result<()> {
        self.sender
            .send(line.to_owned())
            .map_err(|_| PipelineError::Sink("output channel disconnected".into()))
    }
}
