use crate::error::{PipelineError, Result};
use crate::metrics::MetricsSnapshot;
use crate::record::Record;
use crate::sink::{Sink, WriterSink};
use crate::stage::Stage;
use crate::transform::Transform;
use log::{debug, warn};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::io::BufRead;
use std::sync::Arc;

/// Builder for constructing chains
pub struct ChainBuilder {
    transforms: Vec<Arc<dyn Transform>>,
    queue_capacity: usize,
    sink: Option<Arc<dyn Sink>>,
}

impl ChainBuilder {
    /// Queue capacity used when none is configured
    pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

    /// Create a new chain builder
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            sink: None,
        }
    }

    /// Set the queue capacity of every stage
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Append a stage running `transform`
    pub fn add_stage(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Set where the terminal stage writes its output (stdout by default)
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Start every stage and wire each one to the next.
    ///
    /// If any stage fails to start, the stages already started are torn down
    /// and the error is returned.
    pub fn build(self) -> Result<Chain> {
        if self.transforms.is_empty() {
            return Err(PipelineError::NoStages);
        }

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(WriterSink::stdout()));

        let mut stages = Vec::with_capacity(self.transforms.len());
        for transform in self.transforms {
            stages.push(Stage::init(transform, self.queue_capacity, Arc::clone(&sink))?);
        }

        for pair in stages.windows(2) {
            pair[0].attach(pair[1].acceptor());
        }

        debug!(
            "chain built: {}",
            stages.iter().map(Stage::name).collect::<Vec<_>>().join(" -> ")
        );
        Ok(Chain {
            stages,
            input_closed: RwLock::new(false),
        })
    }
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts from [`Chain::feed_lines`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Lines accepted by the first stage
    pub fed: u64,
    /// Lines the first stage rejected
    pub rejected: u64,
    /// Whether input stopped at the end marker rather than at end of file
    pub end_marker_seen: bool,
}

/// Per-stage metrics collected at shutdown
#[derive(Debug, Clone)]
pub struct ChainReport {
    pub stages: Vec<(String, MetricsSnapshot)>,
}

impl ChainReport {
    /// Get a summary of all metrics
    pub fn summary(&self) -> String {
        let mut summary = String::from("Chain Metrics Summary:\n");
        for (i, (name, snapshot)) in self.stages.iter().enumerate() {
            summary.push_str(&format!("  Stage {} ({}): {}\n", i, name, snapshot.format()));
        }
        summary
    }
}

/// A running chain of stages, fed through its first stage
pub struct Chain {
    stages: Vec<Stage>,
    /// Set once end of stream has been accepted. Data puts hold the read
    /// side so none can land behind the end-of-stream record.
    input_closed: RwLock<bool>,
}

impl Chain {
    /// Get the stages in chain order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// A built chain always has at least one stage
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Hand a record to the first stage, blocking while its queue is full.
    ///
    /// Once end of stream has been accepted every further record, including
    /// a second end of stream, fails with [`PipelineError::Finished`].
    pub fn place_work(&self, record: Record) -> Result<()> {
        if record.is_end_of_stream() {
            let mut closed = self.input_closed.write();
            if *closed {
                return Err(PipelineError::Finished);
            }
            self.stages[0].place_work(record)?;
            *closed = true;
            return Ok(());
        }

        let closed = self.input_closed.read();
        if *closed {
            return Err(PipelineError::Finished);
        }
        self.stages[0].place_work(record)
    }

    /// Feed one line of input
    pub fn feed_line(&self, line: &str) -> Result<()> {
        self.place_work(Record::data(line))
    }

    /// Signal that no more input follows
    pub fn finish(&self) -> Result<()> {
        self.place_work(Record::EndOfStream)
    }

    /// Feed every line of `reader` until `end_marker` or end of file, then finish.
    ///
    /// Trailing `\n` / `\r\n` are stripped and invalid UTF-8 is replaced
    /// with U+FFFD rather than ending the read. The end marker line itself is
    /// not fed. End of input is sent even when the reader fails part way.
    pub fn feed_lines<R: BufRead>(&self, reader: R, end_marker: &str) -> Result<FeedSummary> {
        let mut summary = FeedSummary::default();
        let read = self.feed_until_marker(reader, end_marker, &mut summary);
        if !summary.end_marker_seen {
            debug!("input ended without '{}'", end_marker);
        }
        self.finish()?;
        read.map(|()| summary)
    }

    fn feed_until_marker<R: BufRead>(
        &self,
        mut reader: R,
        end_marker: &str,
        summary: &mut FeedSummary,
    ) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }

            let line = String::from_utf8_lossy(&buf);
            if let Cow::Owned(_) = line {
                debug!("replaced invalid UTF-8 in input line {}", summary.fed + summary.rejected + 1);
            }
            if line == end_marker {
                summary.end_marker_seen = true;
                return Ok(());
            }
            match self.feed_line(&line) {
                Ok(()) => summary.fed += 1,
                Err(e) => {
                    warn!("[{}] rejected input: {}", self.stages[0].name(), e);
                    summary.rejected += 1;
                }
            }
        }
    }

    /// Wait for every stage to drain front to back, then tear them all down.
    ///
    /// End of stream is sent first if it has not been already. When a stage
    /// fails to finish cleanly its successor's queue is closed so the rest of
    /// the chain can still drain. The first error is returned after every
    /// stage has been torn down.
    pub fn shutdown(self) -> Result<ChainReport> {
        let mut first_error = None;

        let closed = *self.input_closed.read();
        if !closed {
            debug!("shutdown before end of stream; sending it now");
            if let Err(e) = self.finish() {
                warn!("[{}] could not accept end of stream: {}", self.stages[0].name(), e);
                self.stages[0].close();
            }
        }

        for (i, stage) in self.stages.iter().enumerate() {
            if let Err(e) = stage.wait_finished() {
                warn!("[{}] did not finish cleanly: {}", stage.name(), e);
                if let Some(next) = self.stages.get(i + 1) {
                    next.close();
                }
                first_error.get_or_insert(e);
            }
        }

        for stage in &self.stages {
            if let Err(e) = stage.fini() {
                warn!("[{}] teardown failed: {}", stage.name(), e);
                first_error.get_or_insert(e);
            }
        }

        let report = self.report();
        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Snapshot the metrics of every stage
    pub fn report(&self) -> ChainReport {
        ChainReport {
            stages: self
                .stages
                .iter()
                .map(|stage| (stage.name().to_owned(), stage.metrics().snapshot()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelSink;
    use crate::transform::{FnTransform, Identity, Transformed, Uppercaser};
    use crossbeam::channel::unbounded;
    use std::io::Cursor;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_chain_builder() {
        let (tx, _rx) = unbounded();
        let chain = ChainBuilder::new()
            .queue_capacity(4)
            .add_stage(Arc::new(Identity))
            .add_stage(Arc::new(Uppercaser))
            .sink(Arc::new(ChannelSink::new(tx)))
            .build()
            .unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.stages()[1].name(), "uppercaser");
        chain.shutdown().unwrap();
    }

    #[test]
    fn test_no_stages_error() {
        let result = ChainBuilder::new().build();
        assert!(matches!(result, Err(PipelineError::NoStages)));
    }

    #[test]
    fn test_zero_capacity_aborts_build() {
        let result = ChainBuilder::new()
            .queue_capacity(0)
            .add_stage(Arc::new(Identity))
            .build();
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
    }

    #[test]
    fn test_feed_lines_stops_at_marker() {
        let (tx, rx) = unbounded();
        let chain = ChainBuilder::new()
            .add_stage(Arc::new(Uppercaser))
            .sink(Arc::new(ChannelSink::new(tx)))
            .build()
            .unwrap();

        let input = Cursor::new("one\r\ntwo\n<END>\nthree\n");
        let summary = chain.feed_lines(input, "<END>").unwrap();
        assert_eq!(
            summary,
            FeedSummary {
                fed: 2,
                rejected: 0,
                end_marker_seen: true
            }
        );

        chain.shutdown().unwrap();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["ONE", "TWO"]);
    }

    #[test]
    fn test_feed_lines_finishes_at_eof() {
        let (tx, rx) = unbounded();
        let chain = ChainBuilder::new()
            .add_stage(Arc::new(Identity))
            .sink(Arc::new(ChannelSink::new(tx)))
            .build()
            .unwrap();

        let summary = chain.feed_lines(Cursor::new("last line"), "<END>").unwrap();
        assert!(!summary.end_marker_seen);
        assert_eq!(summary.fed, 1);

        let report = chain.shutdown().unwrap();
        assert_eq!(report.stages[0].1.emitted, 1);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["last line"]);
    }

    #[test]
    fn test_shutdown_without_finish() {
        let (tx, rx) = unbounded();
        let chain = ChainBuilder::new()
            .add_stage(Arc::new(Identity))
            .add_stage(Arc::new(Identity))
            .sink(Arc::new(ChannelSink::new(tx)))
            .build()
            .unwrap();

        chain.feed_line("pending").unwrap();
        let report = chain.shutdown().unwrap();
        assert!(report.summary().contains("Stage 1 (identity)"));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["pending"]);
    }

    #[test]
    fn test_feed_after_finish_is_rejected() {
        let (tx, _rx) = unbounded();
        let chain = ChainBuilder::new()
            .add_stage(Arc::new(Identity))
            .sink(Arc::new(ChannelSink::new(tx)))
            .build()
            .unwrap();

        chain.finish().unwrap();
        chain.stages()[0].wait_finished().unwrap();
        assert!(matches!(chain.feed_line("late"), Err(PipelineError::Finished)));
        chain.shutdown().unwrap();
    }

    #[test]
    fn test_feed_after_finish_rejected_while_stage_busy() {
        let (tx, rx) = unbounded();
        let chain = ChainBuilder::new()
            .add_stage(Arc::new(FnTransform::new("slow", |s: &str| {
                thread::sleep(Duration::from_millis(200));
                Transformed::Output(s.to_owned())
            })))
            .sink(Arc::new(ChannelSink::new(tx)))
            .build()
            .unwrap();

        chain.feed_line("first").unwrap();
        chain.finish().unwrap();
        assert!(matches!(chain.feed_line("late"), Err(PipelineError::Finished)));
        assert!(matches!(chain.finish(), Err(PipelineError::Finished)));

        chain.shutdown().unwrap();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["first"]);
    }

    #[test]
    fn test_concurrent_finish_accepted_once() {
        let (tx, _rx) = unbounded();
        let chain = ChainBuilder::new()
            .add_stage(Arc::new(Identity))
            .sink(Arc::new(ChannelSink::new(tx)))
            .build()
            .unwrap();

        let accepted = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let chain = &chain;
                    s.spawn(move || chain.finish().is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(accepted, 1);
        chain.shutdown().unwrap();
    }

    #[test]
    fn test_feed_lines_survives_invalid_utf8() {
        let (tx, rx) = unbounded();
        let chain = ChainBuilder::new()
            .add_stage(Arc::new(Identity))
            .sink(Arc::new(ChannelSink::new(tx)))
            .build()
            .unwrap();

        let input = Cursor::new(b"a\n\xff\xfe\nb\nc\n<END>\n".to_vec());
        let summary = chain.feed_lines(input, "<END>").unwrap();
        assert_eq!(summary.fed, 4);
        assert!(summary.end_marker_seen);

        chain.shutdown().unwrap();
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec!["a", "\u{FFFD}\u{FFFD}", "b", "c"]
        );
    }
}
