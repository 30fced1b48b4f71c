use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crate::queue::BoundedQueue;
use crate::record::Record;
use crate::sink::Sink;
use crate::transform::{Transform, Transformed};
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Anything that can take ownership of a record for further processing.
///
/// An upstream stage forwards its outputs through this trait, so it only ever
/// holds a shared handle to the stage after it.
pub trait Acceptor: Send + Sync {
    /// Name of the accepting stage
    fn name(&self) -> &str;

    /// Hand a record over; fails if the acceptor cannot take it
    fn place_work(&self, record: Record) -> Result<()>;
}

/// Lifecycle of a stage's worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Created, worker not yet running
    Init,
    /// Worker is consuming records
    Running,
    /// End of stream seen, forwarding it downstream
    Draining,
    /// Worker loop has exited
    Finished,
    /// Worker thread has been joined
    Joined,
}

/// State shared between a [`Stage`] handle, its worker, and the upstream stage
struct StageCore {
    name: String,
    transform: Arc<dyn Transform>,
    queue: BoundedQueue<Record>,
    downstream: RwLock<Option<Arc<dyn Acceptor>>>,
    sink: Arc<dyn Sink>,
    state: Mutex<StageState>,
    initialized: AtomicBool,
    metrics: StageMetrics,
}

/// Marks the stage finished when the worker leaves its loop, even by panic
struct FinishOnExit<'a>(&'a StageCore);

impl Drop for FinishOnExit<'_> {
    fn drop(&mut self) {
        self.0.set_state(StageState::Finished);
        self.0.queue.signal_finished();
        debug!("[{}] worker finished", self.0.name);
    }
}

impl StageCore {
    fn set_state(&self, state: StageState) {
        *self.state.lock() = state;
    }

    fn downstream(&self) -> Option<Arc<dyn Acceptor>> {
        self.downstream.read().clone()
    }

    /// Worker loop: runs until end of stream or until the queue is finished and drained
    fn run(&self) {
        let _finish = FinishOnExit(self);
        self.set_state(StageState::Running);
        debug!("[{}] worker started", self.name);

        while let Some(record) = self.queue.get() {
            match record {
                Record::Data(payload) => self.process(payload),
                Record::EndOfStream => {
                    self.set_state(StageState::Draining);
                    if let Some(downstream) = self.downstream() {
                        if let Err(e) = downstream.place_work(Record::EndOfStream) {
                            warn!(
                                "[{}] failed to pass end of stream to '{}': {}",
                                self.name,
                                downstream.name(),
                                e
                            );
                            self.metrics.record_forward_failure();
                        }
                    }
                    break;
                }
            }
        }
    }

    fn process(&self, payload: String) {
        let start = Instant::now();
        let outcome = self.transform.apply(&payload);
        self.metrics
            .record_latency(u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX));
        self.metrics.record_processed();

        let output = match outcome {
            Transformed::Output(output) => output,
            Transformed::Drop => {
                self.metrics.record_dropped();
                return;
            }
        };

        let downstream = self.downstream();
        if downstream.is_none() || self.transform.taps_output() {
            self.emit(&output);
        }
        if let Some(downstream) = downstream {
            match downstream.place_work(Record::Data(output)) {
                Ok(()) => self.metrics.record_forwarded(),
                Err(e) => {
                    warn!("[{}] forward to '{}' failed: {}", self.name, downstream.name(), e);
                    self.metrics.record_forward_failure();
                }
            }
        }
    }

    fn emit(&self, output: &str) {
        match self.sink.emit(&self.name, output) {
            Ok(()) => self.metrics.record_emitted(),
            Err(e) => {
                warn!("[{}] sink rejected output: {}", self.name, e);
                self.metrics.record_sink_failure();
            }
        }
    }
}

impl Acceptor for StageCore {
    fn name(&self) -> &str {
        &self.name
    }

    fn place_work(&self, record: Record) -> Result<()> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(PipelineError::NotInitialized(self.name.clone()));
        }
        self.queue.put(record).map_err(PipelineError::from)
    }
}

/// One link of a chain: a bounded queue drained by a dedicated worker thread.
///
/// The worker applies the stage's transform to every record it dequeues and
/// either forwards the output to the attached downstream acceptor or, when the
/// stage is terminal, writes it to the sink. [`Record::EndOfStream`] is passed
/// downstream and stops the worker; it never reaches the transform or the sink.
pub struct Stage {
    core: Arc<StageCore>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Stage {
    /// Create the stage and start its worker.
    ///
    /// The stage is named after its transform. Fails on a zero capacity, when
    /// the queue cannot be allocated, or when the worker thread cannot start.
    pub fn init(transform: Arc<dyn Transform>, capacity: usize, sink: Arc<dyn Sink>) -> Result<Self> {
        let name = transform.name().to_owned();
        if name.is_empty() {
            return Err(PipelineError::InvalidArgument("stage name must not be empty".into()));
        }
        if capacity == 0 {
            return Err(PipelineError::InvalidArgument(format!(
                "stage '{name}' needs a queue capacity greater than zero"
            )));
        }

        let core = Arc::new(StageCore {
            name: name.clone(),
            transform,
            queue: BoundedQueue::new(capacity)?,
            downstream: RwLock::new(None),
            sink,
            state: Mutex::new(StageState::Init),
            initialized: AtomicBool::new(true),
            metrics: StageMetrics::new(),
        });

        let worker_core = Arc::clone(&core);
        let handle = thread::Builder::new()
            .name(format!("stage-{name}"))
            .spawn(move || worker_core.run())
            .map_err(|source| {
                core.initialized.store(false, Ordering::Release);
                core.queue.destroy();
                PipelineError::ThreadSpawn {
                    stage: name.clone(),
                    source,
                }
            })?;

        debug!("[{}] initialized with queue capacity {}", name, capacity);
        Ok(Self {
            core,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Set the acceptor that receives this stage's outputs.
    ///
    /// Attach before feeding records that should cross to the next stage;
    /// outputs produced while no acceptor is attached go to the sink.
    pub fn attach(&self, acceptor: Arc<dyn Acceptor>) {
        debug!("[{}] attached to '{}'", self.core.name, acceptor.name());
        *self.core.downstream.write() = Some(acceptor);
    }

    /// Shared handle through which an upstream stage can feed this one
    pub fn acceptor(&self) -> Arc<dyn Acceptor> {
        self.core.clone()
    }

    /// Move a record into this stage's queue, blocking while it is full
    pub fn place_work(&self, record: impl Into<Record>) -> Result<()> {
        self.core.place_work(record.into())
    }

    /// Stop accepting work. Records already buffered are still processed,
    /// after which the worker exits.
    pub fn close(&self) {
        self.core.queue.signal_finished();
    }

    /// Block until the worker has finished, then join it.
    ///
    /// The join happens exactly once; later calls return immediately.
    pub fn wait_finished(&self) -> Result<()> {
        if !self.core.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        self.core.queue.wait_finished();
        self.join()
    }

    /// Tear the stage down. Idempotent.
    ///
    /// Marks the queue finished so the worker drains what is buffered and
    /// exits, joins it, then discards anything left behind (records queued
    /// after end of stream).
    pub fn fini(&self) -> Result<()> {
        if !self.core.initialized.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        self.core.queue.signal_finished();
        let joined = self.join();

        let discarded = self.core.queue.destroy();
        if discarded > 0 {
            warn!("[{}] discarded {} unprocessed records", self.core.name, discarded);
        }
        self.core.downstream.write().take();
        debug!("[{}] torn down", self.core.name);
        joined
    }

    fn join(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        let Some(handle) = worker.take() else {
            return Ok(());
        };
        let joined = handle.join();
        self.core.set_state(StageState::Joined);
        joined.map_err(|_| PipelineError::WorkerPanicked(self.core.name.clone()))
    }

    /// Get the stage's name
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Get the current lifecycle state
    pub fn state(&self) -> StageState {
        *self.core.state.lock()
    }

    /// Whether the stage still accepts work
    pub fn is_initialized(&self) -> bool {
        self.core.initialized.load(Ordering::Acquire)
    }

    /// Get a reference to the metrics
    pub fn metrics(&self) -> &StageMetrics {
        &self.core.metrics
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        if let Err(e) = self.fini() {
            warn!("[{}] teardown failed: {}", self.core.name, e);
        }
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.core.name)
            .field("state", &self.state())
            .field("capacity", &self.core.queue.capacity())
            .finish()
    }
}
