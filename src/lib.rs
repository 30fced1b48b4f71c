//! A chain of text-transformation stages connected by bounded blocking queues.
//!
//! Each stage owns a fixed-capacity queue and one worker thread. The worker
//! takes records off its queue, applies the stage's transform and hands the
//! result to the next stage, or writes it to the sink when the stage is the
//! last one. Shutdown is cooperative: an end-of-stream record travels down the
//! chain and each worker exits once it has passed it on.
//!
//! # Features
//!
//! - Manual-reset event and bounded blocking queue on `parking_lot` locks
//! - One worker thread per stage, FIFO order preserved end to end
//! - Move-only records with a tagged end-of-stream marker
//! - Registry of named transforms; the same transform can back several stages
//! - Per-stage metrics: processed, dropped, forwarded, latency percentiles
//!
//! # Example
//!
//! ```no_run
//! use stage_chain::{ChainBuilder, TransformRegistry};
//!
//! let registry = TransformRegistry::with_builtins();
//! let chain = ChainBuilder::new()
//!     .queue_capacity(20)
//!     .add_stage(registry.resolve("uppercaser")?)
//!     .add_stage(registry.resolve("rotator")?)
//!     .build()?;
//!
//! chain.feed_line("hello")?;
//! chain.finish()?;
//! chain.shutdown()?;
//! # Ok::<(), stage_chain::PipelineError>(())
//! ```

pub mod chain;
pub mod error;
pub mod event;
pub mod metrics;
pub mod queue;
pub mod record;
pub mod registry;
pub mod sink;
pub mod stage;
pub mod transform;

// Re-exports for convenience
pub use chain::{Chain, ChainBuilder, ChainReport, FeedSummary};
pub use error::{PipelineError, PutError, Result};
pub use event::ManualResetEvent;
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use queue::BoundedQueue;
pub use record::Record;
pub use registry::TransformRegistry;
pub use sink::{ChannelSink, Sink, WriterSink};
pub use stage::{Acceptor, Stage, StageState};
pub use transform::{FilterTransform, FnTransform, MapTransform, Transform, Transformed};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Input line that ends the stream when reading text input
pub const DEFAULT_END_MARKER: &str = "<END>";
