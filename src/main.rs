#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use stage_chain::{ChainBuilder, TransformRegistry, WriterSink, DEFAULT_END_MARKER, VERSION};
use std::io;
use std::sync::Arc;

/// Run lines from stdin through a chain of text-transformation stages.
///
/// Each stage gets its own queue of QUEUE_SIZE items and its own worker thread.
/// Input stops at the end marker line or at end of file.
///
/// Example:
///   echo 'hello' | stage-chain 20 uppercaser rotator logger
#[derive(Parser, Debug)]
#[command(name = "stage-chain", version)]
struct Args {
    /// Maximum number of items in each stage's queue
    #[arg(value_name = "QUEUE_SIZE", required_unless_present = "list")]
    queue_size: Option<usize>,

    /// Names of the stages to chain, in order
    #[arg(value_name = "STAGE", required_unless_present = "list")]
    stages: Vec<String>,

    /// Input line that ends the stream
    #[arg(long, default_value = DEFAULT_END_MARKER)]
    end_marker: String,

    /// Print output lines without the `[stage]` prefix
    #[arg(long)]
    no_prefix: bool,

    /// Print per-stage metrics to stderr at shutdown
    #[arg(long)]
    stats: bool,

    /// List the available stages and exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let registry = TransformRegistry::with_builtins();

    if args.list {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let queue_size = match args.queue_size {
        Some(size) if size > 0 => size,
        _ => bail!("queue size must be positive"),
    };

    info!("Running stage-chain version {VERSION}");

    let mut builder = ChainBuilder::new()
        .queue_capacity(queue_size)
        .sink(Arc::new(WriterSink::stdout().with_prefix(!args.no_prefix)));
    for name in &args.stages {
        let transform = registry
            .resolve(name)
            .with_context(|| format!("available stages: {}", registry.names().collect::<Vec<_>>().join(", ")))?;
        builder = builder.add_stage(transform);
    }
    let chain = builder.build().context("failed to start the chain")?;

    let fed = chain.feed_lines(io::stdin().lock(), &args.end_marker);
    match &fed {
        Ok(summary) => info!("fed {} lines ({} rejected)", summary.fed, summary.rejected),
        Err(e) => warn!("input stopped early: {}", e),
    }

    let report = chain.shutdown().context("chain shutdown failed")?;
    if args.stats {
        eprint!("{}", report.summary());
    }

    println!("Pipeline shutdown complete.");
    fed.context("failed to read input")?;
    Ok(())
}
