//! Word pipeline demonstrating custom and built-in stages
//!
//! Pipeline:
//! 1. Filter: drop empty lines and comments
//! 2. Uppercaser (built-in)
//! 3. Logger (built-in): writes each line and passes it on
//! 4. Exclaim: append "!"
//!
//! Usage: cargo run --example uppercase_chain --release

use stage_chain::{ChainBuilder, FilterTransform, MapTransform, Result, TransformRegistry};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

fn main() -> Result<()> {
    let registry = TransformRegistry::with_builtins();

    let chain = ChainBuilder::new()
        .queue_capacity(8)
        .add_stage(Arc::new(FilterTransform::new("no_comments", |line| {
            !line.is_empty() && !line.starts_with('#')
        })))
        .add_stage(registry.resolve("uppercaser")?)
        .add_stage(registry.resolve("logger")?)
        .add_stage(Arc::new(MapTransform::new("exclaim", |line| format!("{line}!"))))
        .build()?;

    let input = "# greetings\nhello\n\nworld\n<END>\nignored\n";
    let start = Instant::now();
    let summary = chain.feed_lines(Cursor::new(input), "<END>")?;
    let report = chain.shutdown()?;

    eprintln!("Fed {} lines in {:?}", summary.fed, start.elapsed());
    eprint!("{}", report.summary());
    Ok(())
}
