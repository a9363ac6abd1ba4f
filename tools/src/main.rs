use anyhow::Context;
use clap::Parser;
use gnn_bench::graph::dataset::{DatasetFormat, GraphDataset};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Converts an npz or text edge-list dataset into the `.ghd` graph cache.
#[derive(Parser, Debug)]
#[command(name = "tools")]
struct Arguments {
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    /// embedding width stored features are checked against
    #[arg(long, default_value_t = 96)]
    dim: usize,

    /// class count stored labels are checked against
    #[arg(long, default_value_t = 10)]
    classes: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("tools=info,gnn_bench=info")
        .init();

    let args = Arguments::parse();
    let timer = Instant::now();

    let format = DatasetFormat::from_path(&args.input)?;
    let dataset = GraphDataset::load(&args.input, format, args.dim, args.classes)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    dataset
        .save_cache(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(
        "wrote {} ({} nodes, {} edges) in {:.3} s",
        args.output.display(),
        dataset.num_nodes,
        dataset.num_edges(),
        timer.elapsed().as_secs_f32()
    );

    Ok(())
}
