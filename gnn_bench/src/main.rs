use anyhow::Context;
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::wgpu::WgpuDevice;
use burn::backend::{Autodiff, NdArray, Wgpu};
use clap::Parser;
use gnn_bench::config::{BenchArgs, DeviceSelector};
use gnn_bench::graph::train::run;
use tracing::info;

type CpuBackend = Autodiff<NdArray<f32>>;
type GpuBackend = Autodiff<Wgpu<f32, i32>>;

fn main() -> anyhow::Result<()> {
    let args = BenchArgs::parse();

    let filter = if args.verbose { "gnn_bench=debug" } else { "gnn_bench=info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    println!("{args:?}");

    let config = args
        .training_config()
        .context("failed to resolve training config")?;

    let timings = match args.device() {
        DeviceSelector::Cpu => {
            info!("running on cpu");
            run::<CpuBackend>(&args, &config, NdArrayDevice::Cpu)
        }
        DeviceSelector::Gpu(index) => {
            info!("running on gpu {index}");
            run::<GpuBackend>(&args, &config, WgpuDevice::DiscreteGpu(index))
        }
    }
    .with_context(|| format!("benchmark on `{}` failed", args.dataset))?;

    if let Some(first) = timings.samples().first() {
        info!(
            "{} epochs timed, first epoch {:.3} ms",
            timings.len(),
            first.as_secs_f64() * 1e3
        );
    }

    println!("{timings}");
    println!();

    Ok(())
}
