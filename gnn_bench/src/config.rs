use crate::error::BenchError;
use crate::graph::dataset::{dataset_path, DatasetFormat};
use crate::graph::model::ModelKind;
use burn::config::Config;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::AdamConfig;
use clap::Parser;
use std::path::{Path, PathBuf};

pub const DEFAULT_GRAPH_DIR: &str = "./data/graphs";

/// Benchmark full-batch GNN training time per epoch.
#[derive(Parser, Debug, Clone)]
#[command(name = "gnn_bench", version)]
pub struct BenchArgs {
    /// dataset name, resolved to `<data-dir>/<dataset>.<format>`
    #[arg(long)]
    pub dataset: String,

    #[arg(long, default_value = DEFAULT_GRAPH_DIR)]
    pub data_dir: PathBuf,

    #[arg(long, value_enum, default_value = "npz")]
    pub format: DatasetFormat,

    /// gpu index, negative runs on the cpu
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub gpu: i32,

    /// number of training epochs
    #[arg(long, default_value_t = 200)]
    pub n_epochs: usize,

    /// input embedding dimension
    #[arg(long, default_value_t = 96)]
    pub dim: usize,

    /// number of hidden gcn units
    #[arg(long, default_value_t = 16)]
    pub hidden: usize,

    /// number of output classes
    #[arg(long, default_value_t = 10)]
    pub classes: usize,

    /// json training config (model variant, optimizer, seed)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

impl BenchArgs {
    pub fn dataset_path(&self) -> PathBuf {
        dataset_path(&self.data_dir, &self.dataset, self.format)
    }

    pub fn device(&self) -> DeviceSelector {
        DeviceSelector::from_index(self.gpu)
    }

    /// The training config from `--config` (or defaults) with `--n-epochs`
    /// applied on top.
    pub fn training_config(&self) -> crate::error::Result<TrainingConfig> {
        let config = match &self.config {
            Some(path) => TrainingConfig::load_from(path)?,
            None => TrainingConfig::default_adam(),
        };
        Ok(config.with_num_epochs(self.n_epochs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelector {
    Cpu,
    Gpu(usize),
}

impl DeviceSelector {
    pub fn from_index(index: i32) -> Self {
        if index < 0 {
            DeviceSelector::Cpu
        } else {
            DeviceSelector::Gpu(index as usize)
        }
    }
}

#[derive(Config)]
pub struct TrainingConfig {
    pub optimizer: AdamConfig,
    #[config(default = "ModelKind::Gin")]
    pub model: ModelKind,
    #[config(default = 200)]
    pub num_epochs: usize,
    #[config(default = 1e-2)]
    pub learning_rate: f64,
    #[config(default = 42)]
    pub seed: u64,
}

impl TrainingConfig {
    /// Adam with weight decay 5e-4 and every other field at its default.
    pub fn default_adam() -> Self {
        TrainingConfig::new(
            AdamConfig::new().with_weight_decay(Some(WeightDecayConfig::new(5e-4))),
        )
    }

    pub fn load_from(path: &Path) -> crate::error::Result<Self> {
        TrainingConfig::load(path)
            .map_err(|err| BenchError::Config(format!("{}: {err}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let args = BenchArgs::parse_from(["gnn_bench", "--dataset", "cora"]);
        assert_eq!(args.gpu, 0);
        assert_eq!(args.n_epochs, 200);
        assert_eq!(args.dim, 96);
        assert_eq!(args.hidden, 16);
        assert_eq!(args.classes, 10);
        assert_eq!(args.format, DatasetFormat::Npz);
        assert_eq!(args.dataset_path(), Path::new(DEFAULT_GRAPH_DIR).join("cora.npz"));
        assert_eq!(args.device(), DeviceSelector::Gpu(0));
    }

    #[test]
    fn negative_gpu_selects_cpu() {
        let args = BenchArgs::parse_from(["gnn_bench", "--dataset", "cora", "--gpu", "-1"]);
        assert_eq!(args.device(), DeviceSelector::Cpu);
        assert_eq!(DeviceSelector::from_index(2), DeviceSelector::Gpu(2));
    }

    #[test]
    fn training_config_defaults() {
        let args = BenchArgs::parse_from(["gnn_bench", "--dataset", "cora", "--n-epochs", "5"]);
        let config = args.training_config().unwrap();
        assert_eq!(config.num_epochs, 5);
        assert_eq!(config.model, ModelKind::Gin);
        assert_eq!(config.learning_rate, 1e-2);
    }

    #[test]
    fn model_kind_comes_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.json");
        TrainingConfig::default_adam()
            .with_model(ModelKind::Gcn)
            .with_num_epochs(7)
            .save(&path)
            .unwrap();

        let args = BenchArgs::parse_from([
            "gnn_bench",
            "--dataset",
            "cora",
            "--config",
            path.to_str().unwrap(),
        ]);
        let config = args.training_config().unwrap();
        assert_eq!(config.model, ModelKind::Gcn);
        // --n-epochs default still wins over the file
        assert_eq!(config.num_epochs, 200);
    }

    #[test]
    fn unreadable_config_is_reported() {
        let Err(err) = TrainingConfig::load_from(Path::new("/nonexistent/train.json")) else {
            panic!("loading a missing config file should fail");
        };
        assert!(matches!(err, BenchError::Config(_)));
    }
}
