use crate::config::{BenchArgs, TrainingConfig};
use crate::error::Result;
use crate::graph::data::GraphData;
use crate::graph::dataset::GraphDataset;
use crate::graph::model::{
    GcnConfig, GinConfig, ModelKind, NodeClassifier, GCN_NUM_LAYERS, GIN_HIDDEN_DIM,
    GIN_NUM_LAYERS,
};
use crate::graph::report::EpochTimings;
use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use std::time::Instant;
use tracing::{debug, info, warn, Level};

/// Runs `config.num_epochs` full-batch epochs and records each epoch's
/// wall-clock time.
///
/// Gradients come back fresh from every `backward()` and the autodiff
/// backend is the training mode, so there is no separate zero-grad or
/// train-mode step.
pub fn train<B, M>(
    mut model: M,
    graph: &GraphData<B>,
    features: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
    config: &TrainingConfig,
) -> (M, EpochTimings)
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + NodeClassifier<B>,
{
    let device = features.device();
    let loss_fn = CrossEntropyLossConfig::new().init(&device);
    let mut optim = config.optimizer.init::<B, M>();
    let mut timings = EpochTimings::new();

    for epoch in 0..config.num_epochs {
        let start = Instant::now();

        let logits = model.forward(graph, features.clone());
        debug_assert_eq!(logits.dims()[1], model.num_classes());
        let loss = loss_fn.forward(logits, labels.clone());
        let loss_value = loss.clone();

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(config.learning_rate, model, grads);
        B::sync(&device);

        let elapsed = start.elapsed();
        timings.push(elapsed);

        // into_scalar syncs with the device, so it stays outside the timed region
        if tracing::enabled!(Level::DEBUG) {
            let loss_value: f32 = loss_value.into_scalar().elem();
            debug!(
                "epoch {}/{}: loss {:.4}, {:.3} ms",
                epoch + 1,
                config.num_epochs,
                loss_value,
                elapsed.as_secs_f64() * 1e3
            );
        }
    }

    (model, timings)
}

/// Loads the dataset named by `args`, builds the configured model and runs
/// the timed training loop on `device`.
pub fn run<B: AutodiffBackend>(
    args: &BenchArgs,
    config: &TrainingConfig,
    device: B::Device,
) -> Result<EpochTimings> {
    let path = args.dataset_path();
    let dataset = GraphDataset::load(&path, args.format, args.dim, args.classes)?;

    B::seed(config.seed);

    let features = dataset.features::<B>(&device);
    let labels = dataset.labels::<B>(&device);
    let in_feats = features.dims()[1];
    let n_classes = dataset.num_classes;

    let mut graph = dataset.graph::<B>(&device);
    graph.attach_norm();
    debug!(
        "graph on device: {} nodes, {} edges",
        graph.get_node_len(),
        graph.get_edge_len()
    );

    info!(
        "training {:?} for {} epochs (lr {}, seed {})",
        config.model, config.num_epochs, config.learning_rate, config.seed
    );

    let timings = match config.model {
        ModelKind::Gcn => {
            let model = GcnConfig::new(in_feats, args.hidden, n_classes)
                .with_n_layers(GCN_NUM_LAYERS)
                .init::<B>(&device);
            train(model, &graph, features, labels, config).1
        }
        ModelKind::Gin => {
            if args.hidden != GIN_HIDDEN_DIM {
                warn!(
                    "GIN uses a fixed hidden width of {}, ignoring --hidden {}",
                    GIN_HIDDEN_DIM, args.hidden
                );
            }
            let model = GinConfig::new(in_feats, n_classes)
                .with_hidden_dim(GIN_HIDDEN_DIM)
                .with_num_layers(GIN_NUM_LAYERS)
                .init::<B>(&device);
            train(model, &graph, features, labels, config).1
        }
    };

    Ok(timings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use clap::Parser;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    type B = Autodiff<NdArray<f32>>;

    fn setup(n: usize, dim: usize) -> (GraphData<B>, Tensor<B, 2>, Tensor<B, 1, Int>) {
        let device = Default::default();
        let src: Vec<i64> = (0..n as i64).collect();
        let dst: Vec<i64> = (0..n as i64).map(|i| (i + 1) % n as i64).collect();
        let mut graph = GraphData::from_edges(&src, &dst, n, &device);
        graph.attach_norm();

        let features = Tensor::ones([n, dim], &device);
        let labels = Tensor::from_data(
            TensorData::new((0..n as i64).map(|i| i % 3).collect::<Vec<_>>(), [n]),
            &device,
        );
        (graph, features, labels)
    }

    #[test]
    fn five_epochs_give_five_samples() {
        let (graph, features, labels) = setup(6, 4);
        let model = GcnConfig::new(4, 8, 3).init::<B>(&Default::default());
        let config = TrainingConfig::default_adam().with_num_epochs(5);

        let (_, timings) = train(model, &graph, features, labels, &config);
        assert_eq!(timings.len(), 5);
        assert!(timings.mean_ms().unwrap() >= 0.0);
    }

    #[test]
    fn zero_epochs_give_no_samples() {
        let (graph, features, labels) = setup(6, 4);
        let model = GinConfig::new(4, 3).init::<B>(&Default::default());
        let config = TrainingConfig::default_adam().with_num_epochs(0);

        let (_, timings) = train(model, &graph, features, labels, &config);
        assert!(timings.is_empty());
        assert_eq!(timings.mean_ms(), None);
    }

    #[test]
    fn training_changes_parameters() {
        let (graph, features, labels) = setup(6, 4);
        let model = GinConfig::new(4, 3).init::<B>(&Default::default());
        let before = model.forward(&graph, features.clone()).into_data();
        let config = TrainingConfig::default_adam().with_num_epochs(3);

        let (model, _) = train(model, &graph, features.clone(), labels, &config);
        let after = model.forward(&graph, features).into_data();
        assert_ne!(before, after);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn debug_log_reports_epoch_loss() {
        let (graph, features, labels) = setup(6, 4);
        let model = GcnConfig::new(4, 8, 3).init::<B>(&Default::default());
        let config = TrainingConfig::default_adam().with_num_epochs(2);

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let (_, timings) = tracing::subscriber::with_default(subscriber, || {
            train(model, &graph, features, labels, &config)
        });
        assert_eq!(timings.len(), 2);

        let logs = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("epoch 1/2: loss "), "{logs}");
        assert!(logs.contains("epoch 2/2: loss "), "{logs}");
    }

    #[test]
    fn run_end_to_end_on_edge_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("ring.txt")).unwrap();
        writeln!(file, "0 1\n1 2\n2 3\n3 0").unwrap();

        let args = BenchArgs::parse_from([
            "gnn_bench",
            "--dataset",
            "ring",
            "--data-dir",
            dir.path().to_str().unwrap(),
            "--format",
            "txt",
            "--gpu",
            "-1",
            "--n-epochs",
            "2",
            "--dim",
            "8",
            "--classes",
            "4",
        ]);
        let config = args.training_config().unwrap();
        let timings = run::<B>(&args, &config, Default::default()).unwrap();
        assert_eq!(timings.len(), 2);

        let config = config.with_model(ModelKind::Gcn);
        let timings = run::<B>(&args, &config, Default::default()).unwrap();
        assert_eq!(timings.len(), 2);
    }

    #[test]
    fn run_reports_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let args = BenchArgs::parse_from([
            "gnn_bench",
            "--dataset",
            "absent",
            "--data-dir",
            dir.path().to_str().unwrap(),
        ]);
        let config = args.training_config().unwrap();
        assert!(run::<B>(&args, &config, Default::default()).is_err());
    }
}
