use crate::graph::data::GraphData;
use burn::module::Param;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::relu;
use serde::{Deserialize, Serialize};

/// Which network the benchmark trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Gcn,
    Gin,
}

/// Hidden width the GIN variant always uses, whatever `--hidden` says.
pub const GIN_HIDDEN_DIM: usize = 64;
pub const GIN_NUM_LAYERS: usize = 5;
pub const GCN_NUM_LAYERS: usize = 2;

/// Forward contract shared by every model the benchmark can train.
pub trait NodeClassifier<B: Backend> {
    /// Per-node logits, shape `[N, num_classes]`.
    fn forward(&self, graph: &GraphData<B>, features: Tensor<B, 2>) -> Tensor<B, 2>;

    fn num_classes(&self) -> usize;
}

/// `(in, out)` widths of a stack of `num_layers` layers going
/// in -> hidden -> ... -> hidden -> out.
fn layer_widths(input: usize, hidden: usize, output: usize, num_layers: usize) -> Vec<(usize, usize)> {
    (0..num_layers)
        .map(|i| {
            let d_in = if i == 0 { input } else { hidden };
            let d_out = if i + 1 == num_layers { output } else { hidden };
            (d_in, d_out)
        })
        .collect()
}

#[derive(Module, Debug)]
pub struct GcnLayer<B: Backend> {
    linear: Linear<B>,
    bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> GcnLayer<B> {
    /// `norm * A^T (norm * hW) + b`
    pub fn forward(&self, graph: &GraphData<B>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let h = self.linear.forward(h);
        let h = match graph.norm() {
            Some(norm) => {
                let h = graph.copy_src_sum(h * norm.clone());
                h * norm
            }
            None => graph.copy_src_sum(h),
        };
        h + self.bias.val().unsqueeze()
    }
}

#[derive(Module, Debug)]
pub struct Gcn<B: Backend> {
    layers: Vec<GcnLayer<B>>,
    n_classes: usize,
}

#[derive(Config, Debug)]
pub struct GcnConfig {
    in_feats: usize,
    n_hidden: usize,
    n_classes: usize,
    #[config(default = 2)]
    n_layers: usize,
}

impl GcnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Gcn<B> {
        let layers = layer_widths(self.in_feats, self.n_hidden, self.n_classes, self.n_layers)
            .into_iter()
            .map(|(d_in, d_out)| GcnLayer {
                linear: LinearConfig::new(d_in, d_out).with_bias(false).init(device),
                bias: Param::from_tensor(Tensor::zeros([d_out], device)),
            })
            .collect();

        Gcn {
            layers,
            n_classes: self.n_classes,
        }
    }
}

impl<B: Backend> NodeClassifier<B> for Gcn<B> {
    fn forward(&self, graph: &GraphData<B>, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len().saturating_sub(1);
        self.layers
            .iter()
            .enumerate()
            .fold(features, |h, (i, layer)| {
                let h = layer.forward(graph, h);
                if i == last {
                    h
                } else {
                    relu(h)
                }
            })
    }

    fn num_classes(&self) -> usize {
        self.n_classes
    }
}

/// Sum-aggregating isomorphism layer with a fixed `eps` of zero:
/// `Linear((1 + eps) * h + sum of neighbour h)`.
#[derive(Module, Debug)]
pub struct GinLayer<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> GinLayer<B> {
    pub fn forward(&self, graph: &GraphData<B>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let neighbours = graph.copy_src_sum(h.clone());
        self.linear.forward(h + neighbours)
    }
}

#[derive(Module, Debug)]
pub struct Gin<B: Backend> {
    layers: Vec<GinLayer<B>>,
    output_dim: usize,
}

#[derive(Config, Debug)]
pub struct GinConfig {
    input_dim: usize,
    output_dim: usize,
    #[config(default = 64)]
    hidden_dim: usize,
    #[config(default = 5)]
    num_layers: usize,
}

impl GinConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Gin<B> {
        let layers = layer_widths(self.input_dim, self.hidden_dim, self.output_dim, self.num_layers)
            .into_iter()
            .map(|(d_in, d_out)| GinLayer {
                linear: LinearConfig::new(d_in, d_out).init(device),
            })
            .collect();

        Gin {
            layers,
            output_dim: self.output_dim,
        }
    }
}

impl<B: Backend> NodeClassifier<B> for Gin<B> {
    fn forward(&self, graph: &GraphData<B>, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len().saturating_sub(1);
        self.layers
            .iter()
            .enumerate()
            .fold(features, |h, (i, layer)| {
                let h = layer.forward(graph, h);
                if i == last {
                    h
                } else {
                    relu(h)
                }
            })
    }

    fn num_classes(&self) -> usize {
        self.output_dim
    }
}
