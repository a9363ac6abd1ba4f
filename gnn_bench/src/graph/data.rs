use burn::prelude::*;

/// Edge structure of a graph living on a burn device, plus the per-node
/// normalization coefficient once it has been attached.
#[derive(Debug, Clone)]
pub struct GraphData<B: Backend> {
    src: Tensor<B, 1, Int>,
    dst: Tensor<B, 1, Int>,
    norm: Option<Tensor<B, 2>>,
    node_len: usize,
    edge_len: usize,
}

impl<B: Backend> GraphData<B> {
    /// Builds the graph from parallel source/destination id lists.
    ///
    /// Endpoints are trusted to be `< node_len`; `GraphDataset` checks this
    /// before handing the edges over.
    pub fn from_edges(src: &[i64], dst: &[i64], node_len: usize, device: &B::Device) -> Self {
        debug_assert_eq!(src.len(), dst.len(), "src and dst must have one entry per edge");
        let edge_len = src.len();

        let src = Tensor::<B, 1, Int>::from_data(TensorData::new(src.to_vec(), [edge_len]), device);
        let dst = Tensor::<B, 1, Int>::from_data(TensorData::new(dst.to_vec(), [edge_len]), device);

        GraphData {
            src,
            dst,
            norm: None,
            node_len,
            edge_len,
        }
    }

    pub fn get_node_len(&self) -> usize {
        self.node_len
    }

    pub fn get_edge_len(&self) -> usize {
        self.edge_len
    }

    pub fn device(&self) -> B::Device {
        self.src.device()
    }

    /// Number of incoming edges per node, as floats. Shape `[N]`.
    pub fn in_degrees(&self) -> Tensor<B, 1> {
        let device = self.device();
        let zeros = Tensor::<B, 1>::zeros([self.node_len], &device);
        if self.edge_len == 0 {
            return zeros;
        }
        let ones = Tensor::<B, 1>::ones([self.edge_len], &device);
        zeros.select_assign(0, self.dst.clone(), ones)
    }

    /// `deg^-0.5` per node with the infinite entries of isolated nodes set
    /// to zero. Shape `[N, 1]` so it broadcasts against `[N, F]` features.
    pub fn symmetric_norm(&self) -> Tensor<B, 2> {
        let degs = self.in_degrees();
        let norm = degs.clone().powf_scalar(-0.5);
        let norm = norm.mask_fill(degs.equal_elem(0.0), 0.0);
        norm.unsqueeze_dim(1)
    }

    /// Computes the normalization from the current edges and stores it on
    /// the graph.
    pub fn attach_norm(&mut self) {
        self.norm = Some(self.symmetric_norm());
    }

    /// The attached normalization, `None` until `attach_norm` has run.
    pub fn norm(&self) -> Option<Tensor<B, 2>> {
        self.norm.clone()
    }

    /// Copy-source message passing with sum reduction: row `v` of the result
    /// is the sum of `h[u]` over every edge `u -> v`.
    pub fn copy_src_sum(&self, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let [_, width] = h.dims();
        let out = Tensor::<B, 2>::zeros([self.node_len, width], &h.device());
        if self.edge_len == 0 {
            return out;
        }
        let messages = h.select(0, self.src.clone());
        out.select_assign(0, self.dst.clone(), messages)
    }
}
