use crate::error::{BenchError, Result};
use crate::graph::data::GraphData;
use burn::prelude::*;
use burn::tensor::Distribution;
use npyz::npz::NpzArchive;
use npyz::DType;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk layout of a dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DatasetFormat {
    /// numpy archive with `src_li`, `dst_li`, `num_nodes` and optional `x`, `y`
    Npz,
    /// whitespace separated `src dst` pairs, one edge per line
    Txt,
    /// bincode cache written by `tools`
    Ghd,
}

impl DatasetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DatasetFormat::Npz => "npz",
            DatasetFormat::Txt => "txt",
            DatasetFormat::Ghd => "ghd",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        match ext {
            "npz" => Ok(DatasetFormat::Npz),
            "txt" => Ok(DatasetFormat::Txt),
            "ghd" => Ok(DatasetFormat::Ghd),
            other => Err(BenchError::UnknownFormat(other.to_string())),
        }
    }
}

/// `<dir>/<name>.<ext>`
pub fn dataset_path(dir: &Path, name: &str, format: DatasetFormat) -> PathBuf {
    dir.join(format!("{name}.{}", format.extension()))
}

/// A loaded graph dataset: edge list, node count and optional stored node
/// data. Features and labels missing from the file are sampled when the
/// tensors are built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDataset {
    pub num_nodes: usize,
    pub src: Vec<i64>,
    pub dst: Vec<i64>,
    pub features: Option<Vec<f32>>,
    pub labels: Option<Vec<i64>>,
    pub dim: usize,
    pub num_classes: usize,
}

impl GraphDataset {
    /// Loads `path` as `format` for the given embedding width and class
    /// count, then checks it.
    pub fn load(
        path: &Path,
        format: DatasetFormat,
        dim: usize,
        num_classes: usize,
    ) -> Result<Self> {
        info!("loading {:?} dataset from {}", format, path.display());

        let mut dataset = match format {
            DatasetFormat::Npz => Self::read_npz(path)?,
            DatasetFormat::Txt => Self::read_edge_list(path)?,
            DatasetFormat::Ghd => Self::load_cache(path)?,
        };
        dataset.dim = dim;
        dataset.num_classes = num_classes;
        dataset.validate()?;

        info!(
            "dataset ready: {} nodes, {} edges, dim {}, {} classes",
            dataset.num_nodes,
            dataset.num_edges(),
            dim,
            num_classes
        );
        Ok(dataset)
    }

    pub fn num_edges(&self) -> usize {
        self.src.len()
    }

    /// Every precondition the graph layer and the models rely on.
    pub fn validate(&self) -> Result<()> {
        if self.num_nodes == 0 {
            return Err(BenchError::shape("dataset has no nodes"));
        }
        if self.dim == 0 {
            return Err(BenchError::shape("embedding dimension must be positive"));
        }
        if self.num_classes == 0 {
            return Err(BenchError::shape("class count must be positive"));
        }
        if self.src.len() != self.dst.len() {
            return Err(BenchError::shape(format!(
                "{} source ids but {} destination ids",
                self.src.len(),
                self.dst.len()
            )));
        }

        let num_nodes = self.num_nodes as i64;
        if let Some(bad) = self
            .src
            .par_iter()
            .chain(self.dst.par_iter())
            .find_any(|id| **id < 0 || **id >= num_nodes)
        {
            return Err(BenchError::shape(format!(
                "edge endpoint {bad} outside 0..{}",
                self.num_nodes
            )));
        }

        if let Some(features) = &self.features {
            if features.len() != self.num_nodes * self.dim {
                return Err(BenchError::shape(format!(
                    "feature buffer holds {} values, expected {} nodes x {} dims",
                    features.len(),
                    self.num_nodes,
                    self.dim
                )));
            }
        }

        if let Some(labels) = &self.labels {
            if labels.len() != self.num_nodes {
                return Err(BenchError::shape(format!(
                    "{} labels for {} nodes",
                    labels.len(),
                    self.num_nodes
                )));
            }
            let num_classes = self.num_classes as i64;
            if let Some(bad) = labels.iter().find(|y| **y < 0 || **y >= num_classes) {
                return Err(BenchError::shape(format!(
                    "label {bad} outside 0..{}",
                    self.num_classes
                )));
            }
        }

        Ok(())
    }

    pub fn graph<B: Backend>(&self, device: &B::Device) -> GraphData<B> {
        GraphData::from_edges(&self.src, &self.dst, self.num_nodes, device)
    }

    /// `[N, dim]` node features; stored values when present, else N(0, 1).
    pub fn features<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        match &self.features {
            Some(features) => Tensor::from_data(
                TensorData::new(features.clone(), [self.num_nodes, self.dim]),
                device,
            ),
            None => {
                debug!("sampling {}x{} node features", self.num_nodes, self.dim);
                Tensor::random(
                    [self.num_nodes, self.dim],
                    Distribution::Normal(0.0, 1.0),
                    device,
                )
            }
        }
    }

    /// `[N]` class ids; stored values when present, else uniform over the
    /// classes.
    pub fn labels<B: Backend>(&self, device: &B::Device) -> Tensor<B, 1, Int> {
        match &self.labels {
            Some(labels) => Tensor::from_data(
                TensorData::new(labels.clone(), [self.num_nodes]),
                device,
            ),
            None => {
                debug!("sampling {} node labels", self.num_nodes);
                let top = self.num_classes as f64;
                Tensor::<B, 1>::random([self.num_nodes], Distribution::Uniform(0.0, top), device)
                    .clamp(0.0, (self.num_classes - 1) as f32)
                    .int()
            }
        }
    }

    pub fn save_cache(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|err| BenchError::io(path, err))?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_cache(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| BenchError::io(path, err))?;
        Ok(bincode::deserialize_from(BufReader::new(file))?)
    }

    fn read_npz(path: &Path) -> Result<Self> {
        let mut archive = NpzArchive::open(path).map_err(|err| BenchError::io(path, err))?;

        let src = read_ints(&mut archive, path, "src_li")?
            .ok_or_else(|| BenchError::MissingArray("src_li".to_string()))?;
        let dst = read_ints(&mut archive, path, "dst_li")?
            .ok_or_else(|| BenchError::MissingArray("dst_li".to_string()))?;
        let num_nodes = read_ints(&mut archive, path, "num_nodes")?
            .ok_or_else(|| BenchError::MissingArray("num_nodes".to_string()))?;
        let num_nodes = match num_nodes.as_slice() {
            [n] if *n >= 0 => *n as usize,
            other => {
                return Err(BenchError::shape(format!(
                    "num_nodes must be one non-negative value, got {other:?}"
                )))
            }
        };

        let features = read_floats(&mut archive, path, "x")?;
        let labels = read_ints(&mut archive, path, "y")?;

        Ok(GraphDataset {
            num_nodes,
            src,
            dst,
            features,
            labels,
            dim: 0,
            num_classes: 0,
        })
    }

    fn read_edge_list(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| BenchError::io(path, err))?;
        Self::parse_edge_list(&content)
    }

    /// Parses `src dst` lines. Blank lines and `#` comments are skipped and
    /// the node count is the largest id plus one.
    pub fn parse_edge_list(content: &str) -> Result<Self> {
        let lines: Vec<&str> = content.lines().collect();

        let edges = lines
            .par_iter()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|(idx, line)| parse_edge(idx + 1, line))
            .collect::<Result<Vec<[i64; 2]>>>()?;

        let num_nodes = edges
            .par_iter()
            .map(|[src, dst]| src.max(dst) + 1)
            .max()
            .unwrap_or(0) as usize;
        let (src, dst) = edges.into_iter().map(|[src, dst]| (src, dst)).unzip();

        Ok(GraphDataset {
            num_nodes,
            src,
            dst,
            features: None,
            labels: None,
            dim: 0,
            num_classes: 0,
        })
    }
}

fn parse_edge(line_no: usize, line: &str) -> Result<[i64; 2]> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(BenchError::EdgeList {
            line: line_no,
            reason: format!("expected `src dst`, got `{line}`"),
        });
    }

    let parse = |field: &str| {
        field
            .parse::<i64>()
            .ok()
            .filter(|id| *id >= 0)
            .ok_or_else(|| BenchError::EdgeList {
                line: line_no,
                reason: format!("`{field}` is not a node id"),
            })
    };
    Ok([parse(fields[0])?, parse(fields[1])?])
}

fn dtype_name(dtype: &DType) -> String {
    match dtype {
        DType::Plain(ty) => ty
            .to_string()
            .trim_start_matches(&['<', '>', '|', '='][..])
            .to_string(),
        other => format!("{other:?}"),
    }
}

fn read_ints<R: Read + Seek>(
    archive: &mut NpzArchive<R>,
    path: &Path,
    name: &str,
) -> Result<Option<Vec<i64>>> {
    let Some(npy) = archive.by_name(name).map_err(|err| BenchError::io(path, err))? else {
        return Ok(None);
    };

    let dtype = dtype_name(&npy.dtype());
    let values = match dtype.as_str() {
        "i8" => npy.into_vec::<i64>(),
        "i4" => npy
            .into_vec::<i32>()
            .map(|v| v.into_iter().map(i64::from).collect()),
        "u8" => npy
            .into_vec::<u64>()
            .map(|v| v.into_iter().map(|x| x as i64).collect()),
        "u4" => npy
            .into_vec::<u32>()
            .map(|v| v.into_iter().map(i64::from).collect()),
        _ => {
            return Err(BenchError::UnsupportedDtype {
                name: name.to_string(),
                dtype,
            })
        }
    };
    values.map(Some).map_err(|err| BenchError::io(path, err))
}

fn read_floats<R: Read + Seek>(
    archive: &mut NpzArchive<R>,
    path: &Path,
    name: &str,
) -> Result<Option<Vec<f32>>> {
    let Some(npy) = archive.by_name(name).map_err(|err| BenchError::io(path, err))? else {
        return Ok(None);
    };

    let dtype = dtype_name(&npy.dtype());
    let values = match dtype.as_str() {
        "f4" => npy.into_vec::<f32>(),
        "f8" => npy
            .into_vec::<f64>()
            .map(|v| v.into_iter().map(|x| x as f32).collect()),
        _ => {
            return Err(BenchError::UnsupportedDtype {
                name: name.to_string(),
                dtype,
            })
        }
    };
    values.map(Some).map_err(|err| BenchError::io(path, err))
}
