//! R-MAT synthetic graph generator.
//!
//! Each edge picks one quadrant of the adjacency matrix per bit of the vertex
//! id, with probabilities `a` (top-left), `b` (top-right), `c` (bottom-left)
//! and `d` (bottom-right). Output depends only on the configuration and the
//! seed, never on how many ranks later consume it.

use crate::graph_error::GraphError;
use crate::topology::graph::RawEdgeList;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RmatConfig {
    /// `2^scale` vertices.
    pub scale: u32,
    /// `edge_factor * 2^scale` generated edges, before mirroring and cleaning.
    pub edge_factor: u32,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    /// Fixed seed; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Drop self-loops and repeated edges.
    pub clean: bool,
    /// Add the reverse of every edge.
    pub undirected: bool,
    /// Attach a uniform `(0, 1]` weight to every edge.
    pub weighted: bool,
}

impl Default for RmatConfig {
    fn default() -> Self {
        Self {
            scale: 10,
            edge_factor: 16,
            a: 0.57,
            b: 0.19,
            c: 0.19,
            d: 0.05,
            seed: Some(42),
            clean: true,
            undirected: true,
            weighted: false,
        }
    }
}

impl RmatConfig {
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn n_vertices(&self) -> u64 {
        1u64 << self.scale
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if self.scale == 0 || self.scale > 40 {
            return Err(GraphError::InvalidGeneratorConfig(format!(
                "scale must be in 1..=40, got {}",
                self.scale
            )));
        }
        if self.edge_factor == 0 {
            return Err(GraphError::InvalidGeneratorConfig("edge_factor must be positive".into()));
        }
        let probs = [self.a, self.b, self.c, self.d];
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(GraphError::InvalidGeneratorConfig(format!(
                "quadrant probabilities must be non-negative, got {probs:?}"
            )));
        }
        let total: f64 = probs.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(GraphError::InvalidGeneratorConfig(format!(
                "quadrant probabilities sum to {total}, expected 1"
            )));
        }
        Ok(())
    }
}

fn sample_edge(cfg: &RmatConfig, rng: &mut SmallRng) -> (u64, u64) {
    let (ab, abc) = (cfg.a + cfg.b, cfg.a + cfg.b + cfg.c);
    let (mut u, mut v) = (0u64, 0u64);
    for bit in (0..cfg.scale).rev() {
        let r: f64 = rng.r#gen();
        let (row, col): (u64, u64) = if r < cfg.a {
            (0, 0)
        } else if r < ab {
            (0, 1)
        } else if r < abc {
            (1, 0)
        } else {
            (1, 1)
        };
        u |= row << bit;
        v |= col << bit;
    }
    (u, v)
}

/// Generate the edge list described by `cfg`. Vertices `0..2^scale` are all
/// declared, isolated ones included.
pub fn generate_rmat(cfg: &RmatConfig) -> Result<RawEdgeList, GraphError> {
    cfg.validate()?;
    let mut rng = match cfg.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let n = cfg.n_vertices();
    let m = n
        .checked_mul(u64::from(cfg.edge_factor))
        .and_then(|m| usize::try_from(m).ok())
        .ok_or_else(|| GraphError::InvalidGeneratorConfig("edge count overflows usize".into()))?;

    let mut edges: Vec<(u64, u64, f32)> = Vec::with_capacity(if cfg.undirected { 2 * m } else { m });
    for _ in 0..m {
        let (u, v) = sample_edge(cfg, &mut rng);
        // (0, 1]: never a zero weight
        let w = if cfg.weighted { 1.0 - rng.r#gen::<f32>() } else { 0.0 };
        edges.push((u, v, w));
    }
    if cfg.undirected {
        let reversed: Vec<_> = edges.iter().map(|&(u, v, w)| (v, u, w)).collect();
        edges.extend(reversed);
    }
    if cfg.clean {
        edges.retain(|&(u, v, _)| u != v);
        edges.par_sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        edges.dedup_by_key(|&mut (u, v, _)| (u, v));
    }

    log::info!(
        "R-MAT scale {} generated {} edges over {n} vertices",
        cfg.scale,
        edges.len()
    );

    let (pairs, weights): (Vec<_>, Vec<_>) = edges.into_iter().map(|(u, v, w)| ((u, v), w)).unzip();
    let raw = RawEdgeList::new(pairs).with_num_vertices(n);
    Ok(if cfg.weighted { raw.with_weights(weights) } else { raw })
}
