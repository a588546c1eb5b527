//! Edge-sampling strategies.
//!
//! A sampler proposes the next batch of node pairs to put in front of the
//! annotators. It sees the read-only ground truth (for the node universe)
//! and the annotated graph built so far (for adaptive decisions); the
//! simulation loop owns the actual annotation and recording.

mod dwug;

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Result, WugError};
use crate::graph::{AnnotatedGraph, WeightedGraph};

pub use self::dwug::{Count, DwugSampler, DwugSamplerBuilder};

/// A strategy proposing candidate pairs for annotation.
///
/// Strategies own their random state; they receive both graphs by borrowed
/// reference and must not retain them. An exhausted pool is never an error:
/// samplers cap at what is available and may return an empty batch.
pub trait Sampler: Send {
    /// Proposes the next batch of candidate pairs.
    fn sample(&mut self, truth: &WeightedGraph, annotated: &AnnotatedGraph) -> Vec<(usize, usize)>;
}

/// Draws a uniformly random pair of distinct nodes, canonically ordered.
fn random_pair(nodes: &[usize], rng: &mut SmallRng) -> Option<(usize, usize)> {
    let mut picked = nodes.choose_multiple(rng, 2).copied();
    match (picked.next(), picked.next()) {
        (Some(u), Some(v)) => Some(crate::graph::canonical_pair(u, v)),
        _ => None,
    }
}

/// Uniform random edge sampling.
///
/// Every batch holds `sample_size` uniformly drawn distinct-node pairs;
/// repeats across batches are expected and feed the multi-judgement medians.
///
/// # Examples
/// ```
/// use wugsim_core::{AnnotatedGraph, RandomSampler, Sampler, WeightedGraph};
///
/// let mut truth = WeightedGraph::new();
/// truth.add_edge(0, 1, 4.0)?;
/// truth.add_edge(1, 2, 1.0)?;
/// let annotated = AnnotatedGraph::new(3);
///
/// let mut sampler = RandomSampler::new(5, 7)?;
/// assert_eq!(sampler.sample(&truth, &annotated).len(), 5);
/// # Ok::<(), wugsim_core::WugError>(())
/// ```
#[derive(Clone, Debug)]
pub struct RandomSampler {
    sample_size: usize,
    rng: SmallRng,
}

impl RandomSampler {
    /// Creates a sampler emitting `sample_size` pairs per round.
    ///
    /// # Errors
    /// Returns [`WugError::ZeroCount`] when `sample_size` is zero.
    pub fn new(sample_size: usize, seed: u64) -> Result<Self> {
        if sample_size == 0 {
            return Err(WugError::ZeroCount {
                name: "sample_size",
            });
        }
        Ok(Self {
            sample_size,
            rng: SmallRng::seed_from_u64(seed),
        })
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, truth: &WeightedGraph, _annotated: &AnnotatedGraph) -> Vec<(usize, usize)> {
        let nodes: Vec<usize> = truth.nodes().collect();
        if nodes.len() < 2 {
            return Vec::new();
        }
        (0..self.sample_size)
            .filter_map(|_| random_pair(&nodes, &mut self.rng))
            .collect()
    }
}

/// Random-walk sampling with teleportation.
///
/// Each step either continues from the walker's position or teleports to a
/// uniformly random node, with teleport probability `teleport`. `teleport = 1`
/// degenerates to uniform random sampling and `teleport = 0` is a pure random
/// walk.
#[derive(Clone, Debug)]
pub struct PageRankSampler {
    sample_size: usize,
    teleport: f64,
    position: Option<usize>,
    rng: SmallRng,
}

impl PageRankSampler {
    /// Creates a walker emitting `sample_size` pairs per round.
    ///
    /// `start` pins the first position; `None` starts at a random node.
    ///
    /// # Errors
    /// Returns [`WugError::ZeroCount`] when `sample_size` is zero and
    /// [`WugError::FractionOutOfRange`] when `teleport` leaves `[0, 1]`.
    pub fn new(sample_size: usize, teleport: f64, start: Option<usize>, seed: u64) -> Result<Self> {
        if sample_size == 0 {
            return Err(WugError::ZeroCount {
                name: "sample_size",
            });
        }
        if !(0.0..=1.0).contains(&teleport) {
            return Err(WugError::FractionOutOfRange {
                name: "teleport",
                got: teleport,
            });
        }
        Ok(Self {
            sample_size,
            teleport,
            position: start,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    fn next_distinct(&mut self, nodes: &[usize], current: usize) -> usize {
        loop {
            if let Some(&candidate) = nodes.choose(&mut self.rng) {
                if candidate != current {
                    return candidate;
                }
            }
        }
    }
}

impl Sampler for PageRankSampler {
    fn sample(&mut self, truth: &WeightedGraph, _annotated: &AnnotatedGraph) -> Vec<(usize, usize)> {
        let nodes: Vec<usize> = truth.nodes().collect();
        if nodes.len() < 2 {
            return Vec::new();
        }

        let mut current = match self.position {
            Some(node) => node,
            None => match nodes.choose(&mut self.rng) {
                Some(&node) => node,
                None => return Vec::new(),
            },
        };

        let mut batch = Vec::with_capacity(self.sample_size);
        for _ in 0..self.sample_size {
            if self.teleport > 0.0 && self.rng.gen_bool(self.teleport) {
                current = self.next_distinct(&nodes, current);
            }
            let next = self.next_distinct(&nodes, current);
            batch.push((current, next));
            current = next;
        }
        self.position = Some(current);
        batch
    }
}

#[cfg(test)]
mod tests;
