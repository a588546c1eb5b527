//! Shared test fixtures for the wugsim workspace.
//!
//! Provides a planted-partition ground-truth generator and a tracing
//! initialiser for tests. The generator builds fully materialized WUGs with a
//! known sense inventory, which is what simulation and clustering tests need
//! as a reference point.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};

use wugsim_core::WeightedGraph;

/// Edge weight between usages of the same sense.
const INTRA_SENSE_WEIGHT: f64 = 4.0;
/// Edge weight between usages of different senses.
const INTER_SENSE_WEIGHT: f64 = 1.0;
/// Redraw budget before falling back to equally sized senses.
const SIZE_DRAW_ATTEMPTS: usize = 64;

/// A generated ground truth with its known sense inventory.
#[derive(Clone, Debug)]
pub struct PlantedWug {
    /// Fully materialized ground-truth graph over `[0, nodes)`.
    pub graph: WeightedGraph,
    /// True sense label per node.
    pub labels: Vec<i64>,
    /// Sense sizes in label order, descending.
    pub community_sizes: Vec<usize>,
}

/// Generates a planted-partition WUG.
///
/// Sense sizes follow a log-normal shape with the given spread, redrawn until
/// every sense holds at least `min_community_size` nodes (an equal split is
/// used when the spread makes that unattainable). Same-sense pairs carry
/// weight 4, cross-sense pairs weight 1, and every pair is materialized.
///
/// # Examples
/// ```
/// use wugsim_test_support::planted_wug;
///
/// let wug = planted_wug(30, 3, 0.5, 2, 7);
/// assert_eq!(wug.graph.number_of_nodes(), 30);
/// assert_eq!(wug.community_sizes.len(), 3);
/// assert_eq!(wug.graph.number_of_edges(), 30 * 29 / 2);
/// ```
///
/// # Panics
/// Panics when `communities` is zero or exceeds `nodes`.
#[must_use]
pub fn planted_wug(
    nodes: usize,
    communities: usize,
    size_spread: f64,
    min_community_size: usize,
    seed: u64,
) -> PlantedWug {
    assert!(communities > 0, "a WUG needs at least one sense");
    assert!(
        communities <= nodes,
        "cannot plant {communities} senses into {nodes} nodes"
    );

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut sizes = draw_community_sizes(nodes, communities, size_spread, min_community_size, &mut rng);
    sizes.sort_unstable_by(|a, b| b.cmp(a));

    let mut labels = Vec::with_capacity(nodes);
    for (sense, &size) in sizes.iter().enumerate() {
        labels.extend(std::iter::repeat(sense as i64).take(size));
    }

    let mut graph = WeightedGraph::new();
    for node in 0..nodes {
        graph.add_node(node);
    }
    for u in 0..nodes {
        for v in (u + 1)..nodes {
            let weight = if labels[u] == labels[v] {
                INTRA_SENSE_WEIGHT
            } else {
                INTER_SENSE_WEIGHT
            };
            graph
                .add_edge(u, v, weight)
                .expect("planted pairs are distinct");
        }
    }

    PlantedWug {
        graph,
        labels,
        community_sizes: sizes,
    }
}

/// Log-normally shaped sense sizes summing to `nodes`.
fn draw_community_sizes(
    nodes: usize,
    communities: usize,
    size_spread: f64,
    min_community_size: usize,
    rng: &mut SmallRng,
) -> Vec<usize> {
    let spread = size_spread.max(f64::EPSILON);
    let shape = LogNormal::new(0.0, spread).expect("spread is finite and positive");

    for _ in 0..SIZE_DRAW_ATTEMPTS {
        let raw: Vec<f64> = (0..communities).map(|_| shape.sample(rng)).collect();
        let total: f64 = raw.iter().sum();
        let mut sizes: Vec<usize> = raw
            .iter()
            .map(|share| ((share / total) * nodes as f64).round() as usize)
            .collect();

        balance_to_total(&mut sizes, nodes, rng);
        if sizes.iter().all(|&size| size >= min_community_size) {
            return sizes;
        }
    }

    equal_split(nodes, communities)
}

/// Nudges rounded sizes until they sum to exactly `nodes`.
fn balance_to_total(sizes: &mut [usize], nodes: usize, rng: &mut SmallRng) {
    loop {
        let total: usize = sizes.iter().sum();
        if total == nodes {
            return;
        }
        let slot = rng.gen_range(0..sizes.len());
        if total < nodes {
            sizes[slot] += 1;
        } else if sizes[slot] > 0 {
            sizes[slot] -= 1;
        }
    }
}

fn equal_split(nodes: usize, communities: usize) -> Vec<usize> {
    let base = nodes / communities;
    let remainder = nodes % communities;
    (0..communities)
        .map(|i| base + usize::from(i < remainder))
        .collect()
}

/// Installs a fmt tracing subscriber for tests; repeated calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(20, 1)]
    #[case(20, 4)]
    #[case(21, 5)]
    fn planted_wugs_are_complete_and_consistent(
        #[case] nodes: usize,
        #[case] communities: usize,
    ) {
        let wug = planted_wug(nodes, communities, 0.5, 2, 3);

        assert_eq!(wug.graph.number_of_nodes(), nodes);
        assert_eq!(wug.graph.number_of_edges(), nodes * (nodes - 1) / 2);
        assert_eq!(wug.labels.len(), nodes);
        assert_eq!(wug.community_sizes.iter().sum::<usize>(), nodes);
        assert_eq!(wug.community_sizes.len(), communities);

        for u in 0..nodes {
            for v in (u + 1)..nodes {
                let expected = if wug.labels[u] == wug.labels[v] { 4.0 } else { 1.0 };
                assert_eq!(wug.graph.get_edge(u, v), Some(expected));
            }
        }
    }

    #[test]
    fn sizes_come_out_descending() {
        let wug = planted_wug(50, 5, 0.9, 2, 11);
        for pair in wug.community_sizes.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn identical_seeds_generate_identical_wugs() {
        let left = planted_wug(30, 3, 0.7, 2, 9);
        let right = planted_wug(30, 3, 0.7, 2, 9);
        assert_eq!(left.labels, right.labels);
        assert_eq!(left.community_sizes, right.community_sizes);
    }
}
