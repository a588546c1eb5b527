//! Unit tests for the clustering strategies.

use std::collections::BTreeSet;

use rstest::rstest;

use crate::graph::WeightedGraph;

use super::{
    Clusterer, ConnectedComponentsClusterer, CorrelationClusterer, CorrelationClustererBuilder,
    finalize_clusters,
};

fn clusterer(seed: u64) -> CorrelationClusterer {
    CorrelationClustererBuilder::new()
        .with_max_attempts(50)
        .with_max_iters(2000)
        .with_seed(seed)
        .build()
        .expect("valid configuration")
}

fn signed_graph(edges: &[(usize, usize, f64)]) -> WeightedGraph {
    let mut graph = WeightedGraph::new();
    for &(u, v, w) in edges {
        graph.add_edge(u, v, w).expect("distinct endpoints");
    }
    graph
}

fn loss_of(graph: &WeightedGraph, clusters: &crate::graph::Clustering) -> f64 {
    let mut label = std::collections::BTreeMap::new();
    for (&id, nodes) in clusters {
        for &node in nodes {
            label.insert(node, id);
        }
    }
    let mut loss = 0.0;
    for (u, v, w) in graph.edges() {
        let same = label.get(&u) == label.get(&v);
        if w >= 0.0 && !same {
            loss += w;
        } else if w < 0.0 && same {
            loss += w.abs();
        }
    }
    loss
}

#[test]
fn planted_clique_with_isolated_node_is_recovered_exactly() {
    let mut graph = signed_graph(&[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]);
    graph.add_node(3);

    let clusters = clusterer(1).cluster(&graph).expect("clustering succeeds");

    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters.get(&0), Some(&vec![0, 1, 2]));
    assert_eq!(clusters.get(&1), Some(&vec![3]));
    assert_eq!(loss_of(&graph, &clusters), 0.0);
}

#[test]
fn repelling_edge_settles_on_a_loss_one_optimum() {
    // Cutting one positive edge or keeping the negative one both cost
    // exactly 1, so every seed must land on a loss-1 assignment; the
    // two-cluster optima {0,1}/{2} and {0}/{1,2} dominate the candidate
    // pool and must show up across seeds.
    let graph = signed_graph(&[(0, 1, 1.0), (1, 2, 1.0), (0, 2, -1.0)]);

    let mut saw_two_clusters = false;
    for seed in 0..16 {
        let clusters = clusterer(seed).cluster(&graph).expect("clustering succeeds");
        assert_eq!(loss_of(&graph, &clusters), 1.0, "seed {seed} missed the optimum");

        if clusters.len() == 2 {
            saw_two_clusters = true;
            let sizes: Vec<usize> = clusters.values().map(Vec::len).collect();
            assert_eq!(sizes, vec![2, 1]);
            let pair = clusters.get(&0).expect("largest cluster");
            assert!(pair == &vec![0, 1] || pair == &vec![1, 2]);
        }
    }
    assert!(saw_two_clusters, "no seed produced the two-cluster optimum");
}

#[test]
fn clusters_partition_the_node_set() {
    let graph = signed_graph(&[
        (0, 1, 1.5),
        (1, 2, -0.5),
        (2, 3, 1.5),
        (3, 4, 0.5),
        (0, 4, -1.5),
    ]);

    let clusters = clusterer(3).cluster(&graph).expect("clustering succeeds");

    let mut seen = BTreeSet::new();
    for nodes in clusters.values() {
        for &node in nodes {
            assert!(seen.insert(node), "node {node} appears in two clusters");
        }
    }
    let all: BTreeSet<usize> = graph.nodes().collect();
    assert_eq!(seen, all);
}

#[test]
fn returned_clusters_are_positively_connected_when_splitting() {
    // Two positive cliques joined only by a negative edge; whatever the
    // annealer collapses, the split pass must keep each returned cluster
    // connected through positive edges.
    let graph = signed_graph(&[
        (0, 1, 1.0),
        (1, 2, 1.0),
        (0, 2, 1.0),
        (3, 4, 1.0),
        (4, 5, 1.0),
        (3, 5, 1.0),
        (2, 3, -1.5),
    ]);

    let clusters = clusterer(4).cluster(&graph).expect("clustering succeeds");

    for nodes in clusters.values() {
        let members: BTreeSet<usize> = nodes.iter().copied().collect();
        let induced = graph.subgraph(&members);
        assert_eq!(
            induced.positive_components().len(),
            1,
            "cluster {nodes:?} is not positively connected"
        );
    }
}

#[test]
fn winner_never_scores_worse_than_the_component_seed() {
    let graph = signed_graph(&[
        (0, 1, 0.5),
        (1, 2, 0.5),
        (2, 0, -1.5),
        (2, 3, 1.5),
        (3, 4, -0.5),
        (4, 5, 1.5),
    ]);

    let mut seed_clusterer = ConnectedComponentsClusterer::new();
    let seed = seed_clusterer.cluster(&graph).expect("components succeed");
    let seed_loss = loss_of(&graph, &seed);

    let clusters = clusterer(5).cluster(&graph).expect("clustering succeeds");
    assert!(loss_of(&graph, &clusters) <= seed_loss);
}

#[rstest]
#[case(7)]
#[case(8)]
#[case(9)]
fn identical_seed_replays_the_identical_partition(#[case] seed: u64) {
    let graph = signed_graph(&[
        (0, 1, 1.0),
        (1, 2, -1.0),
        (2, 3, 1.0),
        (3, 0, -1.0),
        (0, 2, 0.5),
    ]);

    let first = clusterer(seed).cluster(&graph).expect("clustering succeeds");
    let second = clusterer(seed).cluster(&graph).expect("clustering succeeds");
    assert_eq!(first, second);

    let mut reused = clusterer(seed);
    let third = reused.cluster(&graph).expect("clustering succeeds");
    let fourth = reused.cluster(&graph).expect("clustering succeeds");
    assert_eq!(third, fourth);
}

#[test]
fn empty_graph_yields_a_single_empty_cluster() {
    let graph = WeightedGraph::new();
    let clusters = clusterer(0).cluster(&graph).expect("clustering succeeds");
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters.get(&0), Some(&Vec::new()));
}

#[test]
fn conflict_free_seed_short_circuits_the_search() {
    // All-positive components already have zero loss; even with a tiny step
    // budget the clusterer must return them untouched.
    let graph = signed_graph(&[(0, 1, 1.0), (2, 3, 1.0), (3, 4, 1.0)]);
    let mut fast = CorrelationClustererBuilder::new()
        .with_max_attempts(1)
        .with_max_iters(1)
        .build()
        .expect("valid configuration");

    let clusters = fast.cluster(&graph).expect("clustering succeeds");
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters.get(&0), Some(&vec![2, 3, 4]));
    assert_eq!(clusters.get(&1), Some(&vec![0, 1]));
}

#[test]
fn connected_components_order_by_descending_size() {
    let graph = signed_graph(&[(0, 1, 1.0), (2, 3, 1.0), (3, 4, 1.0), (5, 6, -2.0)]);

    let clusters = ConnectedComponentsClusterer::new()
        .cluster(&graph)
        .expect("components succeed");

    assert_eq!(clusters.get(&0), Some(&vec![2, 3, 4]));
    assert_eq!(clusters.get(&1), Some(&vec![0, 1]));
    // The negative edge contributes no positive evidence, so its endpoints
    // fall apart into singletons.
    assert_eq!(clusters.get(&2), Some(&vec![5]));
    assert_eq!(clusters.get(&3), Some(&vec![6]));
}

#[test]
fn finalize_drops_empty_clusters_and_reindexes() {
    let clusters = finalize_clusters(vec![vec![4, 2], Vec::new(), vec![0, 1, 3]]);
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters.get(&0), Some(&vec![0, 1, 3]));
    assert_eq!(clusters.get(&1), Some(&vec![2, 4]));
}

#[test]
fn invalid_search_budgets_fail_fast() {
    let err = CorrelationClustererBuilder::new()
        .with_max_senses(1)
        .build()
        .expect_err("sense limit too small");
    assert_eq!(err.code(), crate::error::WugErrorCode::SenseLimitTooSmall);

    let err = CorrelationClustererBuilder::new()
        .with_max_iters(0)
        .build()
        .expect_err("zero iteration budget");
    assert_eq!(err.code(), crate::error::WugErrorCode::ZeroCount);
}
