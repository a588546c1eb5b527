//! Unit tests for the sampling strategies.

use std::collections::BTreeSet;

use rstest::rstest;

use crate::graph::{AnnotatedGraph, Clustering, WeightedGraph};
use crate::judgement::Judgement;

use super::{Count, DwugSampler, DwugSamplerBuilder, PageRankSampler, RandomSampler, Sampler};

/// Complete ground truth over `n` nodes with uniform weight 4.
fn complete_truth(n: usize) -> WeightedGraph {
    let mut graph = WeightedGraph::new();
    for u in 0..n {
        for v in (u + 1)..n {
            graph.add_edge(u, v, 4.0).expect("distinct endpoints");
        }
    }
    graph
}

fn dwug(nodes: Count, edges: Count, seed: u64) -> DwugSampler {
    DwugSamplerBuilder::new()
        .with_nodes_to_add(nodes)
        .with_edges_to_draw(edges)
        .with_min_multi_cluster_size(2)
        .with_seed(seed)
        .build()
        .expect("valid configuration")
}

/// One multi-cluster `{0..=4}` plus singleton clusters `{5}` and `{6}`, with
/// materialized evidence inside the multi-cluster only.
fn clustered_annotated() -> AnnotatedGraph {
    let mut annotated = AnnotatedGraph::new(7);
    for (u, v) in [(0, 1), (1, 2), (2, 3), (3, 4)] {
        annotated
            .record_judgement(u, v, Judgement::Value(4.0))
            .expect("in range");
    }
    let mut clusters = Clustering::new();
    clusters.insert(0, vec![0, 1, 2, 3, 4]);
    clusters.insert(1, vec![5]);
    clusters.insert(2, vec![6]);
    annotated
        .update_cluster_labels(clusters)
        .expect("nodes in range");
    annotated
}

#[test]
fn initial_round_walks_within_the_chosen_node_subset() {
    let truth = complete_truth(10);
    let annotated = AnnotatedGraph::new(10);
    let mut sampler = dwug(Count::Fraction(0.4), Count::Absolute(3), 11);

    let batch = sampler.sample(&truth, &annotated);

    assert_eq!(batch.len(), 3);
    let endpoints: BTreeSet<usize> = batch.iter().flat_map(|&(u, v)| [u, v]).collect();
    assert!(endpoints.len() <= 4, "walk left the selected subset");
    assert!(endpoints.iter().all(|&n| n < 10));
    for &(u, v) in &batch {
        assert_ne!(u, v);
    }
}

#[test]
fn initial_round_caps_the_budget_at_the_complete_subgraph() {
    let truth = complete_truth(4);
    let annotated = AnnotatedGraph::new(4);
    // Fraction 1.0 of the complete subgraph over all four nodes.
    let mut sampler = dwug(Count::Fraction(1.0), Count::Fraction(1.0), 3);
    let batch = sampler.sample(&truth, &annotated);
    assert_eq!(batch.len(), 6);

    // An oversized absolute budget caps at the three pairs available.
    let mut greedy = dwug(Count::Absolute(3), Count::Absolute(50), 3);
    let batch = greedy.sample(&truth, &annotated);
    assert_eq!(batch.len(), 3);
}

#[test]
fn combination_phase_bridges_every_unconnected_singleton() {
    let truth = complete_truth(7);
    let annotated = clustered_annotated();
    let mut sampler = dwug(Count::Absolute(0), Count::Absolute(2), 5);

    let batch = sampler.sample(&truth, &annotated);

    let from_five: Vec<_> = batch.iter().filter(|&&(u, _)| u == 5).collect();
    let from_six: Vec<_> = batch.iter().filter(|&&(u, _)| u == 6).collect();
    assert_eq!(from_five.len(), 1, "node 5 must be bridged once");
    assert_eq!(from_six.len(), 1, "node 6 must be bridged once");
    for &&(_, bridge) in from_five.iter().chain(from_six.iter()) {
        assert!((0..=4).contains(&bridge));
    }
    assert_eq!(batch.len(), 2, "no exploration while both singletons combine");
}

#[test]
fn connected_singletons_explore_instead_of_combining() {
    let truth = complete_truth(7);
    let mut annotated = clustered_annotated();
    // Register (not necessarily materialize) a comparison from each
    // singleton into the multi-cluster; abstentions count as asked.
    annotated
        .record_judgement(5, 0, Judgement::Missing)
        .expect("in range");
    annotated
        .record_judgement(6, 0, Judgement::Missing)
        .expect("in range");

    let mut sampler = dwug(Count::Absolute(0), Count::Absolute(3), 5);
    let batch = sampler.sample(&truth, &annotated);

    assert_eq!(batch.len(), 3, "walk emits the full absolute budget");
    for &(u, v) in &batch {
        assert!(matches!((u, v), (5, 6) | (6, 5)), "walk must alternate 5 and 6");
    }
}

#[test]
fn fresh_nodes_enter_through_the_combination_phase() {
    let truth = complete_truth(8);
    let mut annotated = AnnotatedGraph::new(8);
    for (u, v) in [(0, 1), (1, 2), (2, 3), (3, 4)] {
        annotated
            .record_judgement(u, v, Judgement::Value(4.0))
            .expect("in range");
    }
    // Materialize 5 and 6 so node 7 is the only never-annotated node left.
    annotated
        .record_judgement(5, 6, Judgement::Value(1.0))
        .expect("in range");
    let mut clusters = Clustering::new();
    clusters.insert(0, vec![0, 1, 2, 3, 4]);
    clusters.insert(1, vec![5]);
    clusters.insert(2, vec![6]);
    annotated
        .update_cluster_labels(clusters)
        .expect("nodes in range");

    let mut sampler = dwug(Count::Absolute(1), Count::Absolute(0), 9);
    let batch = sampler.sample(&truth, &annotated);

    let from_fresh: Vec<_> = batch.iter().filter(|&&(u, _)| u == 7).collect();
    assert_eq!(from_fresh.len(), 1, "the fresh node bridges into the sense");
    for &&(_, bridge) in &from_fresh {
        assert!((0..=4).contains(&bridge));
    }
}

#[test]
fn empty_rounds_fall_back_to_random_edges_when_enabled() {
    let truth = complete_truth(6);
    let mut annotated = AnnotatedGraph::new(6);
    annotated
        .record_judgement(0, 1, Judgement::Value(4.0))
        .expect("in range");

    // No communities and a zero node quota leave nothing to sample.
    let mut silent = dwug(Count::Absolute(0), Count::Absolute(4), 2);
    assert!(silent.sample(&truth, &annotated).is_empty());

    let mut fallback = DwugSamplerBuilder::new()
        .with_nodes_to_add(Count::Absolute(0))
        .with_edges_to_draw(Count::Absolute(4))
        .with_random_fallback(5)
        .with_seed(2)
        .build()
        .expect("valid configuration");
    let batch = fallback.sample(&truth, &annotated);
    assert_eq!(batch.len(), 5);
    for &(u, v) in &batch {
        assert!(u < v, "fallback pairs come out canonical");
    }
}

#[test]
fn quotas_cap_at_the_available_pool() {
    let truth = complete_truth(3);
    let annotated = AnnotatedGraph::new(3);
    let mut sampler = dwug(Count::Absolute(50), Count::Absolute(2), 13);

    // Asking for 50 nodes from a universe of 3 must not fail.
    let batch = sampler.sample(&truth, &annotated);
    assert_eq!(batch.len(), 2);
}

#[rstest]
#[case(Count::Fraction(-0.1))]
#[case(Count::Fraction(1.5))]
fn invalid_fractions_fail_fast(#[case] quota: Count) {
    let err = DwugSamplerBuilder::new()
        .with_nodes_to_add(quota)
        .build()
        .expect_err("fraction out of range");
    assert_eq!(err.code(), crate::error::WugErrorCode::FractionOutOfRange);
}

#[test]
fn singleton_multi_cluster_threshold_fails_fast() {
    let err = DwugSamplerBuilder::new()
        .with_min_multi_cluster_size(1)
        .build()
        .expect_err("threshold admits singletons");
    assert_eq!(
        err.code(),
        crate::error::WugErrorCode::MultiClusterSizeTooSmall
    );
}

#[test]
fn identical_seeds_replay_identical_batches() {
    let truth = complete_truth(8);
    let annotated = AnnotatedGraph::new(8);

    let mut left = dwug(Count::Fraction(0.5), Count::Absolute(4), 21);
    let mut right = dwug(Count::Fraction(0.5), Count::Absolute(4), 21);
    assert_eq!(left.sample(&truth, &annotated), right.sample(&truth, &annotated));
}

#[test]
fn random_sampler_emits_distinct_canonical_pairs() {
    let truth = complete_truth(5);
    let annotated = AnnotatedGraph::new(5);
    let mut sampler = RandomSampler::new(20, 3).expect("valid configuration");

    let batch = sampler.sample(&truth, &annotated);
    assert_eq!(batch.len(), 20);
    for &(u, v) in &batch {
        assert!(u < v);
        assert!(v < 5);
    }
}

#[test]
fn random_sampler_on_a_tiny_universe_returns_nothing() {
    let mut truth = WeightedGraph::new();
    truth.add_node(0);
    let annotated = AnnotatedGraph::new(1);
    let mut sampler = RandomSampler::new(3, 3).expect("valid configuration");
    assert!(sampler.sample(&truth, &annotated).is_empty());
}

#[rstest]
#[case(0.0)]
#[case(0.5)]
#[case(1.0)]
fn page_rank_walks_are_chains_of_distinct_steps(#[case] teleport: f64) {
    let truth = complete_truth(6);
    let annotated = AnnotatedGraph::new(6);
    let mut sampler =
        PageRankSampler::new(10, teleport, Some(0), 17).expect("valid configuration");

    let batch = sampler.sample(&truth, &annotated);
    assert_eq!(batch.len(), 10);
    for &(u, v) in &batch {
        assert_ne!(u, v);
    }
    // A pure walk continues where the previous edge ended.
    if teleport == 0.0 {
        for pair in batch.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
        assert_eq!(batch[0].0, 0, "the pinned start node leads the walk");
    }
}

#[test]
fn page_rank_rejects_out_of_range_teleport() {
    let err = PageRankSampler::new(5, 1.5, None, 0).expect_err("teleport out of range");
    assert_eq!(err.code(), crate::error::WugErrorCode::FractionOutOfRange);
}
