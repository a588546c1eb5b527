//! Property tests for judgement aggregation and clustering invariants.

use std::collections::BTreeSet;

use proptest::prelude::*;

use wugsim_core::{
    AnnotatedGraph, Clusterer, CorrelationClustererBuilder, Judgement, WeightedGraph,
};

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

fn judgement_strategy() -> impl Strategy<Value = Judgement> {
    prop_oneof![
        4 => (1i64..=4).prop_map(|v| Judgement::Value(v as f64)),
        1 => Just(Judgement::Missing),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// The materialized weight is always the median of the numeric history,
    /// the soft weight sits 2.5 below it, and the clock counts every append
    /// regardless of endpoint order.
    #[test]
    fn medians_track_the_numeric_history(
        appends in prop::collection::vec((judgement_strategy(), any::<bool>()), 1..16)
    ) {
        let mut annotated = AnnotatedGraph::new(2);
        let mut numeric = Vec::new();

        for (step, (judgement, flipped)) in appends.iter().enumerate() {
            let (u, v) = if *flipped { (1, 0) } else { (0, 1) };
            annotated.record_judgement(u, v, *judgement).expect("in range");
            if let Some(value) = judgement.value() {
                numeric.push(value);
            }

            prop_assert_eq!(annotated.judgement_count(), step as u64 + 1);
            if numeric.is_empty() {
                prop_assert_eq!(annotated.get_edge(0, 1), None);
                prop_assert!(annotated.is_registered(0, 1));
            } else {
                let expected = median(&numeric);
                prop_assert_eq!(annotated.get_edge(0, 1), Some(expected));
                prop_assert_eq!(annotated.soft_weight(0, 1), Some(expected - 2.5));
            }
        }
    }
}

fn signed_graph_strategy() -> impl Strategy<Value = WeightedGraph> {
    let edge = (0usize..7, 0usize..7, -2i64..=2);
    prop::collection::vec(edge, 0..14).prop_map(|edges| {
        let mut graph = WeightedGraph::new();
        for node in 0..7 {
            graph.add_node(node);
        }
        for (u, v, w) in edges {
            if u != v {
                graph
                    .add_edge(u, v, w as f64 / 2.0)
                    .expect("distinct endpoints");
            }
        }
        graph
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Clusterer outputs always partition the node set, and with the
    /// non-evidence split enabled every cluster is positively connected.
    #[test]
    fn correlation_clusters_partition_arbitrary_signed_graphs(
        graph in signed_graph_strategy(),
        seed in 0u64..32,
    ) {
        let mut clusterer = CorrelationClustererBuilder::new()
            .with_max_attempts(15)
            .with_max_iters(250)
            .with_seed(seed)
            .build()
            .expect("valid configuration");
        let clusters = clusterer.cluster(&graph).expect("clustering succeeds");

        let mut seen = BTreeSet::new();
        for nodes in clusters.values() {
            for &node in nodes {
                prop_assert!(seen.insert(node), "node {} in two clusters", node);
            }
        }
        let all: BTreeSet<usize> = graph.nodes().collect();
        prop_assert_eq!(seen, all);

        for nodes in clusters.values() {
            if nodes.is_empty() {
                continue;
            }
            let members: BTreeSet<usize> = nodes.iter().copied().collect();
            let induced = graph.subgraph(&members);
            prop_assert_eq!(induced.positive_components().len(), 1);
        }
    }
}
