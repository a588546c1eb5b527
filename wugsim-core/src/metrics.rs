//! Comparison metrics between annotated and ground-truth clusterings.
//!
//! Provides Adjusted Rand Index scoring over label vectors, Jensen–Shannon
//! divergence over cluster-size distributions, the average pointwise
//! distance, an entropy approximation for unclustered graphs, and the
//! dispersion helpers used by convergence-style stopping criteria.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::graph::{AnnotatedGraph, UNCLUSTERED, WeightedGraph};

/// Restricts two label vectors to the positions clustered in both.
///
/// Positions where either side carries [`UNCLUSTERED`] are dropped; the
/// vectors are walked in lockstep, so trailing entries of the longer input
/// are ignored.
#[must_use]
pub fn clean_label_pairs(reference: &[i64], predicted: &[i64]) -> (Vec<i64>, Vec<i64>) {
    reference
        .iter()
        .zip(predicted)
        .filter(|&(&r, &p)| r != UNCLUSTERED && p != UNCLUSTERED)
        .map(|(&r, &p)| (r, p))
        .unzip()
}

fn comb2(value: usize) -> f64 {
    let as_float = value as f64;
    as_float * (as_float - 1.0) / 2.0
}

/// Adjusted Rand Index between two label vectors, in `[-1, 1]`.
///
/// Only positions clustered on both sides enter the contingency table.
/// Degenerate inputs (fewer than two shared positions, or a table with no
/// discriminating power) score 1.0.
///
/// # Examples
/// ```
/// use wugsim_core::metrics::adjusted_rand_index;
///
/// assert_eq!(adjusted_rand_index(&[0, 0, 1, 1], &[1, 1, 0, 0]), 1.0);
/// assert!(adjusted_rand_index(&[0, 0, 1, 1], &[0, 1, 0, 1]) < 0.0);
/// ```
#[must_use]
pub fn adjusted_rand_index(reference: &[i64], predicted: &[i64]) -> f64 {
    let (reference, predicted) = clean_label_pairs(reference, predicted);
    let items = reference.len();
    if items < 2 {
        return 1.0;
    }

    let mut reference_counts: HashMap<i64, usize> = HashMap::new();
    let mut predicted_counts: HashMap<i64, usize> = HashMap::new();
    let mut contingency: HashMap<(i64, i64), usize> = HashMap::new();
    for (&r, &p) in reference.iter().zip(&predicted) {
        *reference_counts.entry(r).or_insert(0) += 1;
        *predicted_counts.entry(p).or_insert(0) += 1;
        *contingency.entry((r, p)).or_insert(0) += 1;
    }

    let sum_pairs: f64 = contingency.values().copied().map(comb2).sum();
    let sum_reference: f64 = reference_counts.values().copied().map(comb2).sum();
    let sum_predicted: f64 = predicted_counts.values().copied().map(comb2).sum();
    let total = comb2(items);
    if total == 0.0 {
        return 1.0;
    }

    let expected = (sum_reference * sum_predicted) / total;
    let max_index = 0.5 * (sum_reference + sum_predicted);
    let denominator = max_index - expected;
    if denominator == 0.0 {
        1.0
    } else {
        (sum_pairs - expected) / denominator
    }
}

/// Normalizes cluster sizes into a probability vector over `total_nodes`.
#[must_use]
pub fn cluster_size_distribution(sizes: &[usize], total_nodes: usize) -> Vec<f64> {
    if total_nodes == 0 {
        return vec![0.0; sizes.len()];
    }
    sizes
        .iter()
        .map(|&size| size as f64 / total_nodes as f64)
        .collect()
}

/// Jensen–Shannon divergence (base 2) between two distributions.
///
/// The shorter vector is zero-padded, matching the comparison of cluster
/// inventories of different sizes. Identical distributions score 0 and
/// disjoint ones score 1.
///
/// # Examples
/// ```
/// use wugsim_core::metrics::jensen_shannon_divergence;
///
/// assert_eq!(jensen_shannon_divergence(&[0.5, 0.5], &[0.5, 0.5]), 0.0);
/// assert_eq!(jensen_shannon_divergence(&[1.0, 0.0], &[0.0, 1.0]), 1.0);
/// ```
#[must_use]
pub fn jensen_shannon_divergence(p: &[f64], q: &[f64]) -> f64 {
    let len = p.len().max(q.len());
    let at = |values: &[f64], i: usize| values.get(i).copied().unwrap_or(0.0);

    let mut divergence = 0.0;
    for i in 0..len {
        let pi = at(p, i);
        let qi = at(q, i);
        let mi = (pi + qi) / 2.0;
        if mi <= 0.0 {
            continue;
        }
        if pi > 0.0 {
            divergence += 0.5 * pi * (pi / mi).log2();
        }
        if qi > 0.0 {
            divergence += 0.5 * qi * (qi / mi).log2();
        }
    }
    divergence
}

/// Average pointwise distance: mean weight over randomly sampled node pairs.
///
/// Pairs without a materialized edge are skipped; the mean runs over the
/// pairs found, and an entirely empty draw scores 0.
#[must_use]
pub fn average_pointwise_distance<R: Rng>(
    graph: &WeightedGraph,
    sample_size: usize,
    rng: &mut R,
) -> f64 {
    let nodes: Vec<usize> = graph.nodes().collect();
    if nodes.len() < 2 {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut found = 0usize;
    for _ in 0..sample_size {
        let mut picked = nodes.choose_multiple(rng, 2).copied();
        if let (Some(u), Some(v)) = (picked.next(), picked.next()) {
            if let Some(weight) = graph.get_edge(u, v) {
                sum += weight;
                found += 1;
            }
        }
    }
    if found == 0 { 0.0 } else { sum / found as f64 }
}

/// Approximate entropy of an unclustered graph.
///
/// For each node, counts the incident edges whose weight reaches the
/// threshold, then averages `-log2((1 + count) / n)` over all nodes. Dense
/// same-sense evidence drives the value toward 0.
#[must_use]
pub fn entropy_approximation(graph: &WeightedGraph, threshold: f64) -> f64 {
    let node_count = graph.number_of_nodes();
    if node_count == 0 {
        return 0.0;
    }

    let mut over_threshold: HashMap<usize, usize> = HashMap::new();
    for (u, v, w) in graph.edges() {
        if w >= threshold {
            *over_threshold.entry(u).or_insert(0) += 1;
            *over_threshold.entry(v).or_insert(0) += 1;
        }
    }

    let sum: f64 = graph
        .nodes()
        .map(|node| {
            let count = over_threshold.get(&node).copied().unwrap_or(0);
            ((1 + count) as f64 / node_count as f64).log2()
        })
        .sum();
    -(sum / node_count as f64)
}

/// Number of clusters in the current partition.
#[must_use]
pub fn cluster_number(annotated: &AnnotatedGraph) -> usize {
    annotated.number_of_clusters()
}

/// Mean squared error of a series about its own mean.
#[must_use]
pub fn mse_about_mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let mean = series.iter().sum::<f64>() / series.len() as f64;
    series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / series.len() as f64
}

/// Root mean squared error of a series about its own mean.
#[must_use]
pub fn rmse_about_mean(series: &[f64]) -> f64 {
    mse_about_mean(series).sqrt()
}

/// Jensen–Shannon divergence of a bootstrap-resampled cluster distribution
/// against a reference distribution.
///
/// Draws `sample_size` clustered nodes with replacement and compares the
/// sampled cluster frequencies against `reference`. An unclustered graph
/// scores 0.
#[must_use]
pub fn bootstrap_jsd<R: Rng>(
    reference: &[f64],
    annotated: &AnnotatedGraph,
    sample_size: usize,
    rng: &mut R,
) -> f64 {
    let clustered: Vec<usize> = annotated
        .graph()
        .nodes()
        .filter(|&node| {
            annotated
                .labels()
                .get(node)
                .is_some_and(|&label| label != UNCLUSTERED)
        })
        .collect();
    if clustered.is_empty() || sample_size == 0 {
        return 0.0;
    }

    let mut sizes = vec![0usize; annotated.number_of_clusters()];
    for _ in 0..sample_size {
        if let Some(&node) = clustered.choose(rng) {
            if let Some(&label) = annotated.labels().get(node) {
                if let Some(slot) = sizes.get_mut(label as usize) {
                    *slot += 1;
                }
            }
        }
    }
    let sampled = cluster_size_distribution(&sizes, sample_size);
    jensen_shannon_divergence(reference, &sampled)
}

/// Adjusted Rand Index over a bootstrap resample of the shared label
/// positions.
#[must_use]
pub fn bootstrap_ari<R: Rng>(
    reference: &[i64],
    predicted: &[i64],
    sample_size: usize,
    rng: &mut R,
) -> f64 {
    let (reference, predicted) = clean_label_pairs(reference, predicted);
    if reference.is_empty() || sample_size == 0 {
        return 1.0;
    }

    let mut sampled_reference = Vec::with_capacity(sample_size);
    let mut sampled_predicted = Vec::with_capacity(sample_size);
    for _ in 0..sample_size {
        let position = rng.gen_range(0..reference.len());
        sampled_reference.push(reference[position]);
        sampled_predicted.push(predicted[position]);
    }
    adjusted_rand_index(&sampled_reference, &sampled_predicted)
}

/// Linear-interpolation percentile of an ascending-sorted series.
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let low = sorted.get(lower).copied().unwrap_or(0.0);
    let high = sorted.get(upper).copied().unwrap_or(low);
    low + (high - low) * (rank - rank.floor())
}
