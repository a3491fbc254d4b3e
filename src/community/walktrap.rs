// src/community/walktrap.rs

//! Walktrap community detection (Pons & Latapy, 2005).
//!
//! Vertices are compared through the distribution of a random walk of
//! `steps` hops started from them. Starting from singletons, the pair of
//! adjacent communities whose merge least increases the mean squared walk
//! distance (Δσ) is merged, until no adjacent pair remains.

use anyhow::{bail, Result};
use log::debug;
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use std::collections::BTreeMap;

use super::dendrogram::{Dendrogram, Merge};

struct Community {
    size: usize,
    /// Walk distribution P^t_C., averaged over member vertices.
    probabilities: Vec<f64>,
    /// Total original edge weight to each adjacent community.
    neighbors: BTreeMap<usize, f64>,
    /// Original edge weight inside the community.
    internal: f64,
    /// Sum of original weighted degrees of the members.
    strength: f64,
}

/// Runs Walktrap over `graph` and returns the full merge history.
///
/// `edge_weight` maps an edge payload to a non-negative finite weight.
/// Parallel edges are summed. Only adjacent communities merge, so a
/// disconnected graph yields fewer than `n - 1` merges.
pub fn walktrap<N, E, F>(graph: &UnGraph<N, E>, steps: usize, mut edge_weight: F) -> Result<Dendrogram>
where
    F: FnMut(&E) -> f64,
{
    let n = graph.node_count();
    if n == 0 {
        return Dendrogram::new(0, Vec::new(), vec![0.0]);
    }
    let steps = steps.max(1);

    let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
    let mut strength = vec![0.0f64; n];
    let mut loops = vec![0.0f64; n];
    let mut total_weight = 0.0f64;
    for edge in graph.edge_references() {
        let w = edge_weight(edge.weight());
        if !w.is_finite() || w < 0.0 {
            bail!(
                "Walktrap requires non-negative finite weights, edge {} has {}",
                edge.id().index(),
                w
            );
        }
        let (a, b) = (edge.source().index(), edge.target().index());
        *adjacency[a].entry(b).or_insert(0.0) += w;
        if a != b {
            *adjacency[b].entry(a).or_insert(0.0) += w;
        } else {
            loops[a] += w;
        }
        strength[a] += w;
        strength[b] += w;
        total_weight += w;
    }

    // The walk adds a loop on every vertex weighted like its average edge.
    let mut walk_adjacency = adjacency.clone();
    let mut walk_degree = vec![0.0f64; n];
    for (v, links) in walk_adjacency.iter_mut().enumerate() {
        let incident: f64 = links.values().sum();
        let mut loop_weight = if links.is_empty() {
            1.0
        } else {
            incident / links.len() as f64
        };
        if loop_weight <= 0.0 {
            loop_weight = 1.0;
        }
        *links.entry(v).or_insert(0.0) += loop_weight;
        walk_degree[v] = links.values().sum();
    }
    let inv_degree: Vec<f64> = walk_degree.iter().map(|d| 1.0 / d).collect();

    let mut communities: Vec<Option<Community>> = Vec::with_capacity(2 * n - 1);
    for v in 0..n {
        let mut neighbors = adjacency[v].clone();
        neighbors.remove(&v);
        communities.push(Some(Community {
            size: 1,
            probabilities: walk_distribution(v, &walk_adjacency, &inv_degree, steps),
            neighbors,
            internal: loops[v],
            strength: strength[v],
        }));
    }

    let mut q = initial_modularity(&loops, &strength, total_weight);
    let mut modularity = vec![q];
    let mut merges = Vec::with_capacity(n - 1);

    let mut distances: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for (a, community) in communities.iter().enumerate() {
        if let Some(ca) = community {
            for &b in ca.neighbors.keys().filter(|&&b| b > a) {
                if let Some(cb) = &communities[b] {
                    distances.insert((a, b), delta_sigma(ca, cb, &inv_degree, n));
                }
            }
        }
    }

    while let Some(((a, b), distance)) = closest_pair(&distances) {
        let (ca, cb) = match (communities[a].take(), communities[b].take()) {
            (Some(ca), Some(cb)) => (ca, cb),
            _ => bail!("Walktrap lost track of communities {} and {}", a, b),
        };
        let merged_id = communities.len();

        for key in ca.neighbors.keys().chain(cb.neighbors.keys()) {
            distances.remove(&ordered(a, *key));
            distances.remove(&ordered(b, *key));
        }

        let between = ca.neighbors.get(&b).copied().unwrap_or(0.0);
        let mut neighbors = ca.neighbors;
        for (x, w) in cb.neighbors {
            *neighbors.entry(x).or_insert(0.0) += w;
        }
        neighbors.remove(&a);
        neighbors.remove(&b);

        let size = ca.size + cb.size;
        let (wa, wb) = (ca.size as f64 / size as f64, cb.size as f64 / size as f64);
        let probabilities = ca
            .probabilities
            .iter()
            .zip(&cb.probabilities)
            .map(|(pa, pb)| wa * pa + wb * pb)
            .collect();

        if total_weight > 0.0 {
            q += between / total_weight
                - ca.strength * cb.strength / (2.0 * total_weight * total_weight);
        }

        for (&x, &w) in &neighbors {
            if let Some(cx) = communities[x].as_mut() {
                cx.neighbors.remove(&a);
                cx.neighbors.remove(&b);
                cx.neighbors.insert(merged_id, w);
            }
        }

        let merged = Community {
            size,
            probabilities,
            neighbors,
            internal: ca.internal + cb.internal + between,
            strength: ca.strength + cb.strength,
        };
        for &x in merged.neighbors.keys() {
            if let Some(cx) = &communities[x] {
                distances.insert((x, merged_id), delta_sigma(cx, &merged, &inv_degree, n));
            }
        }
        debug!(
            "walktrap merge {} + {} -> {} (Δσ={:.6}, size={}, Q={:.4}, internal={:.1})",
            a, b, merged_id, distance, size, q, merged.internal
        );
        communities.push(Some(merged));

        merges.push(Merge {
            left: a,
            right: b,
            distance,
            size,
        });
        modularity.push(q);
    }

    Dendrogram::new(n, merges, modularity)
}

/// Weighted Newman modularity of `membership` over `graph`.
pub fn modularity<N, E, F>(graph: &UnGraph<N, E>, membership: &[usize], mut edge_weight: F) -> f64
where
    F: FnMut(&E) -> f64,
{
    let clusters = membership.iter().map(|c| c + 1).max().unwrap_or(0);
    let mut internal = vec![0.0f64; clusters];
    let mut strength = vec![0.0f64; clusters];
    let mut total_weight = 0.0f64;

    for edge in graph.edge_references() {
        let w = edge_weight(edge.weight());
        let (a, b) = (edge.source().index(), edge.target().index());
        let (Some(&ca), Some(&cb)) = (membership.get(a), membership.get(b)) else {
            continue;
        };
        if ca == cb {
            internal[ca] += w;
        }
        strength[ca] += w;
        strength[cb] += w;
        total_weight += w;
    }

    if total_weight <= 0.0 {
        return 0.0;
    }
    internal
        .iter()
        .zip(&strength)
        .map(|(i, s)| i / total_weight - (s / (2.0 * total_weight)).powi(2))
        .sum()
}

fn initial_modularity(loops: &[f64], strength: &[f64], total_weight: f64) -> f64 {
    if total_weight <= 0.0 {
        return 0.0;
    }
    loops
        .iter()
        .zip(strength)
        .map(|(l, s)| l / total_weight - (s / (2.0 * total_weight)).powi(2))
        .sum()
}

fn walk_distribution(
    start: usize,
    walk_adjacency: &[BTreeMap<usize, f64>],
    inv_degree: &[f64],
    steps: usize,
) -> Vec<f64> {
    let n = walk_adjacency.len();
    let mut current = vec![0.0; n];
    current[start] = 1.0;
    for _ in 0..steps {
        let mut next = vec![0.0; n];
        for (j, &pj) in current.iter().enumerate() {
            if pj == 0.0 {
                continue;
            }
            let share = pj * inv_degree[j];
            for (&k, &w) in &walk_adjacency[j] {
                next[k] += share * w;
            }
        }
        current = next;
    }
    current
}

fn delta_sigma(c1: &Community, c2: &Community, inv_degree: &[f64], n: usize) -> f64 {
    let distance: f64 = c1
        .probabilities
        .iter()
        .zip(&c2.probabilities)
        .zip(inv_degree)
        .map(|((p1, p2), inv)| (p1 - p2) * (p1 - p2) * inv)
        .sum();
    let (s1, s2) = (c1.size as f64, c2.size as f64);
    s1 * s2 / (s1 + s2) * distance / n as f64
}

/// Smallest Δσ; ties go to the lowest pair of ids.
fn closest_pair(distances: &BTreeMap<(usize, usize), f64>) -> Option<((usize, usize), f64)> {
    let mut best: Option<((usize, usize), f64)> = None;
    for (&pair, &d) in distances {
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((pair, d)),
        }
    }
    best
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graph::NodeIndex;

    fn weighted(names: &[&str], edges: &[(usize, usize, f64)]) -> UnGraph<String, f64> {
        let mut graph = UnGraph::new_undirected();
        let nodes: Vec<NodeIndex> = names.iter().map(|n| graph.add_node(n.to_string())).collect();
        for &(a, b, w) in edges {
            graph.add_edge(nodes[a], nodes[b], w);
        }
        graph
    }

    #[test]
    fn test_triangle_collapses_to_one_cluster() {
        let graph = weighted(&["A", "B", "C"], &[(0, 1, 3.0), (1, 2, 1.0), (0, 2, 2.0)]);
        let dendrogram = walktrap(&graph, 4, |w| *w).unwrap();

        assert_eq!(dendrogram.merges().len(), 2);
        let clustering = dendrogram.as_clustering().unwrap();
        assert_eq!(clustering.len(), 3);
        assert_eq!(clustering.cluster_count(), 1);
        assert!((dendrogram.modularity()[2]).abs() < 1e-9);
    }

    #[test]
    fn test_bridged_cliques_split_in_two() {
        let graph = weighted(
            &["x1", "x2", "x3", "y1", "y2", "y3"],
            &[
                (0, 1, 5.0),
                (1, 2, 5.0),
                (0, 2, 5.0),
                (3, 4, 5.0),
                (4, 5, 5.0),
                (3, 5, 5.0),
                (0, 3, 1.0),
            ],
        );
        let dendrogram = walktrap(&graph, 4, |w| *w).unwrap();
        let clustering = dendrogram.as_clustering().unwrap();

        assert_eq!(clustering.cluster_count(), 2);
        let m = clustering.membership();
        assert_eq!(m[0], m[1]);
        assert_eq!(m[1], m[2]);
        assert_eq!(m[3], m[4]);
        assert_eq!(m[4], m[5]);
        assert_ne!(m[0], m[3]);

        let recorded = dendrogram.modularity_at(2).unwrap();
        let recomputed = modularity(&graph, m, |w| *w);
        assert!((recorded - recomputed).abs() < 1e-9);
    }

    #[test]
    fn test_disconnected_components_never_merge() {
        let graph = weighted(&["a", "b", "c", "d"], &[(0, 1, 1.0), (2, 3, 1.0)]);
        let dendrogram = walktrap(&graph, 4, |w| *w).unwrap();

        assert_eq!(dendrogram.merges().len(), 2);
        assert_eq!(dendrogram.min_cluster_count(), 2);
        let clustering = dendrogram.as_clustering().unwrap();
        assert_eq!(clustering.membership(), &[0, 0, 1, 1]);
        assert!((dendrogram.modularity()[2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_every_vertex_assigned_exactly_once() {
        let graph = weighted(
            &["a", "b", "c", "d", "e", "f", "g"],
            &[
                (0, 1, 2.0),
                (1, 2, 1.0),
                (2, 3, 4.0),
                (3, 4, 1.0),
                (4, 5, 3.0),
                (5, 6, 1.0),
                (6, 0, 2.0),
            ],
        );
        let clustering = walktrap(&graph, 3, |w| *w).unwrap().as_clustering().unwrap();

        assert_eq!(clustering.len(), graph.node_count());
        assert_eq!(clustering.sizes().iter().sum::<usize>(), graph.node_count());
        assert!(clustering.sizes().iter().all(|&s| s > 0));
        assert!(clustering
            .membership()
            .iter()
            .all(|&c| c < clustering.cluster_count()));
    }

    #[test]
    fn test_empty_graph_has_no_vertices() {
        let graph: UnGraph<String, f64> = UnGraph::new_undirected();
        let dendrogram = walktrap(&graph, 4, |w| *w).unwrap();
        assert_eq!(dendrogram.vertex_count(), 0);
        assert!(dendrogram.as_clustering().unwrap().is_empty());
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let graph = weighted(&["a", "b"], &[(0, 1, -1.0)]);
        assert!(walktrap(&graph, 4, |w| *w).is_err());
    }

    #[test]
    fn test_zero_weights_still_merge() {
        let graph = weighted(&["a", "b"], &[(0, 1, 0.0)]);
        let dendrogram = walktrap(&graph, 4, |w| *w).unwrap();
        assert_eq!(dendrogram.merges().len(), 1);
        assert!(dendrogram.modularity().iter().all(|q| *q == 0.0));
    }
}
