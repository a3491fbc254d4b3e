// src/clustering/create_clusters.rs

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};

use crate::clustering::db::{fetch_topic_co_occurrences, store_cluster_assignments};
use crate::clustering::report::ClusterReport;
use crate::community::{walktrap, Clustering};
use crate::graph_store::GraphStore;
use crate::utils::clustering_config::ClusteringConfig;
use crate::utils::progress_config::add_bar;

/// A group and the names of the topics it carries.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupTopics {
    pub group: String,
    pub topics: Vec<String>,
}

/// Two topics sharing `weight` groups. Rows arrive with `topic < other`,
/// but graph construction does not rely on that.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopicCoOccurrence {
    pub topic: String,
    pub other: String,
    pub weight: i64,
}

#[derive(Debug, Clone)]
pub struct TopicNode {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct TopicEdge {
    pub weight: f64,
}

/// In-memory weighted topic graph, rebuilt for every run. Vertex `i` is the
/// `i`-th topic name in sorted order.
#[derive(Debug, Clone)]
pub struct TopicGraph {
    pub graph: UnGraph<TopicNode, TopicEdge>,
}

impl TopicGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn name_of(&self, vertex: usize) -> Option<&str> {
        self.graph
            .node_weight(NodeIndex::new(vertex))
            .map(|node| node.name.as_str())
    }
}

/// One write-back record: a topic name and its cluster id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub name: String,
    pub cluster: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBackSummary {
    pub submitted: usize,
    pub linked: usize,
    pub batches: usize,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    pub topic_graph: TopicGraph,
    pub clustering: Clustering,
    pub modularity: f64,
    pub assignments: Vec<ClusterAssignment>,
    /// None when write-back was disabled.
    pub write_back: Option<WriteBackSummary>,
    pub report: ClusterReport,
}

/// Runs the full topic clustering pipeline against a graph store.
/// Fetch -> build -> Walktrap -> write back, in that order. The dendrogram is
/// cut where modularity peaks, and write-back is skipped when
/// `config.write_enabled` is false.
///
/// Arguments:
/// * `store` - The graph store to read co-occurrences from and write clusters to.
/// * `config` - Walk length, write batch size and the write-back switch.
/// * `run_id` - Identifier stamped on the cluster report.
/// * `multi_progress` - An optional `MultiProgress` instance for progress tracking.
///
/// Returns:
/// A `Result` containing the `ClusteringOutcome` of the run, or an `anyhow::Error`
/// on failure. The caller decides whether to persist the report.
pub async fn run_topic_clustering<S: GraphStore>(
    store: &S,
    config: &ClusteringConfig,
    run_id: &str,
    multi_progress: Option<MultiProgress>,
) -> Result<ClusteringOutcome> {
    let main_pb = add_bar(
        &multi_progress,
        4,
        "  {spinner:.cyan} [{elapsed_precise}] {bar:30.green/blue} {pos}/{len} {msg}",
        "Starting topic clustering...",
    );

    // Step 1: Fetch co-occurring topic pairs
    info!("Fetching topic co-occurrences from the graph store...");
    let pairs = fetch_topic_co_occurrences(store, multi_progress.clone()).await?;
    info!("Fetched {} topic pairs.", pairs.len());
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Building topic graph...");
    }

    // Step 2: Build the weighted topic graph
    let topic_graph = build_topic_graph(&pairs);
    info!(
        "Topic graph built with {} nodes and {} edges.",
        topic_graph.node_count(),
        topic_graph.edge_count()
    );
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Detecting communities...");
    }

    // Step 3: Walktrap and cut at maximum modularity
    info!("Running Walktrap with {}-step walks...", config.steps);
    let dendrogram = walktrap(&topic_graph.graph, config.steps, |edge| edge.weight)
        .context("Walktrap community detection failed")?;
    let clustering = dendrogram
        .as_clustering()
        .context("Failed to cut the walktrap dendrogram")?;
    let modularity = dendrogram
        .modularity_at(clustering.cluster_count())
        .unwrap_or(0.0);
    info!(
        "Found {} clusters over {} topics (modularity {:.4}).",
        clustering.cluster_count(),
        clustering.len(),
        modularity
    );
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Writing clusters back...");
    }

    // Step 4: Write assignments back
    let assignments = assign_clusters(&topic_graph, &clustering);
    let write_back = if config.write_enabled {
        Some(
            store_cluster_assignments(
                store,
                &assignments,
                config.write_batch_size,
                multi_progress.clone(),
            )
            .await?,
        )
    } else {
        info!(
            "Write-back disabled, {} assignments not stored.",
            assignments.len()
        );
        None
    };
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.finish_with_message("Topic clustering complete");
    }

    let report = ClusterReport::build(run_id, config.steps, modularity, &topic_graph, &clustering);
    report.log_summary();

    Ok(ClusteringOutcome {
        topic_graph,
        clustering,
        modularity,
        assignments,
        write_back,
        report,
    })
}

/// Builds the undirected topic graph from co-occurrence rows.
///
/// Vertices are added in name order, so the graph does not depend on row
/// order or pair orientation. Rows naming the same unordered pair are summed.
pub fn build_topic_graph(pairs: &[TopicCoOccurrence]) -> TopicGraph {
    let names: BTreeSet<&str> = pairs
        .iter()
        .filter(|p| p.topic != p.other)
        .flat_map(|p| [p.topic.as_str(), p.other.as_str()])
        .collect();

    let mut graph = UnGraph::with_capacity(names.len(), pairs.len());
    let mut index: HashMap<String, NodeIndex> = HashMap::with_capacity(names.len());
    for name in names {
        let idx = graph.add_node(TopicNode {
            name: name.to_string(),
        });
        index.insert(name.to_string(), idx);
    }

    let mut weights: HashMap<(NodeIndex, NodeIndex), f64> = HashMap::new();
    for pair in pairs {
        if pair.topic == pair.other {
            warn!("Pair ({:?}, {:?}) links a topic to itself, skipping.", pair.topic, pair.other);
            continue;
        }
        let (a, b) = (index[&pair.topic], index[&pair.other]);
        let key = if a < b { (a, b) } else { (b, a) };
        *weights.entry(key).or_insert(0.0) += pair.weight as f64;
    }

    let mut edges: Vec<((NodeIndex, NodeIndex), f64)> = weights.into_iter().collect();
    edges.sort_by_key(|(key, _)| *key);
    for ((a, b), weight) in edges {
        graph.add_edge(a, b, TopicEdge { weight });
    }
    debug!(
        "Aggregated {} rows into {} edges",
        pairs.len(),
        graph.edge_count()
    );

    TopicGraph { graph }
}

/// Pairs every vertex name with its cluster id.
pub fn assign_clusters(topic_graph: &TopicGraph, clustering: &Clustering) -> Vec<ClusterAssignment> {
    topic_graph
        .graph
        .node_indices()
        .filter_map(|idx| {
            let cluster = clustering.cluster_of(idx.index())?;
            Some(ClusterAssignment {
                name: topic_graph.graph[idx].name.clone(),
                cluster: cluster as i64,
            })
        })
        .collect()
}
