// src/clustering/report.rs

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use log::info;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::clustering::create_clusters::TopicGraph;
use crate::community::Clustering;

/// Summary of one cluster, for logs and the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub size: usize,
    pub topics: Vec<String>,
    /// Sum of edge weights with both ends in the cluster.
    pub internal_weight: f64,
    /// Ratio of actual edges to possible edges in the cluster (0.0 to 1.0)
    pub density: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub run_id: String,
    pub generated_at: NaiveDateTime,
    pub walk_steps: usize,
    pub modularity: f64,
    pub topic_count: usize,
    pub edge_count: usize,
    pub clusters: Vec<ClusterSummary>,
}

impl ClusterReport {
    pub fn build(
        run_id: &str,
        walk_steps: usize,
        modularity: f64,
        topic_graph: &TopicGraph,
        clustering: &Clustering,
    ) -> Self {
        let mut clusters: Vec<ClusterSummary> = clustering
            .clusters()
            .into_iter()
            .enumerate()
            .map(|(cluster, members)| {
                let mut topics: Vec<String> = members
                    .iter()
                    .filter_map(|&v| topic_graph.name_of(v).map(str::to_string))
                    .collect();
                topics.sort();
                ClusterSummary {
                    cluster,
                    size: members.len(),
                    topics,
                    internal_weight: 0.0,
                    density: 0.0,
                }
            })
            .collect();

        let mut internal_edges = vec![0usize; clusters.len()];
        for edge in topic_graph.graph.edge_references() {
            let a = clustering.cluster_of(edge.source().index());
            let b = clustering.cluster_of(edge.target().index());
            if let (Some(a), Some(b)) = (a, b) {
                if a == b {
                    clusters[a].internal_weight += edge.weight().weight;
                    internal_edges[a] += 1;
                }
            }
        }
        for (summary, edges) in clusters.iter_mut().zip(internal_edges) {
            let possible = summary.size * summary.size.saturating_sub(1) / 2;
            if possible > 0 {
                summary.density = edges as f64 / possible as f64;
            }
        }

        Self {
            run_id: run_id.to_string(),
            generated_at: Utc::now().naive_utc(),
            walk_steps,
            modularity,
            topic_count: topic_graph.node_count(),
            edge_count: topic_graph.edge_count(),
            clusters,
        }
    }

    pub fn log_summary(&self) {
        if self.clusters.is_empty() {
            info!("No topic clusters to report.");
            return;
        }

        let sizes: Vec<usize> = self.clusters.iter().map(|c| c.size).collect();
        let singletons = sizes.iter().filter(|&&s| s == 1).count();
        info!("Topic Cluster Statistics (run {}):", self.run_id);
        info!("  Clusters: {}", self.clusters.len());
        info!("  Modularity: {:.4}", self.modularity);
        info!(
            "  Largest: {} topics, smallest: {} topics, singletons: {}",
            sizes.iter().max().copied().unwrap_or(0),
            sizes.iter().min().copied().unwrap_or(0),
            singletons
        );

        for summary in &self.clusters {
            let preview: Vec<&str> = summary.topics.iter().take(8).map(String::as_str).collect();
            let more = summary.size.saturating_sub(preview.len());
            info!(
                "  Cluster {:>3}: {:>3} topics, density {:.2} | {}{}",
                summary.cluster,
                summary.size,
                summary.density,
                preview.join(", "),
                if more > 0 {
                    format!(" (+{} more)", more)
                } else {
                    String::new()
                }
            );
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush report to {}", path.display()))?;
        info!("Cluster report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::create_clusters::{build_topic_graph, TopicCoOccurrence};

    fn pair(topic: &str, other: &str, weight: i64) -> TopicCoOccurrence {
        TopicCoOccurrence {
            topic: topic.to_string(),
            other: other.to_string(),
            weight,
        }
    }

    #[test]
    fn test_report_measures_each_cluster() {
        let graph = build_topic_graph(&[pair("A", "B", 3), pair("B", "C", 1), pair("C", "D", 2)]);
        // A, B | C, D
        let clustering = Clustering::new(vec![0, 0, 1, 1]);
        let report = ClusterReport::build("run", 4, 0.1, &graph, &clustering);

        assert_eq!(report.topic_count, 4);
        assert_eq!(report.clusters.len(), 2);
        assert_eq!(report.clusters[0].topics, vec!["A", "B"]);
        assert_eq!(report.clusters[0].internal_weight, 3.0);
        assert_eq!(report.clusters[1].internal_weight, 2.0);
        assert_eq!(report.clusters[1].density, 1.0);
    }

    #[test]
    fn test_report_round_trips_to_disk() {
        let graph = build_topic_graph(&[pair("A", "B", 1)]);
        let report = ClusterReport::build("run", 4, 0.0, &graph, &Clustering::new(vec![0, 0]));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters.json");

        report.write_json(&path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["run_id"], "run");
        assert_eq!(written["clusters"][0]["topics"][1], "B");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_report_surfaces_flush_failure() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let graph = build_topic_graph(&[pair("A", "B", 1)]);
        let report = ClusterReport::build("run", 4, 0.0, &graph, &Clustering::new(vec![0, 0]));

        // The report fits in the buffer, so the write only fails on flush.
        let err = report.write_json(full).unwrap_err();
        assert!(err.to_string().contains("flush"));
    }
}
