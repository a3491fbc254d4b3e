// src/clustering/db.rs

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use log::{info, warn};
use serde::Deserialize;

use crate::clustering::create_clusters::{
    ClusterAssignment, GroupTopics, TopicCoOccurrence, WriteBackSummary,
};
use crate::clustering::queries::{
    ASSIGNMENTS_PARAM, GROUP_TOPICS_QUERY, TOPIC_CO_OCCURRENCE_QUERY, WRITE_CLUSTERS_QUERY,
};
use crate::graph_store::{CypherQuery, GraphStore};
use crate::utils::progress_config::{add_bar, add_spinner};

#[derive(Debug, Deserialize)]
struct LinkedRow {
    linked: i64,
}

/// Fetches every group together with the names of its topics.
/// Groups without any HAS_TOPIC edge are not returned.
///
/// Arguments:
/// * `store` - The graph store answering the group query.
/// * `multi_progress` - An optional `MultiProgress` instance for progress tracking.
///
/// Returns:
/// A `Result` containing a `Vec<GroupTopics>` ordered by group name, or an `anyhow::Error` on failure.
pub async fn fetch_group_topics<S: GraphStore>(
    store: &S,
    multi_progress: Option<MultiProgress>,
) -> Result<Vec<GroupTopics>> {
    let fetch_pb = add_spinner(
        &multi_progress,
        "    {spinner:.blue} [{elapsed_precise}] {msg}",
        "Querying groups and their topics...",
    );

    let groups: Vec<GroupTopics> = store
        .fetch_rows(&CypherQuery::new(GROUP_TOPICS_QUERY))
        .await
        .context("Failed to query groups and topics")?;

    if let Some(pb) = &fetch_pb {
        pb.finish_with_message(format!("Fetched {} groups", groups.len()));
    }
    Ok(groups)
}

/// Fetches unordered topic pairs that share at least one group.
/// Each row is weighted by the number of shared groups, and every pair
/// appears once with `topic < other` by name.
///
/// Arguments:
/// * `store` - The graph store answering the co-occurrence query.
/// * `multi_progress` - An optional `MultiProgress` instance for progress tracking.
///
/// Returns:
/// A `Result` containing a `Vec<TopicCoOccurrence>` ordered by weight descending,
/// or an `anyhow::Error` on failure.
pub async fn fetch_topic_co_occurrences<S: GraphStore>(
    store: &S,
    multi_progress: Option<MultiProgress>,
) -> Result<Vec<TopicCoOccurrence>> {
    let fetch_pb = add_spinner(
        &multi_progress,
        "    {spinner:.blue} [{elapsed_precise}] {msg}",
        "Querying topic co-occurrences...",
    );

    let pairs: Vec<TopicCoOccurrence> = store
        .fetch_rows(&CypherQuery::new(TOPIC_CO_OCCURRENCE_QUERY))
        .await
        .context("Failed to query topic co-occurrences")?;

    if let Some(pb) = &fetch_pb {
        pb.finish_with_message(format!("Fetched {} topic pairs", pairs.len()));
    }
    Ok(pairs)
}

/// Links every topic to its Cluster node, `batch_size` assignments per query.
///
/// Each batch is one UNWIND statement, atomic on its own. Batches already
/// written stay written if a later one fails. Assignments naming a topic that
/// is not in the graph are dropped by the MATCH and reported as a warning.
///
/// Arguments:
/// * `store` - The graph store receiving the write query.
/// * `assignments` - Topic name and cluster id pairs to link.
/// * `batch_size` - Assignments per query; values below 1 are treated as 1.
/// * `multi_progress` - An optional `MultiProgress` instance for progress tracking.
///
/// Returns:
/// A `Result` containing the `WriteBackSummary` of submitted and linked rows,
/// or an `anyhow::Error` if any batch fails.
pub async fn store_cluster_assignments<S: GraphStore>(
    store: &S,
    assignments: &[ClusterAssignment],
    batch_size: usize,
    multi_progress: Option<MultiProgress>,
) -> Result<WriteBackSummary> {
    if assignments.is_empty() {
        info!("No cluster assignments to store.");
        return Ok(WriteBackSummary::default());
    }

    // Step 1: Size the batches
    let batch_size = batch_size.max(1);
    let batch_count = assignments.len().div_ceil(batch_size);
    let write_pb = add_bar(
        &multi_progress,
        batch_count as u64,
        "    {spinner:.red} [{elapsed_precise}] {bar:25.green/blue} {pos}/{len} {msg}",
        "Writing cluster assignments...",
    );

    // Step 2: Send one UNWIND query per chunk
    let mut summary = WriteBackSummary::default();
    for (i, chunk) in assignments.chunks(batch_size).enumerate() {
        let batch = serde_json::to_value(chunk).context("Failed to encode assignment batch")?;
        let query = CypherQuery::new(WRITE_CLUSTERS_QUERY).param(ASSIGNMENTS_PARAM, batch);

        let rows: Vec<LinkedRow> = store
            .fetch_rows(&query)
            .await
            .with_context(|| format!("Failed to write cluster assignment batch {}", i + 1))?;
        let linked: i64 = rows.iter().map(|r| r.linked).sum();

        if (linked as usize) < chunk.len() {
            warn!(
                "Batch {}: only {} of {} topics were found and linked",
                i + 1,
                linked,
                chunk.len()
            );
        }

        summary.batches += 1;
        summary.submitted += chunk.len();
        summary.linked += linked.max(0) as usize;

        if let Some(pb) = &write_pb {
            pb.inc(1);
        }
    }

    // Step 3: Report totals
    if let Some(pb) = &write_pb {
        pb.finish_with_message(format!(
            "Linked {} topics in {} batches",
            summary.linked, summary.batches
        ));
    }
    info!(
        "Stored {} cluster assignments ({} linked) in {} batches.",
        summary.submitted, summary.linked, summary.batches
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_store::MemoryGraphStore;

    fn assignment(name: &str, cluster: i64) -> ClusterAssignment {
        ClusterAssignment {
            name: name.to_string(),
            cluster,
        }
    }

    #[tokio::test]
    async fn test_batches_split_by_size() {
        let store = MemoryGraphStore::from_groups(&[("G", &["A", "B", "C", "D", "E"][..])]);
        let assignments: Vec<ClusterAssignment> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|n| assignment(n, 0))
            .collect();

        let summary = store_cluster_assignments(&store, &assignments, 2, None)
            .await
            .unwrap();

        assert_eq!(summary.batches, 3);
        assert_eq!(summary.submitted, 5);
        assert_eq!(summary.linked, 5);
        assert_eq!(store.stats().await.write_queries, 3);
    }

    #[tokio::test]
    async fn test_zero_batch_size_writes_one_per_query() {
        let store = MemoryGraphStore::from_groups(&[("G", &["A", "B"][..])]);
        let summary =
            store_cluster_assignments(&store, &[assignment("A", 0), assignment("B", 1)], 0, None)
                .await
                .unwrap();

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.linked, 2);
        assert_eq!(store.stats().await.write_queries, 2);
    }

    #[tokio::test]
    async fn test_missing_topics_are_counted_not_linked() {
        let store = MemoryGraphStore::from_groups(&[("G", &["A", "B"][..])]);
        let summary = store_cluster_assignments(
            &store,
            &[assignment("A", 0), assignment("Ghost", 1)],
            500,
            None,
        )
        .await
        .unwrap();

        assert_eq!(summary.submitted, 2);
        assert_eq!(summary.linked, 1);
        assert_eq!(store.cluster_ids().await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_assignments_skip_the_write() {
        let store = MemoryGraphStore::from_groups(&[("G", &["A"][..])]);
        let summary = store_cluster_assignments(&store, &[], 500, None)
            .await
            .unwrap();
        assert_eq!(summary, WriteBackSummary::default());
        assert_eq!(store.stats().await.write_queries, 0);
    }

    #[tokio::test]
    async fn test_fetches_decode_rows() {
        let store = MemoryGraphStore::from_groups(&[
            ("Graph Fans", &["Neo4j", "Cypher"][..]),
            ("Alpha", &["Neo4j"][..]),
        ]);

        let groups = fetch_group_topics(&store, None).await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group, "Alpha");

        let pairs = fetch_topic_co_occurrences(&store, None).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].topic, "Cypher");
        assert_eq!(pairs[0].other, "Neo4j");
        assert_eq!(pairs[0].weight, 1);
    }
}
