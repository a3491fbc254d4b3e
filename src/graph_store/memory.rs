// src/graph_store/memory.rs

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::sync::Mutex;

use super::{CypherQuery, GraphStore};
use crate::clustering::queries::{
    ASSIGNMENTS_PARAM, GROUP_TOPICS_QUERY, TOPIC_CO_OCCURRENCE_QUERY, WRITE_CLUSTERS_QUERY,
};

/// Fixture layout: groups with their topics, plus optional topics that
/// belong to no group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphFixture {
    #[serde(default)]
    pub groups: Vec<FixtureGroup>,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureGroup {
    pub name: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Counters for what the write query did against the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub write_queries: usize,
    pub topic_lookups: usize,
    pub cluster_merges: usize,
    pub clusters_created: usize,
    pub relationships_created: usize,
    /// Distinct cluster ids touched by MERGE across all writes.
    pub merged_cluster_ids: BTreeSet<i64>,
}

#[derive(Debug, Default)]
struct MemoryState {
    clusters: BTreeSet<i64>,
    in_cluster: BTreeMap<String, BTreeSet<i64>>,
    stats: MemoryStoreStats,
}

#[derive(Debug, Deserialize)]
struct AssignmentParam {
    name: String,
    cluster: i64,
}

/// In-memory stand-in for the Group/Topic graph. It answers the pipeline's
/// fixed queries with the same semantics the Cypher has against Neo4j.
pub struct MemoryGraphStore {
    /// Group name to its distinct topics. Fixture entries sharing a name
    /// are one Group node, as MERGE on `name` would leave them.
    groups: BTreeMap<String, BTreeSet<String>>,
    topics: BTreeSet<String>,
    state: Mutex<MemoryState>,
}

impl MemoryGraphStore {
    pub fn new(fixture: GraphFixture) -> Self {
        let mut topics: BTreeSet<String> = fixture.topics.into_iter().collect();
        let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for group in fixture.groups {
            topics.extend(group.topics.iter().cloned());
            groups.entry(group.name).or_default().extend(group.topics);
        }
        Self {
            groups,
            topics,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Builds a store from `(group, [topics])` pairs.
    pub fn from_groups<G, T>(groups: &[(G, &[T])]) -> Self
    where
        G: AsRef<str>,
        T: AsRef<str>,
    {
        let groups = groups
            .iter()
            .map(|(name, topics)| FixtureGroup {
                name: name.as_ref().to_string(),
                topics: topics.iter().map(|t| t.as_ref().to_string()).collect(),
            })
            .collect();
        Self::new(GraphFixture {
            groups,
            topics: Vec::new(),
        })
    }

    pub fn from_fixture_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        let fixture: GraphFixture = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))?;
        info!(
            "Loaded fixture {} with {} groups",
            path.display(),
            fixture.groups.len()
        );
        Ok(Self::new(fixture))
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub async fn stats(&self) -> MemoryStoreStats {
        self.state.lock().await.stats.clone()
    }

    pub async fn cluster_ids(&self) -> BTreeSet<i64> {
        self.state.lock().await.clusters.clone()
    }

    /// Clusters a topic is linked to; more than one after runs that renumbered clusters.
    pub async fn clusters_of(&self, topic: &str) -> BTreeSet<i64> {
        self.state
            .lock()
            .await
            .in_cluster
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn group_topic_rows(&self) -> Vec<Value> {
        // A group without HAS_TOPIC edges never matches.
        self.groups
            .iter()
            .filter(|(_, topics)| !topics.is_empty())
            .map(|(name, topics)| json!({ "group": name, "topics": topics }))
            .collect()
    }

    fn co_occurrence_rows(&self) -> Vec<Value> {
        let mut weights: BTreeMap<(&str, &str), i64> = BTreeMap::new();
        for topics in self.groups.values() {
            let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
            for (i, topic) in topics.iter().enumerate() {
                for other in &topics[i + 1..] {
                    *weights.entry((*topic, *other)).or_insert(0) += 1;
                }
            }
        }

        let mut rows: Vec<((&str, &str), i64)> = weights.into_iter().collect();
        rows.sort_by(|(pair_a, w_a), (pair_b, w_b)| w_b.cmp(w_a).then(pair_a.cmp(pair_b)));
        rows.into_iter()
            .map(|((topic, other), weight)| {
                json!({ "topic": topic, "other": other, "weight": weight })
            })
            .collect()
    }

    async fn apply_cluster_writes(&self, query: &CypherQuery) -> Result<Vec<Value>> {
        let batch = query
            .get_param(ASSIGNMENTS_PARAM)
            .context("Write query is missing the assignments parameter")?;
        let assignments: Vec<AssignmentParam> = serde_json::from_value(batch.clone())
            .context("Malformed assignments parameter")?;

        let mut state = self.state.lock().await;
        state.stats.write_queries += 1;

        let mut linked = 0i64;
        for assignment in assignments {
            state.stats.topic_lookups += 1;
            if !self.topics.contains(&assignment.name) {
                debug!("Topic {:?} not found, row dropped", assignment.name);
                continue;
            }

            state.stats.cluster_merges += 1;
            state.stats.merged_cluster_ids.insert(assignment.cluster);
            if state.clusters.insert(assignment.cluster) {
                state.stats.clusters_created += 1;
            }
            if state
                .in_cluster
                .entry(assignment.name)
                .or_default()
                .insert(assignment.cluster)
            {
                state.stats.relationships_created += 1;
            }
            linked += 1;
        }

        Ok(vec![json!({ "linked": linked })])
    }
}

impl GraphStore for MemoryGraphStore {
    async fn fetch_rows<T: DeserializeOwned>(&self, query: &CypherQuery) -> Result<Vec<T>> {
        let rows = if query.text() == GROUP_TOPICS_QUERY {
            self.group_topic_rows()
        } else if query.text() == TOPIC_CO_OCCURRENCE_QUERY {
            self.co_occurrence_rows()
        } else if query.text() == WRITE_CLUSTERS_QUERY {
            self.apply_cluster_writes(query).await?
        } else {
            bail!(
                "In-memory graph store cannot answer query: {}",
                query.text().trim()
            );
        };

        rows.into_iter()
            .map(|row| serde_json::from_value(row).context("Failed to decode in-memory row"))
            .collect()
    }
}
