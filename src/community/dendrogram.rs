// src/community/dendrogram.rs

use anyhow::{bail, Result};

/// One agglomeration step. Ids below `vertex_count` are vertices; the merge
/// at position `i` creates community `vertex_count + i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    /// Walktrap distance (Δσ) at which the two communities were joined.
    pub distance: f64,
    /// Number of vertices in the merged community.
    pub size: usize,
}

/// Merge history of a hierarchical community detection run.
///
/// `modularity[i]` is the modularity of the partition obtained after the
/// first `i` merges, so it always has `merges.len() + 1` entries.
#[derive(Debug, Clone)]
pub struct Dendrogram {
    vertex_count: usize,
    merges: Vec<Merge>,
    modularity: Vec<f64>,
}

impl Dendrogram {
    pub fn new(vertex_count: usize, merges: Vec<Merge>, modularity: Vec<f64>) -> Result<Self> {
        if merges.len() > vertex_count.saturating_sub(1) {
            bail!(
                "{} merges cannot occur over {} vertices",
                merges.len(),
                vertex_count
            );
        }
        if modularity.len() != merges.len() + 1 {
            bail!(
                "Expected {} modularity values, got {}",
                merges.len() + 1,
                modularity.len()
            );
        }
        for (i, merge) in merges.iter().enumerate() {
            let next_id = vertex_count + i;
            if merge.left >= next_id || merge.right >= next_id || merge.left == merge.right {
                bail!("Merge {} references an unknown community", i);
            }
        }
        Ok(Self {
            vertex_count,
            merges,
            modularity,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    pub fn modularity(&self) -> &[f64] {
        &self.modularity
    }

    /// Fewest clusters any cut can produce; above 1 when the graph is disconnected.
    pub fn min_cluster_count(&self) -> usize {
        self.vertex_count - self.merges.len()
    }

    /// Cluster count with the highest modularity. Ties go to the coarser cut.
    pub fn optimal_count(&self) -> usize {
        let mut best_step = 0;
        for (step, q) in self.modularity.iter().enumerate() {
            if *q >= self.modularity[best_step] {
                best_step = step;
            }
        }
        self.vertex_count - best_step
    }

    /// Modularity of the partition with `count` clusters.
    pub fn modularity_at(&self, count: usize) -> Option<f64> {
        if count > self.vertex_count || count < self.min_cluster_count() {
            return None;
        }
        self.modularity.get(self.vertex_count - count).copied()
    }

    /// Flat clustering with exactly `count` clusters.
    pub fn cut(&self, count: usize) -> Result<Clustering> {
        if self.vertex_count == 0 {
            if count == 0 {
                return Ok(Clustering::new(Vec::new()));
            }
            bail!("Cannot cut an empty dendrogram into {} clusters", count);
        }
        if count > self.vertex_count || count < self.min_cluster_count() {
            bail!(
                "Cannot cut into {} clusters; reachable range is {}..={}",
                count,
                self.min_cluster_count(),
                self.vertex_count
            );
        }

        // parent[] over vertices and merged communities
        let steps = self.vertex_count - count;
        let mut parent: Vec<usize> = (0..self.vertex_count + steps).collect();
        for (i, merge) in self.merges[..steps].iter().enumerate() {
            let merged = self.vertex_count + i;
            parent[merge.left] = merged;
            parent[merge.right] = merged;
        }

        let mut root_to_cluster: Vec<Option<usize>> = vec![None; parent.len()];
        let mut next_cluster = 0;
        let mut membership = Vec::with_capacity(self.vertex_count);
        for vertex in 0..self.vertex_count {
            let mut root = vertex;
            while parent[root] != root {
                root = parent[root];
            }
            let cluster = *root_to_cluster[root].get_or_insert_with(|| {
                next_cluster += 1;
                next_cluster - 1
            });
            membership.push(cluster);
        }
        Ok(Clustering::new(membership))
    }

    /// Cut at `optimal_count()`.
    pub fn as_clustering(&self) -> Result<Clustering> {
        self.cut(self.optimal_count())
    }
}

/// Flat partition: `membership[v]` is the cluster of vertex `v`. Cluster ids
/// are dense and numbered by first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clustering {
    membership: Vec<usize>,
    cluster_count: usize,
}

impl Clustering {
    pub fn new(membership: Vec<usize>) -> Self {
        let cluster_count = membership.iter().map(|c| c + 1).max().unwrap_or(0);
        Self {
            membership,
            cluster_count,
        }
    }

    pub fn membership(&self) -> &[usize] {
        &self.membership
    }

    pub fn cluster_of(&self, vertex: usize) -> Option<usize> {
        self.membership.get(vertex).copied()
    }

    pub fn len(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.cluster_count];
        for &cluster in &self.membership {
            sizes[cluster] += 1;
        }
        sizes
    }

    /// Vertices of each cluster, in vertex order.
    pub fn clusters(&self) -> Vec<Vec<usize>> {
        let mut clusters = vec![Vec::new(); self.cluster_count];
        for (vertex, &cluster) in self.membership.iter().enumerate() {
            clusters[cluster].push(vertex);
        }
        clusters
    }
}
