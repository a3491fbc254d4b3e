// src/community/mod.rs

//! Community detection over weighted undirected graphs.
//!
//! `walktrap` builds a `Dendrogram` bottom-up; the dendrogram is then cut
//! into a flat `Clustering`, by default at the level of highest modularity.

pub mod dendrogram;
pub mod walktrap;

pub use dendrogram::{Clustering, Dendrogram, Merge};
pub use walktrap::{modularity, walktrap};
