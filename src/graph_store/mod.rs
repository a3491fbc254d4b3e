// src/graph_store/mod.rs

//! The narrow "execute query, get rows" seam between the pipeline and the
//! graph database. `Neo4jStore` talks to a live server; `MemoryGraphStore`
//! answers the pipeline's fixed queries from a fixture.

pub mod memory;
pub mod neo4j;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use memory::MemoryGraphStore;
pub use neo4j::Neo4jStore;

/// A Cypher statement plus its named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CypherQuery {
    text: String,
    params: Map<String, Value>,
}

impl CypherQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Map::new(),
        }
    }

    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn get_param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// Runs a query in a single round trip and materializes every row.
/// Rows are decoded by column name into `T`.
#[allow(async_fn_in_trait)]
pub trait GraphStore {
    async fn fetch_rows<T: DeserializeOwned>(&self, query: &CypherQuery) -> Result<Vec<T>>;
}
