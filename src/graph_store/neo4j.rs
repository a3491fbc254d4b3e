// src/graph_store/neo4j.rs

use anyhow::{Context, Result};
use log::debug;
use neo4rs::{
    query, BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString,
    BoltType, Graph,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{CypherQuery, GraphStore};

/// `GraphStore` backed by a live Neo4j connection.
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }
}

impl GraphStore for Neo4jStore {
    async fn fetch_rows<T: DeserializeOwned>(&self, cypher: &CypherQuery) -> Result<Vec<T>> {
        let mut q = query(cypher.text());
        for (key, value) in cypher.params() {
            q = q.param(key.as_str(), json_to_bolt(value));
        }

        let mut stream = self
            .graph
            .execute(q)
            .await
            .with_context(|| format!("Failed to execute query: {}", cypher.text().trim()))?;

        let mut rows = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .context("Failed to read row from Neo4j result stream")?
        {
            rows.push(row.to::<T>().context("Failed to decode Neo4j row")?);
        }
        debug!("Query returned {} rows", rows.len());
        Ok(rows)
    }
}

/// Converts a JSON parameter into the Bolt value the driver sends.
/// Integral numbers stay integers so they can serve as MERGE keys.
pub fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => BoltType::String(BoltString::new(s)),
        Value::Array(items) => {
            let mut list = BoltList::with_capacity(items.len());
            for item in items {
                list.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        Value::Object(fields) => {
            let mut map = BoltMap::with_capacity(fields.len());
            for (key, item) in fields {
                map.put(BoltString::new(key), json_to_bolt(item));
            }
            BoltType::Map(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_convert() {
        assert!(matches!(json_to_bolt(&json!(null)), BoltType::Null(_)));
        assert!(matches!(json_to_bolt(&json!(true)), BoltType::Boolean(_)));
        assert!(matches!(json_to_bolt(&json!(7)), BoltType::Integer(_)));
        assert!(matches!(json_to_bolt(&json!(0.5)), BoltType::Float(_)));
        assert!(matches!(json_to_bolt(&json!("Data Science")), BoltType::String(_)));
    }

    #[test]
    fn test_assignment_batch_converts_to_list_of_maps() {
        let batch = json!([
            {"name": "Python", "cluster": 0},
            {"name": "Hadoop", "cluster": 1}
        ]);
        match json_to_bolt(&batch) {
            BoltType::List(list) => {
                assert_eq!(list.value.len(), 2);
                for item in &list.value {
                    assert!(matches!(item, BoltType::Map(_)));
                }
            }
            other => panic!("expected a Bolt list, got {:?}", other),
        }
    }
}
