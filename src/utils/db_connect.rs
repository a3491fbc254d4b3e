// src/utils/db_connect.rs

use anyhow::{Context, Result};
use log::info;
use neo4rs::{query, ConfigBuilder, Graph};

use crate::utils::env::env_or;

/// Connection settings for the Neo4j instance holding the Group/Topic graph.
#[derive(Debug, Clone)]
pub struct Neo4jSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: usize,
    pub fetch_size: usize,
}

impl Neo4jSettings {
    pub fn from_env() -> Self {
        Self {
            uri: env_or("NEO4J_URI", "bolt://localhost:7687".to_string()),
            user: env_or("NEO4J_USER", "neo4j".to_string()),
            password: std::env::var("NEO4J_PASSWORD").unwrap_or_default(),
            database: env_or("NEO4J_DATABASE", "neo4j".to_string()),
            max_connections: env_or("NEO4J_MAX_CONNECTIONS", 4),
            fetch_size: env_or("NEO4J_FETCH_SIZE", 500),
        }
    }
}

/// Opens the Neo4j connection and checks it with a trivial query.
pub async fn connect() -> Result<Graph> {
    let settings = Neo4jSettings::from_env();
    info!(
        "DB Config: Uri={}, Database={}, User={}",
        settings.uri, settings.database, settings.user
    );

    let config = ConfigBuilder::default()
        .uri(settings.uri.as_str())
        .user(settings.user.as_str())
        .password(settings.password.as_str())
        .db(settings.database.as_str())
        .max_connections(settings.max_connections)
        .fetch_size(settings.fetch_size)
        .build()
        .context("Failed to build Neo4j configuration")?;

    info!("Connecting to Neo4j database...");
    let graph = Graph::connect(config)
        .await
        .context("Failed to connect to Neo4j")?;

    // Test connection
    let mut probe = graph
        .execute(query("RETURN 1 AS ok"))
        .await
        .context("Test query 'RETURN 1' failed")?;
    probe
        .next()
        .await
        .context("Failed to read test query result")?
        .context("Test query 'RETURN 1' returned no rows")?;

    info!("Neo4j connection initialized successfully.");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        std::env::remove_var("NEO4J_URI");
        std::env::remove_var("NEO4J_MAX_CONNECTIONS");
        let settings = Neo4jSettings::from_env();
        assert_eq!(settings.uri, "bolt://localhost:7687");
        assert_eq!(settings.max_connections, 4);
    }
}
