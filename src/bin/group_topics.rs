// src/bin/group_topics.rs

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use topic_clustering_lib::{
    clustering::db::{fetch_group_topics, fetch_topic_co_occurrences},
    graph_store::{GraphStore, MemoryGraphStore, Neo4jStore},
    utils::{db_connect::connect, env::load_env},
};

#[derive(Parser)]
#[command(author, version, about = "Show groups with their topics and the most frequent topic pairs", long_about = None)]
struct Args {
    /// Read groups and topics from a JSON fixture instead of Neo4j
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Number of groups and topic pairs to print
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    load_env();
    let args = Args::parse();

    match &args.fixture {
        Some(path) => {
            let store = MemoryGraphStore::from_fixture_file(path)?;
            show_overview(&store, args.limit).await
        }
        None => {
            let graph = connect().await.context("Failed to connect to Neo4j")?;
            show_overview(&Neo4jStore::new(graph), args.limit).await
        }
    }
}

async fn show_overview<S: GraphStore>(store: &S, limit: usize) -> Result<()> {
    let groups = fetch_group_topics(store, None).await?;
    info!("{} groups carry topics", groups.len());
    println!("{:<40} {}", "GROUP", "TOPICS");
    for group in groups.iter().take(limit) {
        println!("{:<40} {}", group.group, group.topics.join(", "));
    }

    let pairs = fetch_topic_co_occurrences(store, None).await?;
    info!("{} topic pairs share at least one group", pairs.len());
    println!();
    println!("{:<30} {:<30} {:>6}", "TOPIC", "OTHER", "GROUPS");
    for pair in pairs.iter().take(limit) {
        println!("{:<30} {:<30} {:>6}", pair.topic, pair.other, pair.weight);
    }
    Ok(())
}
