// src/main.rs

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::ProgressBar;
use log::info;
use std::{path::PathBuf, time::Instant};
use uuid::Uuid;

use topic_clustering_lib::{
    clustering::create_clusters::run_topic_clustering,
    graph_store::{GraphStore, MemoryGraphStore, Neo4jStore},
    utils::{
        clustering_config::ClusteringConfig, db_connect::connect, env::load_env,
        get_memory_usage, progress_config::{add_bar, ProgressConfig},
    },
};

#[derive(Parser)]
#[command(author, version, about = "Cluster co-occurring topics and write the clusters back to Neo4j", long_about = None)]
struct Args {
    /// Read groups and topics from a JSON fixture instead of Neo4j
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Compute and report clusters without writing them back
    #[arg(long)]
    dry_run: bool,

    /// Random-walk length used by Walktrap
    #[arg(long)]
    steps: Option<usize>,

    /// Assignments per write query
    #[arg(long)]
    batch_size: Option<usize>,

    /// Write a JSON cluster report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    info!("Starting topic clustering pipeline");
    load_env();

    let args = Args::parse();
    let config = ClusteringConfig::from_env().with_overrides(args.steps, args.batch_size, args.dry_run);
    config.log_config();

    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config.enabled, progress_config.detailed
    );
    let multi_progress = progress_config.create_multi_progress();
    let main_pb = add_bar(
        &multi_progress,
        2,
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        "Connecting to graph store...",
    );

    let run_id = Uuid::new_v4().to_string();
    let run_timestamp = Utc::now().naive_utc();
    info!("Run {} started at {}", run_id, run_timestamp);
    let start_time = Instant::now();

    match &args.fixture {
        Some(path) => {
            let store = MemoryGraphStore::from_fixture_file(path)?;
            info!("Using in-memory graph store with {} topics", store.topic_count());
            run_with_store(&store, &config, &run_id, &args, &progress_config, &multi_progress, &main_pb).await?;
            let stats = store.stats().await;
            info!(
                "In-memory store now holds {} clusters ({} topic lookups, {} cluster merges)",
                store.cluster_ids().await.len(),
                stats.topic_lookups,
                stats.cluster_merges
            );
        }
        None => {
            let graph = connect().await.context("Failed to connect to Neo4j")?;
            info!("Successfully connected to Neo4j");
            let store = Neo4jStore::new(graph);
            run_with_store(&store, &config, &run_id, &args, &progress_config, &multi_progress, &main_pb).await?;
        }
    }

    info!(
        "Topic clustering pipeline completed successfully in {:.2?}!",
        start_time.elapsed()
    );
    Ok(())
}

async fn run_with_store<S: GraphStore>(
    store: &S,
    config: &ClusteringConfig,
    run_id: &str,
    args: &Args,
    progress_config: &ProgressConfig,
    multi_progress: &Option<indicatif::MultiProgress>,
    main_pb: &Option<ProgressBar>,
) -> Result<()> {
    if let Some(pb) = main_pb {
        pb.inc(1);
        set_phase_message(pb, "Clustering topics", progress_config).await;
    }

    let phase_start = Instant::now();
    let outcome = run_topic_clustering(
        store,
        config,
        run_id,
        progress_config.stage_progress(multi_progress),
    )
    .await
    .context("Topic clustering failed")?;

    info!(
        "Clustering completed. {} topics in {} clusters in {:.2?}.",
        outcome.clustering.len(),
        outcome.clustering.cluster_count(),
        phase_start.elapsed()
    );
    if let Some(summary) = &outcome.write_back {
        info!(
            "Write-back: {} submitted, {} linked, {} batches",
            summary.submitted, summary.linked, summary.batches
        );
    }

    if let Some(path) = &args.report {
        outcome.report.write_json(path)?;
    }

    if let Some(pb) = main_pb {
        pb.inc(1);
        pb.finish_with_message(format!(
            "Clustering complete: {} clusters",
            outcome.clustering.cluster_count()
        ));
    }
    Ok(())
}

async fn set_phase_message(pb: &ProgressBar, phase: &str, progress_config: &ProgressConfig) {
    if progress_config.should_show_memory() {
        let memory_mb = get_memory_usage().await;
        pb.set_message(format!("{} (Memory: {} MB)", phase, memory_mb));
    } else {
        pb.set_message(phase.to_string());
    }
}
