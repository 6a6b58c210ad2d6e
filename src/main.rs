mod balance;
#[cfg(feature = "bench")]
mod bench;
mod db;
mod ingestion;
mod queue;
mod rpc;
mod store;
mod types;

use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use balance::CompressionScheduler;
use db::DbPool;
use ingestion::{BlockProcessor, BlockPublisher, Ingestor, PgNotifyPublisher};
use queue::BlockProcessorQueue;
use rpc::RpcClient;
use store::PgStore;
use types::config::indexer::IndexerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = IndexerConfig::load(Path::new("config/config.json"))?;
    load_required_env_vars(&config)?;

    #[cfg(feature = "bench")]
    {
        std::fs::create_dir_all("data")?;
        bench::init(Path::new("data/bench.csv"))?;
        tracing::info!("Benchmarking enabled, writing to data/bench.csv");
    }

    tracing::info!(
        "Indexing chain {} (id {}), compression window {} blocks",
        config.chain.name,
        config.chain.chain_id,
        config.compression.size
    );

    let database_url = env::var(&config.database.database_url_env_var)
        .with_context(|| format!("env var {} not set", config.database.database_url_env_var))?;
    let pool = Arc::new(
        DbPool::new(&database_url, config.database.max_connections)
            .await
            .context("failed to create database pool")?,
    );
    pool.run_migrations()
        .await
        .context("failed to run database migrations")?;

    let rpc_url = env::var(&config.chain.rpc_url_env_var)
        .with_context(|| format!("env var {} not set", config.chain.rpc_url_env_var))?;
    let source = Arc::new(
        RpcClient::for_chain(&rpc_url, &config.chain).context("failed to create RPC client")?,
    );

    // one queue for the whole process, shared by every worker
    let queue = Arc::new(BlockProcessorQueue::new());
    let store = Arc::new(PgStore::new(pool.clone()));

    let publisher: Option<Arc<dyn BlockPublisher>> = config.publish.as_ref().map(|publish| {
        tracing::info!("Publishing blocks on channel {}", publish.channel);
        Arc::new(PgNotifyPublisher::new(pool.clone(), publish.channel.clone()))
            as Arc<dyn BlockPublisher>
    });

    let processor = Arc::new(BlockProcessor::new(
        source.clone(),
        store.clone(),
        queue.clone(),
        publisher,
    ));
    let ingestor = Arc::new(Ingestor::new(
        processor,
        source,
        store.clone(),
        queue,
        &config.queue,
        config.chain.start_block,
    ));
    let scheduler = CompressionScheduler::new(
        store,
        config.compression.size,
        config.compression.check_interval(),
    );

    let cancel = CancellationToken::new();
    let mut tasks: JoinSet<anyhow::Result<()>> = JoinSet::new();

    tasks.spawn({
        let ingestor = ingestor.clone();
        let cancel = cancel.clone();
        async move {
            ingestor
                .run_head_follower(cancel)
                .await
                .context("head follower failed")
        }
    });

    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            ingestor.run_retry_loop(cancel).await;
            Ok(())
        }
    });

    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            scheduler
                .run(cancel)
                .await
                .context("compression scheduler failed")
        }
    });

    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("failed to listen for shutdown signal")?;
                    tracing::info!("Shutdown requested");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
            Ok(())
        }
    });

    while let Some(result) = tasks.join_next().await {
        let outcome = result.context("indexer task panicked").and_then(|r| r);
        if let Err(e) = outcome {
            // stop the remaining tasks before reporting
            cancel.cancel();
            while tasks.join_next().await.is_some() {}
            return Err(e);
        }
    }

    tracing::info!("Indexer stopped");
    Ok(())
}

/// Ensures the RPC and database URL env vars are set, loading .env if needed.
fn load_required_env_vars(config: &IndexerConfig) -> anyhow::Result<()> {
    let required = [
        config.chain.rpc_url_env_var.as_str(),
        config.database.database_url_env_var.as_str(),
    ];

    let missing: Vec<&str> = required
        .iter()
        .filter(|var| env::var(var).is_err())
        .copied()
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    dotenvy::dotenv().with_context(|| {
        format!(
            "Missing env vars {:?} and failed to load .env file",
            missing
        )
    })?;

    let still_missing: Vec<&str> = required
        .iter()
        .filter(|var| env::var(var).is_err())
        .copied()
        .collect();

    anyhow::ensure!(
        still_missing.is_empty(),
        "Missing required env vars after loading .env: {:?}",
        still_missing
    );

    Ok(())
}
