use core::{pin::pin, time::Duration};
use std::sync::Arc;

use anyhow::Result;
use chain_sync::{BlockAction, ChainSyncEngine, MemoryStore, SyncConfig};
use futures::StreamExt as _;
use log::{error, info};
use node_api::{Error as NodeError, NodeApi, NodeConnection};
use reqwest::Client;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use types::{AccountId, BlockHash, Level};

pub struct IndexerConfig {
    pub connection: NodeConnection,
    pub sync: SyncConfig,
    /// When set, each cycle syncs the most recent levels via
    /// `sync_latest` instead of catching up from the stored maximum.
    pub depth: Option<Level>,
    /// Anchor for `sync_latest`, overriding the chain head.
    pub start_hash: Option<BlockHash>,
    pub poll_interval: Duration,
}

pub fn run(config: IndexerConfig) -> Result<()> {
    initialize_logger();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_indexer(config))
}

fn initialize_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_indexer(config: IndexerConfig) -> Result<()> {
    let IndexerConfig {
        connection,
        sync,
        depth,
        start_hash,
        poll_interval,
    } = config;

    info!(
        "indexing from {}://{}:{}",
        connection.protocol, connection.host, connection.port,
    );

    let api = Arc::new(NodeApi::new(connection, Client::new()));
    let store = Arc::new(MemoryStore::new());
    let engine = ChainSyncEngine::new(api.clone(), store.clone(), sync);

    let shutdown_api = api.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, rejecting new node requests");
            shutdown_api.shutdown();
        }
    });

    loop {
        match run_cycle(&engine, &store, depth, start_hash.clone()).await {
            Ok(0) => {}
            Ok(count) => info!("persisted {count} block actions"),
            Err(cycle_error) => {
                if is_shutdown(&cycle_error) {
                    info!("sync interrupted by shutdown");
                    return Ok(());
                }

                // Cross-page recovery is this loop: the failed cycle is
                // retried from the stored maximum on the next poll.
                error!("sync cycle failed: {cycle_error:?}");
            }
        }

        if api.is_rejecting() {
            return Ok(());
        }

        tokio::time::sleep(poll_interval).await;
    }
}

async fn run_cycle(
    engine: &ChainSyncEngine<Arc<NodeApi>, Arc<MemoryStore>>,
    store: &MemoryStore,
    depth: Option<Level>,
    start_hash: Option<BlockHash>,
) -> Result<u64> {
    let follow_fork = engine.config().follow_fork;

    let plan = if depth.is_some() || start_hash.is_some() {
        engine.sync_latest(depth, start_hash, follow_fork).await?
    } else {
        engine.sync_from_last_indexed(follow_fork).await?
    };

    if plan.count == 0 {
        return Ok(0);
    }

    info!(
        "syncing {} levels up to {} in {} pages",
        plan.count,
        plan.reference.level,
        plan.pages.len(),
    );

    let mut persisted = 0;
    let mut pages = pin!(engine.stream_pages(plan));

    while let Some(page) = pages.next().await {
        let results = page?;

        for (action, accounts) in &results {
            store.apply(action);
            emit(action, accounts)?;
        }

        persisted += results.len() as u64;
    }

    Ok(persisted)
}

// Stand-in for the downstream persistence sink: one JSON line per
// action on stdout.
fn emit(action: &BlockAction, accounts: &[AccountId]) -> Result<()> {
    let line = serde_json::to_string(&json!({
        "block_action": action,
        "touched_accounts": accounts,
    }))?;

    println!("{line}");

    Ok(())
}

fn is_shutdown(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<NodeError>()
        .is_some_and(|node_error| matches!(node_error, NodeError::Shutdown))
}
