use core::time::Duration;

use chain_sync::SyncConfig;
use clap::{Args, Parser};
use node_api::NodeConnection;
use types::{BlockHash, Level};

use crate::runner::IndexerConfig;

/// Catch-up indexer for the Tezos network
#[derive(Parser)]
#[clap(verbatim_doc_comment, version)]
pub struct IndexerArgs {
    #[clap(flatten)]
    node_options: NodeOptions,

    #[clap(flatten)]
    sync_options: SyncOptions,
}

#[derive(Args)]
struct NodeOptions {
    /// Scheme used to reach the node
    #[clap(long, default_value = "http")]
    node_protocol: String,

    /// Host name of the node
    #[clap(long, default_value = "localhost")]
    node_host: String,

    /// RPC port of the node
    #[clap(long, default_value_t = 8732)]
    node_port: u16,

    /// Path prefix before `chains/main/`, for nodes behind a proxy
    #[clap(long, default_value = "")]
    node_path_prefix: String,

    /// Seconds to wait for a GET response body to materialize
    #[clap(long, default_value_t = 15)]
    get_response_entity_timeout: u64,

    /// Seconds to wait for a POST response body to materialize
    #[clap(long, default_value_t = 30)]
    post_response_entity_timeout: u64,
}

#[derive(Args)]
struct SyncOptions {
    /// Maximum levels per page and account ids per batch
    #[clap(long, default_value_t = 500)]
    block_page_size: usize,

    /// In-flight cap for per-block fetches
    #[clap(long, default_value_t = 10)]
    block_operations_concurrency_level: usize,

    /// In-flight cap for per-account fetches
    #[clap(long, default_value_t = 5)]
    account_concurrency_level: usize,

    /// Detect and repair forks of the indexed branch on every cycle
    #[clap(long)]
    follow_fork: bool,

    /// Sync only the most recent levels instead of catching up from
    /// the stored maximum
    #[clap(long)]
    depth: Option<Level>,

    /// Anchor the sync at this block hash instead of the chain head
    #[clap(long)]
    start_hash: Option<String>,

    /// Seconds between head polls
    #[clap(long, default_value_t = 30)]
    poll_interval: u64,
}

impl IndexerArgs {
    pub fn into_config(self) -> IndexerConfig {
        let Self {
            node_options,
            sync_options,
        } = self;

        let connection = NodeConnection {
            protocol: node_options.node_protocol,
            host: node_options.node_host,
            port: node_options.node_port,
            path_prefix: node_options.node_path_prefix,
            get_response_entity_timeout: Duration::from_secs(
                node_options.get_response_entity_timeout,
            ),
            post_response_entity_timeout: Duration::from_secs(
                node_options.post_response_entity_timeout,
            ),
        };

        let sync = SyncConfig {
            block_page_size: sync_options.block_page_size,
            block_operations_concurrency_level: sync_options.block_operations_concurrency_level,
            account_concurrency_level: sync_options.account_concurrency_level,
            follow_fork: sync_options.follow_fork,
        };

        IndexerConfig {
            connection,
            sync,
            depth: sync_options.depth,
            start_hash: sync_options.start_hash.map(BlockHash::from),
            poll_interval: Duration::from_secs(sync_options.poll_interval),
        }
    }
}
