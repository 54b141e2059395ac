pub use crate::{
    actions::{BlockAction, BlockFetchingResults},
    config::SyncConfig,
    fork_follower::{Error as ForkError, ForkFollower},
    pagination::{partition_list, partition_ranges},
    store::{IndexerStore, MemoryStore, StoredBlock},
    sync_engine::{ChainSyncEngine, Error as SyncError, SyncPlan, VotingDetails},
};

mod actions;
mod config;
mod fork_follower;
mod pagination;
mod store;
mod sync_engine;
