use std::{collections::HashMap, sync::Mutex};

use anyhow::Result;
use async_trait::async_trait;
use types::{BlockHash, Level};

use crate::actions::BlockAction;

/// The block summary the store reports for its highest indexed level.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StoredBlock {
    pub hash: BlockHash,
    pub level: Level,
}

/// The four read operations the engine needs from the persistence
/// layer. Writes happen downstream, driven by the emitted
/// [`BlockAction`] stream. Implementations must answer from committed
/// state; answering from pending writes corrupts fork classification.
#[async_trait]
pub trait IndexerStore: Send + Sync {
    /// Highest indexed level, `-1` when the store holds no blocks.
    async fn fetch_max_level(&self) -> Result<Level>;

    async fn fetch_latest_block(&self) -> Result<Option<StoredBlock>>;

    async fn block_exists(&self, hash: &BlockHash) -> Result<bool>;

    async fn block_is_in_invalidated_state(&self, hash: &BlockHash) -> Result<bool>;
}

#[async_trait]
impl<S: IndexerStore> IndexerStore for &S {
    async fn fetch_max_level(&self) -> Result<Level> {
        (*self).fetch_max_level().await
    }

    async fn fetch_latest_block(&self) -> Result<Option<StoredBlock>> {
        (*self).fetch_latest_block().await
    }

    async fn block_exists(&self, hash: &BlockHash) -> Result<bool> {
        (*self).block_exists(hash).await
    }

    async fn block_is_in_invalidated_state(&self, hash: &BlockHash) -> Result<bool> {
        (*self).block_is_in_invalidated_state(hash).await
    }
}

#[async_trait]
impl<S: IndexerStore> IndexerStore for std::sync::Arc<S> {
    async fn fetch_max_level(&self) -> Result<Level> {
        self.as_ref().fetch_max_level().await
    }

    async fn fetch_latest_block(&self) -> Result<Option<StoredBlock>> {
        self.as_ref().fetch_latest_block().await
    }

    async fn block_exists(&self, hash: &BlockHash) -> Result<bool> {
        self.as_ref().block_exists(hash).await
    }

    async fn block_is_in_invalidated_state(&self, hash: &BlockHash) -> Result<bool> {
        self.as_ref().block_is_in_invalidated_state(hash).await
    }
}

#[derive(Clone, Debug)]
struct MemoryRecord {
    level: Level,
    invalidated: bool,
}

/// Hash-map store used by tests and the bundled binary. A relational
/// implementation lives behind the same trait in deployments.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<BlockHash, MemoryRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, hash: BlockHash, level: Level, invalidated: bool) {
        self.lock()
            .insert(hash, MemoryRecord { level, invalidated });
    }

    /// Applies one emitted action, the way the downstream sink would.
    pub fn apply(&self, action: &BlockAction) {
        let block = action.block();

        match action {
            BlockAction::WriteBlock(_) | BlockAction::WriteAndMakeValidBlock(_) => {
                self.insert(block.data.hash.clone(), block.data.level, false);
            }
            BlockAction::RevalidateBlock(_) => {
                if let Some(record) = self.lock().get_mut(&block.data.hash) {
                    record.invalidated = false;
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<BlockHash, MemoryRecord>> {
        self.records
            .lock()
            .expect("memory store mutex is poisoned")
    }
}

#[async_trait]
impl IndexerStore for MemoryStore {
    async fn fetch_max_level(&self) -> Result<Level> {
        Ok(self
            .lock()
            .values()
            .map(|record| record.level)
            .max()
            .unwrap_or(-1))
    }

    async fn fetch_latest_block(&self) -> Result<Option<StoredBlock>> {
        Ok(self
            .lock()
            .iter()
            .max_by_key(|(_, record)| record.level)
            .map(|(hash, record)| StoredBlock {
                hash: hash.clone(),
                level: record.level,
            }))
    }

    async fn block_exists(&self, hash: &BlockHash) -> Result<bool> {
        Ok(self.lock().contains_key(hash))
    }

    async fn block_is_in_invalidated_state(&self, hash: &BlockHash) -> Result<bool> {
        Ok(self
            .lock()
            .get(hash)
            .is_some_and(|record| record.invalidated))
    }
}
