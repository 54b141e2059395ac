use anyhow::{bail, Result};
use log::{error, warn};
use node_api::{commands, NodeRpc};
use thiserror::Error;
use types::{BlockData, BlockReference, Level, Offset};

use crate::{actions::BlockAction, store::IndexerStore, sync_engine::complete_block};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "stored head at level {stored} disagrees with the node's ancestor at level {node}; \
         continuing would corrupt the store"
    )]
    LevelMismatch { stored: Level, node: Level },
}

/// Repairs a divergence between the locally indexed chain and the
/// node's canonical chain. After a run, every level it covered holds
/// the block the node reports at that distance from the head, with the
/// invalidated flag cleared.
pub struct ForkFollower<'a, Rpc, Store> {
    rpc: &'a Rpc,
    store: &'a Store,
    concurrency: usize,
}

impl<'a, Rpc: NodeRpc, Store: IndexerStore> ForkFollower<'a, Rpc, Store> {
    pub fn new(rpc: &'a Rpc, store: &'a Store, concurrency: usize) -> Self {
        Self {
            rpc,
            store,
            concurrency,
        }
    }

    /// Compares the node's block at `max_offset` (the level of the
    /// stored head) against the store, and walks further back when
    /// they disagree. The returned actions are reverse-chronological:
    /// the head of the fork first, the oldest repaired ancestor last.
    pub async fn follow(
        &self,
        reference: &BlockReference,
        max_offset: Offset,
    ) -> Result<Vec<BlockAction>> {
        let top = self.block_at_offset(reference, max_offset).await?;

        match self.store.fetch_latest_block().await? {
            None => {
                warn!("store reports no latest block; following the fork without a pre-check");
            }
            Some(stored) => {
                if stored.level != top.level {
                    bail!(Error::LevelMismatch {
                        stored: stored.level,
                        node: top.level,
                    });
                }

                if stored.hash == top.hash {
                    return Ok(vec![]);
                }
            }
        }

        self.walk(reference, max_offset, top).await
    }

    async fn walk(
        &self,
        reference: &BlockReference,
        max_offset: Offset,
        top: BlockData,
    ) -> Result<Vec<BlockAction>> {
        let top_is_genesis = top.is_genesis();
        let top = complete_block(self.rpc, top, self.concurrency).await?;

        let mut actions = vec![BlockAction::WriteAndMakeValidBlock(top)];

        if top_is_genesis {
            return Ok(actions);
        }

        for ancestor_offset in 1.. {
            let data = self
                .block_at_offset(reference, max_offset + ancestor_offset)
                .await?;

            let exists = self.store.block_exists(&data.hash).await?;
            let invalidated = self.store.block_is_in_invalidated_state(&data.hash).await?;

            match (exists, invalidated) {
                // Reached an ancestor that is present and valid; the
                // chains agree from here down.
                (true, false) => break,
                (true, true) => {
                    let is_genesis = data.is_genesis();
                    let block = complete_block(self.rpc, data, self.concurrency).await?;
                    actions.push(BlockAction::RevalidateBlock(block));

                    if is_genesis {
                        break;
                    }
                }
                (false, false) => {
                    let is_genesis = data.is_genesis();
                    let block = complete_block(self.rpc, data, self.concurrency).await?;
                    actions.push(BlockAction::WriteAndMakeValidBlock(block));

                    if is_genesis {
                        break;
                    }
                }
                (false, true) => {
                    error!(
                        "block {} at level {} is absent locally yet marked invalidated; \
                         stopping the fork-following run",
                        data.hash, data.level,
                    );
                    break;
                }
            }
        }

        Ok(actions)
    }

    async fn block_at_offset(
        &self,
        reference: &BlockReference,
        offset: Offset,
    ) -> Result<BlockData> {
        let command = commands::block_at_offset(&reference.hash, offset);
        let response = self.rpc.get(&command).await?;
        BlockData::from_json(&response)
    }
}
