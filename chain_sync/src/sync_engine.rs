use core::ops::RangeInclusive;
use std::collections::HashMap;

use anyhow::{ensure, Result};
use futures::{stream, try_join, Stream, StreamExt as _};
use log::info;
use node_api::{
    commands, fetch, fetch_merge, AccountAtBlock, AccountIds, BakingRightsAtLevel, BlockAtOffset,
    CurrentProposal, CurrentQuorum, EndorsingRightsAtLevel, ManagerKeyAtBlock, NodeRpc,
    OperationsWithAccounts, VotingBallotList, VotingBallots, VotingListings, VotingProposals,
};
use thiserror::Error;
use types::{
    Account, AccountId, BakingRights, BallotCounts, BallotVote, Block, BlockData, BlockHash,
    BlockReference, CurrentVotes, EndorsingRights, Level, ManagerKey, Offset, ProtocolId,
    VoteListing,
};

use crate::{
    actions::{BlockAction, BlockFetchingResults},
    config::SyncConfig,
    fork_follower::ForkFollower,
    pagination,
    store::IndexerStore,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "level range {start}..={end} is not addressable from the reference at level {reference}"
    )]
    RangeOutOfBounds {
        start: Level,
        end: Level,
        reference: Level,
    },
}

/// One sync cycle's worth of work: page ranges relative to a fixed
/// reference block. Pages are lazy; the consumer drives them
/// sequentially to preserve database-write ordering.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SyncPlan {
    pub reference: BlockReference,
    pub pages: Vec<RangeInclusive<Level>>,
    pub count: u64,
    pub follow_fork: bool,
}

/// Voting state beyond the per-block quorum and active proposal:
/// proposal rankings, baker rolls and cast ballots.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct VotingDetails {
    pub proposals: Vec<(ProtocolId, i64)>,
    pub listings: Vec<VoteListing>,
    pub ballot_counts: BallotCounts,
    pub ballots: Vec<BallotVote>,
}

/// Orchestrates catch-up synchronization: queries the store for the
/// highest indexed level, the node for the head, partitions the gap
/// into pages and correlates each page's blocks with their operations,
/// touched accounts and voting state.
pub struct ChainSyncEngine<Rpc, Store> {
    rpc: Rpc,
    store: Store,
    config: SyncConfig,
}

impl<Rpc: NodeRpc, Store: IndexerStore> ChainSyncEngine<Rpc, Store> {
    pub fn new(rpc: Rpc, store: Store, config: SyncConfig) -> Self {
        Self { rpc, store, config }
    }

    #[must_use]
    pub fn rpc(&self) -> &Rpc {
        &self.rpc
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn head(&self) -> Result<BlockData> {
        self.block_by_reference(&BlockHash::head()).await
    }

    /// Plans the catch-up from the highest indexed level to the node's
    /// head. An up-to-date store yields an empty plan.
    pub async fn sync_from_last_indexed(&self, follow_fork: bool) -> Result<SyncPlan> {
        let stored_max = self.store.fetch_max_level().await?;
        let head = self.head().await?;
        let reference = BlockReference {
            hash: head.hash,
            level: head.level,
        };

        if stored_max >= reference.level {
            info!(
                "store is at level {stored_max}, head is at level {}; nothing to sync",
                reference.level,
            );

            return Ok(SyncPlan {
                reference,
                pages: vec![],
                count: 0,
                follow_fork,
            });
        }

        // Genesis is never re-fetched: bootstrapping starts at level 1.
        let start = stored_max.max(0) + 1;

        Ok(self.plan(reference, start, follow_fork))
    }

    /// Plans a sync of the most recent `depth` levels (everything when
    /// absent), optionally anchored at a block other than the head.
    pub async fn sync_latest(
        &self,
        depth: Option<Level>,
        start_hash: Option<BlockHash>,
        follow_fork: bool,
    ) -> Result<SyncPlan> {
        let anchor = start_hash.unwrap_or_else(BlockHash::head);
        let head = self.block_by_reference(&anchor).await?;
        let reference = BlockReference {
            hash: head.hash,
            level: head.level,
        };

        let start = match depth {
            Some(depth) => (reference.level - depth + 1).max(1),
            None => 1,
        };

        Ok(self.plan(reference, start, follow_fork))
    }

    /// Drives the plan's pages in order as a lazy stream.
    pub fn stream_pages(
        &self,
        plan: SyncPlan,
    ) -> impl Stream<Item = Result<BlockFetchingResults>> + '_ {
        let SyncPlan {
            reference,
            pages,
            follow_fork,
            ..
        } = plan;

        stream::iter(pages).then(move |page| {
            let reference = reference.clone();
            async move { self.get_blocks(reference, page, follow_fork).await }
        })
    }

    /// Fetches one page of blocks. Results are ordered by level
    /// ascending; when fork following is on and the range does not
    /// start at genesis, the fork backfill is appended after the page
    /// in reverse-chronological order.
    pub async fn get_blocks(
        &self,
        reference: BlockReference,
        levels: RangeInclusive<Level>,
        follow_fork: bool,
    ) -> Result<BlockFetchingResults> {
        let (start, end) = levels.clone().into_inner();

        ensure!(
            start >= 0 && end <= reference.level,
            Error::RangeOutOfBounds {
                start,
                end,
                reference: reference.level,
            },
        );

        // The node addresses historical blocks only by offset from a
        // known hash, never by absolute level.
        let offsets = levels
            .map(|level| (reference.level - level) as Offset)
            .collect::<Vec<_>>();

        let concurrency = self.config.block_operations_concurrency_level;
        let header_fetcher = BlockAtOffset {
            reference: reference.hash.clone(),
        };

        let headers = fetch(&self.rpc, &header_fetcher, offsets, concurrency).await?;
        let headers = headers
            .into_iter()
            .map(|(_, data)| data)
            .collect::<Vec<_>>();

        let hashes = headers
            .iter()
            .filter(|data| !data.is_genesis())
            .map(|data| data.hash.clone())
            .collect::<Vec<_>>();

        let (operations, votes) = try_join!(
            fetch(&self.rpc, &OperationsWithAccounts, hashes.clone(), concurrency),
            fetch_merge(
                &self.rpc,
                &CurrentQuorum,
                &CurrentProposal,
                hashes,
                concurrency,
                |quorum, active_proposal| CurrentVotes {
                    quorum,
                    active_proposal,
                },
            ),
        )?;

        let mut operations_by_hash = operations.into_iter().collect::<HashMap<_, _>>();
        let mut votes_by_hash = votes.into_iter().collect::<HashMap<_, _>>();

        // Genesis never entered the hash maps, so it picks up empty
        // operations and all-absent votes here.
        let mut results = headers
            .into_iter()
            .map(|data| {
                let (groups, accounts) = operations_by_hash.remove(&data.hash).unwrap_or_default();
                let votes = votes_by_hash.remove(&data.hash).unwrap_or_default();

                let block = michelson::transform_block(Block {
                    data,
                    operations: groups,
                    votes,
                });

                (BlockAction::WriteBlock(block), accounts)
            })
            .collect::<BlockFetchingResults>();

        // A range that starts at genesis has no prior state to fork
        // against; the follower stays off for that page.
        if follow_fork && start > 0 {
            let follower = ForkFollower::new(&self.rpc, &self.store, concurrency);
            let max_offset = (end - start + 1) as Offset;
            let actions = follower.follow(&reference, max_offset).await?;

            for action in actions {
                let references = self.account_references_for(&action).await?;
                results.push((action, references));
            }
        }

        Ok(results)
    }

    /// The account ids an action's block touches. Revalidations pair
    /// with an empty list without any call; the accounts already exist.
    async fn account_references_for(&self, action: &BlockAction) -> Result<Vec<AccountId>> {
        match action {
            BlockAction::RevalidateBlock(_) => Ok(vec![]),
            BlockAction::WriteBlock(block) | BlockAction::WriteAndMakeValidBlock(block) => {
                self.get_all_account_ids_for_block(&block.data).await
            }
        }
    }

    pub async fn get_all_account_ids_for_block(&self, data: &BlockData) -> Result<Vec<AccountId>> {
        if data.is_genesis() {
            return Ok(vec![]);
        }

        let mut results = fetch(
            &self.rpc,
            &OperationsWithAccounts,
            vec![data.hash.clone()],
            1,
        )
        .await?;

        Ok(results
            .pop()
            .map(|(_, (_, accounts))| accounts)
            .unwrap_or_default())
    }

    /// Every contract id known to the context at a block, empty for
    /// genesis.
    pub async fn list_contracts(&self, data: &BlockData) -> Result<Vec<AccountId>> {
        if data.is_genesis() {
            return Ok(vec![]);
        }

        let mut results = fetch(&self.rpc, &AccountIds, vec![data.hash.clone()], 1).await?;

        Ok(results.pop().map(|(_, ids)| ids).unwrap_or_default())
    }

    /// Fetches contract snapshots for the given ids, batched by
    /// `block_page_size`, with scripts rewritten to textual Michelson.
    pub async fn get_accounts_for_block(
        &self,
        reference: &BlockReference,
        ids: Vec<AccountId>,
    ) -> Result<Vec<Account>> {
        let fetcher = AccountAtBlock {
            reference: reference.clone(),
        };

        let mut accounts = Vec::with_capacity(ids.len());

        for batch in pagination::partition_list(self.config.block_page_size, &ids) {
            let fetched = fetch(
                &self.rpc,
                &fetcher,
                batch.to_vec(),
                self.config.account_concurrency_level,
            )
            .await?;

            accounts.extend(
                fetched
                    .into_iter()
                    .map(|(_, account)| michelson::transform_account(account)),
            );
        }

        Ok(accounts)
    }

    pub async fn get_account_manager_keys(
        &self,
        reference: &BlockReference,
        ids: Vec<AccountId>,
    ) -> Result<Vec<ManagerKey>> {
        let fetcher = ManagerKeyAtBlock {
            reference: reference.hash.clone(),
        };

        let mut keys = Vec::with_capacity(ids.len());

        for batch in pagination::partition_list(self.config.block_page_size, &ids) {
            let fetched = fetch(
                &self.rpc,
                &fetcher,
                batch.to_vec(),
                self.config.account_concurrency_level,
            )
            .await?;

            keys.extend(fetched.into_iter().map(|(_, key)| key));
        }

        Ok(keys)
    }

    pub async fn get_baking_rights(
        &self,
        reference: &BlockHash,
        levels: RangeInclusive<Level>,
    ) -> Result<Vec<BakingRights>> {
        let fetcher = BakingRightsAtLevel {
            reference: reference.clone(),
        };

        let fetched = fetch(
            &self.rpc,
            &fetcher,
            levels.collect(),
            self.config.block_operations_concurrency_level,
        )
        .await?;

        Ok(fetched
            .into_iter()
            .flat_map(|(_, rights)| rights)
            .collect())
    }

    pub async fn get_endorsing_rights(
        &self,
        reference: &BlockHash,
        levels: RangeInclusive<Level>,
    ) -> Result<Vec<EndorsingRights>> {
        let fetcher = EndorsingRightsAtLevel {
            reference: reference.clone(),
        };

        let fetched = fetch(
            &self.rpc,
            &fetcher,
            levels.collect(),
            self.config.block_operations_concurrency_level,
        )
        .await?;

        Ok(fetched
            .into_iter()
            .flat_map(|(_, rights)| rights)
            .collect())
    }

    /// Proposal rankings, baker rolls and ballots at a block. Genesis
    /// has no voting sub-resources and yields the empty default.
    pub async fn get_voting_details(&self, data: &BlockData) -> Result<VotingDetails> {
        if data.is_genesis() {
            return Ok(VotingDetails::default());
        }

        let input = vec![data.hash.clone()];
        let concurrency = self.config.block_operations_concurrency_level;

        let (mut proposals, mut listings, mut counts, mut ballots) = try_join!(
            fetch(&self.rpc, &VotingProposals, input.clone(), concurrency),
            fetch(&self.rpc, &VotingListings, input.clone(), concurrency),
            fetch(&self.rpc, &VotingBallots, input.clone(), concurrency),
            fetch(&self.rpc, &VotingBallotList, input, concurrency),
        )?;

        Ok(VotingDetails {
            proposals: proposals.pop().map(|(_, output)| output).unwrap_or_default(),
            listings: listings.pop().map(|(_, output)| output).unwrap_or_default(),
            ballot_counts: counts.pop().map(|(_, output)| output).unwrap_or_default(),
            ballots: ballots.pop().map(|(_, output)| output).unwrap_or_default(),
        })
    }

    async fn block_by_reference(&self, reference: &BlockHash) -> Result<BlockData> {
        let response = self.rpc.get(&commands::block(reference)).await?;
        BlockData::from_json(&response)
    }

    fn plan(&self, reference: BlockReference, start: Level, follow_fork: bool) -> SyncPlan {
        let pages = pagination::partition_ranges(
            self.config.block_page_size,
            start..=reference.level,
        )
        .collect::<Vec<_>>();

        let count = u64::try_from(reference.level - start + 1).unwrap_or_default();

        SyncPlan {
            reference,
            pages,
            count,
            follow_fork,
        }
    }
}

/// Assembles one full block from its header: operations and votes
/// joined by hash, Michelson rewritten. Genesis skips the sub-resource
/// calls entirely.
pub(crate) async fn complete_block(
    rpc: &impl NodeRpc,
    data: BlockData,
    concurrency: usize,
) -> Result<Block> {
    if data.is_genesis() {
        return Ok(Block {
            data,
            operations: vec![],
            votes: CurrentVotes::default(),
        });
    }

    let input = vec![data.hash.clone()];

    let (mut operations, mut votes) = try_join!(
        fetch(rpc, &OperationsWithAccounts, input.clone(), concurrency),
        fetch_merge(
            rpc,
            &CurrentQuorum,
            &CurrentProposal,
            input,
            concurrency,
            |quorum, active_proposal| CurrentVotes {
                quorum,
                active_proposal,
            },
        ),
    )?;

    let (groups, _accounts) = operations.pop().map(|(_, output)| output).unwrap_or_default();
    let votes = votes.pop().map(|(_, output)| output).unwrap_or_default();

    Ok(michelson::transform_block(Block {
        data,
        operations: groups,
        votes,
    }))
}
