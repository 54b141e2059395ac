pub use crate::{
    fetcher::{fetch, fetch_merge, fetch_tupled, DataFetcher},
    fetchers::{
        AccountAtBlock, AccountIds, BakingRightsAtLevel, BlockAtOffset, CurrentProposal,
        CurrentQuorum, EndorsingRightsAtLevel, ManagerKeyAtBlock, OperationsWithAccounts,
        VotingBallotList, VotingBallots, VotingListings, VotingProposals,
    },
    mock::MockNode,
    node_api::{Error, NodeApi, NodeConnection, NodeRpc},
};

pub mod commands;

mod fetcher;
mod fetchers;
mod mock;
mod node_api;
