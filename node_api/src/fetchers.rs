//! Fetchers tying node commands to their decoders. Batch drivers in
//! [`crate::fetcher`] run them with bounded concurrency.

use anyhow::{Context as _, Result};
use types::{
    Account, AccountId, BakingRights, BallotCounts, BallotVote, BlockData, BlockHash,
    BlockReference, EndorsingRights, Level, ManagerKey, Offset, OperationsGroup, ProtocolId,
    VoteListing,
};

use crate::{commands, fetcher::DataFetcher, node_api::Error};

/// Block headers addressed by ancestry distance from a fixed reference.
pub struct BlockAtOffset {
    pub reference: BlockHash,
}

impl DataFetcher for BlockAtOffset {
    type In = Offset;
    type Out = BlockData;

    fn command(&self, input: &Self::In) -> String {
        commands::block_at_offset(&self.reference, *input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        BlockData::from_json(response)
    }
}

/// One GET, two decodings: the operation groups and the account ids the
/// document references. The node 404s this sub-resource for genesis;
/// that maps to no operations and no touched accounts.
pub struct OperationsWithAccounts;

impl DataFetcher for OperationsWithAccounts {
    type In = BlockHash;
    type Out = (Vec<OperationsGroup>, Vec<AccountId>);

    fn command(&self, input: &Self::In) -> String {
        commands::operations(input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        let groups = types::decode_operations_document(response)?;
        let accounts = types::extract_account_references(response);
        Ok((groups, accounts))
    }

    fn recover(&self, _input: &Self::In, error: &anyhow::Error) -> Option<Self::Out> {
        recover_not_found(error, || (vec![], vec![]))
    }
}

pub struct CurrentQuorum;

impl DataFetcher for CurrentQuorum {
    type In = BlockHash;
    type Out = Option<i32>;

    fn command(&self, input: &Self::In) -> String {
        commands::current_quorum(input, None)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        serde_json::from_str(response).context("failed to decode current quorum")
    }
}

pub struct CurrentProposal;

impl DataFetcher for CurrentProposal {
    type In = BlockHash;
    type Out = Option<ProtocolId>;

    fn command(&self, input: &Self::In) -> String {
        commands::current_proposal(input, None)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        serde_json::from_str(response).context("failed to decode current proposal")
    }
}

/// All account ids known to the context at a block. 404 on genesis maps
/// to an empty listing.
pub struct AccountIds;

impl DataFetcher for AccountIds {
    type In = BlockHash;
    type Out = Vec<AccountId>;

    fn command(&self, input: &Self::In) -> String {
        commands::contracts(input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        serde_json::from_str(response).context("failed to decode contract listing")
    }

    fn recover(&self, _input: &Self::In, error: &anyhow::Error) -> Option<Self::Out> {
        recover_not_found(error, Vec::new)
    }
}

/// Contract snapshots, tagged with the block they were observed in.
pub struct AccountAtBlock {
    pub reference: BlockReference,
}

impl DataFetcher for AccountAtBlock {
    type In = AccountId;
    type Out = Account;

    fn command(&self, input: &Self::In) -> String {
        commands::contract(&self.reference.hash, input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        Account::from_json(response, &self.reference)
    }
}

pub struct ManagerKeyAtBlock {
    pub reference: BlockHash,
}

impl DataFetcher for ManagerKeyAtBlock {
    type In = AccountId;
    type Out = ManagerKey;

    fn command(&self, input: &Self::In) -> String {
        commands::manager_key(&self.reference, input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        ManagerKey::from_json(response)
    }
}

pub struct BakingRightsAtLevel {
    pub reference: BlockHash,
}

impl DataFetcher for BakingRightsAtLevel {
    type In = Level;
    type Out = Vec<BakingRights>;

    fn command(&self, input: &Self::In) -> String {
        commands::baking_rights(&self.reference, *input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        BakingRights::list_from_json(response)
    }
}

pub struct EndorsingRightsAtLevel {
    pub reference: BlockHash,
}

impl DataFetcher for EndorsingRightsAtLevel {
    type In = Level;
    type Out = Vec<EndorsingRights>;

    fn command(&self, input: &Self::In) -> String {
        commands::endorsing_rights(&self.reference, *input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        EndorsingRights::list_from_json(response)
    }
}

pub struct VotingListings;

impl DataFetcher for VotingListings {
    type In = BlockHash;
    type Out = Vec<VoteListing>;

    fn command(&self, input: &Self::In) -> String {
        commands::voting_listings(input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        serde_json::from_str(response).context("failed to decode vote listings")
    }
}

pub struct VotingProposals;

impl DataFetcher for VotingProposals {
    type In = BlockHash;
    type Out = Vec<(ProtocolId, i64)>;

    fn command(&self, input: &Self::In) -> String {
        commands::voting_proposals(input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        serde_json::from_str(response).context("failed to decode proposal listing")
    }
}

pub struct VotingBallots;

impl DataFetcher for VotingBallots {
    type In = BlockHash;
    type Out = BallotCounts;

    fn command(&self, input: &Self::In) -> String {
        commands::voting_ballots(input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        serde_json::from_str(response).context("failed to decode ballot counts")
    }
}

pub struct VotingBallotList;

impl DataFetcher for VotingBallotList {
    type In = BlockHash;
    type Out = Vec<BallotVote>;

    fn command(&self, input: &Self::In) -> String {
        commands::voting_ballot_list(input)
    }

    fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
        serde_json::from_str(response).context("failed to decode ballot list")
    }
}

fn recover_not_found<Out>(error: &anyhow::Error, empty: impl FnOnce() -> Out) -> Option<Out> {
    error
        .downcast_ref::<Error>()
        .is_some_and(Error::is_not_found)
        .then(empty)
}
