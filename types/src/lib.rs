pub use crate::{
    accounts::{extract_account_references, Account, ManagerKey},
    block::{Block, BlockData},
    operations::{decode_operations_document, Operation, OperationsGroup},
    primitives::{
        AccountId, BlockHash, BlockReference, Level, Offset, OperationGroupHash, ProtocolId,
    },
    rights::{BakingRights, EndorsingRights},
    votes::{Ballot, BallotCounts, BallotVote, CurrentVotes, VoteListing},
};

mod accounts;
mod block;
mod operations;
mod primitives;
mod rights;
mod votes;

pub mod string_or_native;
