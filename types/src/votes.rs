use serde::{Deserialize, Serialize};

use crate::primitives::{AccountId, ProtocolId};

/// Voting state attached to every synchronized block.
/// Genesis carries no voting sub-resources and defaults to all-absent.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct CurrentVotes {
    pub quorum: Option<i32>,
    pub active_proposal: Option<ProtocolId>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ballot {
    Yay,
    Nay,
    Pass,
}

/// A baker's voting weight, measured in rolls.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct VoteListing {
    pub pkh: AccountId,
    pub rolls: i32,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BallotVote {
    pub pkh: AccountId,
    pub ballot: Ballot,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct BallotCounts {
    pub yay: i32,
    pub nay: i32,
    pub pass: i32,
}
