use serde::Serialize;
use types::{AccountId, Block};

/// The three ways a fetched block reaches the store. Downstream
/// consumers match exhaustively; there is no fourth case.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(tag = "action", content = "block", rename_all = "snake_case")]
pub enum BlockAction {
    /// A new block observed during normal forward sync.
    WriteBlock(Block),
    /// A block absent locally, observed while recovering from a fork;
    /// persisted and marked valid in one step.
    WriteAndMakeValidBlock(Block),
    /// A block already present locally but flagged invalidated; the
    /// flag is cleared.
    RevalidateBlock(Block),
}

impl BlockAction {
    #[must_use]
    pub const fn block(&self) -> &Block {
        match self {
            Self::WriteBlock(block)
            | Self::WriteAndMakeValidBlock(block)
            | Self::RevalidateBlock(block) => block,
        }
    }
}

/// One entry per level per sync cycle, paired with the account ids the
/// block touches. Downstream is the sole writer to the database.
pub type BlockFetchingResults = Vec<(BlockAction, Vec<AccountId>)>;
