use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Position of a block in the chain. Level 0 denotes genesis.
/// The persistence layer uses `-1` as the documented empty-store sentinel.
pub type Level = i64;

/// Distance from a reference block along the predecessor chain.
/// `blocks/H~k` addresses the k-th ancestor of `H`.
pub type Offset = u64;

const HEAD_REFERENCE: &str = "head";

#[derive(Clone, PartialEq, Eq, Hash, Debug, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(String);

impl BlockHash {
    /// The distinguished reference addressing the node's current chain tip.
    #[must_use]
    pub fn head() -> Self {
        Self(HEAD_REFERENCE.to_owned())
    }

    #[must_use]
    pub fn is_head(&self) -> bool {
        self.0 == HEAD_REFERENCE
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockHash {
    fn from(hash: &str) -> Self {
        Self(hash.to_owned())
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolId(String);

impl ProtocolId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProtocolId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationGroupHash(String);

impl OperationGroupHash {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OperationGroupHash {
    fn from(hash: &str) -> Self {
        Self(hash.to_owned())
    }
}

/// The block a piece of state was observed in.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BlockReference {
    pub hash: BlockHash,
    pub level: Level,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_reference_is_distinguished() {
        assert!(BlockHash::head().is_head());
        assert!(!BlockHash::from("BLockGenesisGenesisGenesisGenesisGenesisf79b5d1CoW2").is_head());
    }

    #[test]
    fn block_hash_serializes_transparently() {
        let hash = BlockHash::from("BKpbfCvh777DQHnXjU2sqHvVUNZ7dBAdqEfKkdw8EGSkD9LSYXb");

        assert_eq!(
            serde_json::to_string(&hash).expect("hash serialization should not fail"),
            "\"BKpbfCvh777DQHnXjU2sqHvVUNZ7dBAdqEfKkdw8EGSkD9LSYXb\"",
        );
    }
}
