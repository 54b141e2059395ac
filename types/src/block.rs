use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    operations::OperationsGroup,
    primitives::{AccountId, BlockHash, Level, ProtocolId},
    string_or_native,
    votes::CurrentVotes,
};

/// Header and metadata fields of one block, flattened from the node's
/// nested `{protocol, chain_id, hash, header, metadata}` document.
/// Immutable once decoded.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BlockData {
    pub level: Level,
    pub hash: BlockHash,
    pub predecessor: BlockHash,
    pub timestamp: DateTime<Utc>,
    pub protocol: ProtocolId,
    pub chain_id: String,
    pub operations_hash: Option<String>,
    pub fitness: Vec<String>,
    pub context: String,
    pub signature: Option<String>,
    pub validation_pass: i32,
    pub priority: Option<i32>,
    pub proof_of_work_nonce: Option<String>,
    pub cycle: Option<i64>,
    pub cycle_position: Option<i64>,
    pub voting_period: Option<i64>,
    pub voting_period_position: Option<i64>,
    pub expected_commitment: Option<bool>,
    pub baker: Option<AccountId>,
    #[serde(default, with = "string_or_native::option")]
    pub consumed_gas: Option<u64>,
    pub period_kind: Option<String>,
    pub current_expected_quorum: Option<i32>,
    pub active_proposal: Option<ProtocolId>,
    pub nonce_hash: Option<String>,
}

impl BlockData {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str::<RawBlock>(json)
            .context("failed to decode block document")
            .map(Into::into)
    }

    /// Gates every sub-resource call: genesis exposes no operations,
    /// accounts or votes and the node 404s on those paths.
    #[must_use]
    pub const fn is_genesis(&self) -> bool {
        self.level == 0
    }
}

/// A fully correlated block: header data joined with its operation
/// groups and the voting state observed at the same hash.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Block {
    pub data: BlockData,
    pub operations: Vec<OperationsGroup>,
    pub votes: CurrentVotes,
}

#[derive(Deserialize)]
struct RawBlock {
    protocol: ProtocolId,
    chain_id: String,
    hash: BlockHash,
    header: RawHeader,
    #[serde(default)]
    metadata: Option<RawMetadata>,
}

#[derive(Deserialize)]
struct RawHeader {
    level: Level,
    predecessor: BlockHash,
    timestamp: DateTime<Utc>,
    validation_pass: i32,
    #[serde(default)]
    operations_hash: Option<String>,
    #[serde(default)]
    fitness: Vec<String>,
    context: String,
    #[serde(default)]
    priority: Option<i32>,
    #[serde(default)]
    proof_of_work_nonce: Option<String>,
    #[serde(default)]
    signature: Option<String>,
}

// Genesis metadata carries none of these fields.
#[derive(Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    baker: Option<AccountId>,
    #[serde(default, with = "string_or_native::option")]
    consumed_gas: Option<u64>,
    #[serde(default)]
    level: Option<RawLevelInfo>,
    #[serde(default)]
    voting_period_kind: Option<String>,
    #[serde(default)]
    current_expected_quorum: Option<i32>,
    #[serde(default)]
    active_proposal: Option<ProtocolId>,
    #[serde(default)]
    nonce_hash: Option<String>,
}

#[derive(Deserialize)]
struct RawLevelInfo {
    cycle: i64,
    cycle_position: i64,
    voting_period: i64,
    voting_period_position: i64,
    #[serde(default)]
    expected_commitment: Option<bool>,
}

impl From<RawBlock> for BlockData {
    fn from(raw: RawBlock) -> Self {
        let RawBlock {
            protocol,
            chain_id,
            hash,
            header,
            metadata,
        } = raw;

        let metadata = metadata.unwrap_or_default();
        let level_info = metadata.level;

        Self {
            level: header.level,
            hash,
            predecessor: header.predecessor,
            timestamp: header.timestamp,
            protocol,
            chain_id,
            operations_hash: header.operations_hash,
            fitness: header.fitness,
            context: header.context,
            signature: header.signature,
            validation_pass: header.validation_pass,
            priority: header.priority,
            proof_of_work_nonce: header.proof_of_work_nonce,
            cycle: level_info.as_ref().map(|info| info.cycle),
            cycle_position: level_info.as_ref().map(|info| info.cycle_position),
            voting_period: level_info.as_ref().map(|info| info.voting_period),
            voting_period_position: level_info.as_ref().map(|info| info.voting_period_position),
            expected_commitment: level_info.and_then(|info| info.expected_commitment),
            baker: metadata.baker,
            consumed_gas: metadata.consumed_gas,
            period_kind: metadata.voting_period_kind,
            current_expected_quorum: metadata.current_expected_quorum,
            active_proposal: metadata.active_proposal,
            nonce_hash: metadata.nonce_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn block_document_flattens_header_and_metadata() -> Result<()> {
        let document = json!({
            "protocol": "Pt24m4xiPbLDhVgVfABUjirbmda3yohdN82Sp9FeuAXJ4eV9otd",
            "chain_id": "NetXdQprcVkpaWU",
            "hash": "BKpbfCvh777DQHnXjU2sqHvVUNZ7dBAdqEfKkdw8EGSkD9LSYXb",
            "header": {
                "level": 100_000,
                "proto": 4,
                "predecessor": "BLz6yCE4BUL4ppo1zsEWdK9FRCt15WAY7ECQcuK9RtWg4xeEVL7",
                "timestamp": "2019-06-14T00:00:00Z",
                "validation_pass": 4,
                "operations_hash": "LLoZqBDX1E2ADRXbmwYo8VtMNeHG6Ygzmm4Zqv97i91UPBQHy9Vq3",
                "fitness": ["00", "0000000000adf3e4"],
                "context": "CoVDyf9y9gHfAkPWofBJffo4X4bWjmehH2LeVonDcCKKzyQYwqdk",
                "priority": 0,
                "proof_of_work_nonce": "00000003a8a2e442",
                "signature": "sigcCnjfe5ZKpPdhKbT8fx5vvqvmNBRqGbrKbgsEHUvYSYSY3WUC"
            },
            "metadata": {
                "baker": "tz1Yju7jmmsaUiG9qQLoYv35v5pHgnWoLWbt",
                "consumed_gas": "0",
                "level": {
                    "level": 100_000,
                    "level_position": 99_999,
                    "cycle": 24,
                    "cycle_position": 1695,
                    "voting_period": 3,
                    "voting_period_position": 1695,
                    "expected_commitment": false
                },
                "voting_period_kind": "proposal",
                "nonce_hash": null
            }
        });

        let data = BlockData::from_json(&document.to_string())?;

        assert_eq!(data.level, 100_000);
        assert_eq!(data.cycle, Some(24));
        assert_eq!(data.consumed_gas, Some(0));
        assert_eq!(data.period_kind.as_deref(), Some("proposal"));
        assert_eq!(data.expected_commitment, Some(false));
        assert!(!data.is_genesis());

        Ok(())
    }

    #[test]
    fn genesis_block_decodes_without_metadata_fields() -> Result<()> {
        let document = json!({
            "protocol": "PrihK96nBAFSxVL1GLJTVhu9YnzkMFiBeuJRPA8NwuZVZCE1L6i",
            "chain_id": "NetXdQprcVkpaWU",
            "hash": "BLockGenesisGenesisGenesisGenesisGenesisf79b5d1CoW2",
            "header": {
                "level": 0,
                "proto": 0,
                "predecessor": "BLockGenesisGenesisGenesisGenesisGenesisf79b5d1CoW2",
                "timestamp": "2018-06-30T16:07:32Z",
                "validation_pass": 0,
                "fitness": [],
                "context": "CoV8SQumiVU9saiu3FVNeDNewJaJH8yWdsGF3WLdsRr2P9S7MzCj"
            },
            "metadata": {
                "protocol": "PrihK96nBAFSxVL1GLJTVhu9YnzkMFiBeuJRPA8NwuZVZCE1L6i",
                "next_protocol": "PtCJ7pwoxe8JasnHY8YonnLYjcVHmhiARPJvqcC6VfHT5s8k8sY"
            }
        });

        let data = BlockData::from_json(&document.to_string())?;

        assert!(data.is_genesis());
        assert_eq!(data.baker, None);
        assert_eq!(data.cycle, None);
        assert_eq!(data.priority, None);

        Ok(())
    }
}
