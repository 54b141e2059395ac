use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    primitives::{AccountId, BlockHash, Level, OperationGroupHash, ProtocolId},
    string_or_native,
    votes::Ballot,
};

/// A batch of operations sharing one signature and branch; the unit of
/// block inclusion.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct OperationsGroup {
    pub protocol: ProtocolId,
    #[serde(default)]
    pub chain_id: Option<String>,
    pub hash: OperationGroupHash,
    pub branch: BlockHash,
    pub contents: Vec<Operation>,
    #[serde(default)]
    pub signature: Option<String>,
}

/// The closed set of operation kinds. Downstream consumers match
/// exhaustively; a kind outside this set is a decode failure.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Endorsement {
        level: Level,
    },
    SeedNonceRevelation {
        level: Level,
        nonce: String,
    },
    ActivateAccount {
        pkh: AccountId,
        secret: String,
    },
    Reveal {
        source: AccountId,
        #[serde(with = "string_or_native")]
        fee: u64,
        #[serde(with = "string_or_native")]
        counter: u64,
        #[serde(with = "string_or_native")]
        gas_limit: u64,
        #[serde(with = "string_or_native")]
        storage_limit: u64,
        public_key: String,
    },
    Transaction {
        source: AccountId,
        #[serde(with = "string_or_native")]
        fee: u64,
        #[serde(with = "string_or_native")]
        counter: u64,
        #[serde(with = "string_or_native")]
        gas_limit: u64,
        #[serde(with = "string_or_native")]
        storage_limit: u64,
        #[serde(with = "string_or_native")]
        amount: u64,
        destination: AccountId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parameters: Option<Value>,
    },
    Origination {
        source: AccountId,
        #[serde(with = "string_or_native")]
        fee: u64,
        #[serde(with = "string_or_native")]
        counter: u64,
        #[serde(with = "string_or_native")]
        gas_limit: u64,
        #[serde(with = "string_or_native")]
        storage_limit: u64,
        #[serde(rename = "managerPubkey")]
        manager_pubkey: AccountId,
        #[serde(with = "string_or_native")]
        balance: u64,
        #[serde(default)]
        spendable: Option<bool>,
        #[serde(default)]
        delegatable: Option<bool>,
        #[serde(default)]
        delegate: Option<AccountId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        script: Option<Value>,
    },
    Delegation {
        source: AccountId,
        #[serde(with = "string_or_native")]
        fee: u64,
        #[serde(with = "string_or_native")]
        counter: u64,
        #[serde(with = "string_or_native")]
        gas_limit: u64,
        #[serde(with = "string_or_native")]
        storage_limit: u64,
        #[serde(default)]
        delegate: Option<AccountId>,
    },
    Proposals {
        source: AccountId,
        period: i64,
        proposals: Vec<ProtocolId>,
    },
    Ballot {
        source: AccountId,
        period: i64,
        proposal: ProtocolId,
        ballot: Ballot,
    },
    DoubleBakingEvidence {
        bh1: Value,
        bh2: Value,
    },
    DoubleEndorsementEvidence {
        op1: Value,
        op2: Value,
    },
}

/// Decodes a `blocks/{hash}/operations` document: a list of validation
/// passes, each a list of groups, flattened client-side.
pub fn decode_operations_document(json: &str) -> Result<Vec<OperationsGroup>> {
    let normalized = normalize_legacy_fields(json);

    serde_json::from_str::<Vec<Vec<OperationsGroup>>>(&normalized)
        .context("failed to decode operations document")
        .map(|passes| passes.into_iter().flatten().collect())
}

// Nodes running protocols before Babylon serve `manager_pubkey` where
// later ones serve `managerPubkey`.
fn normalize_legacy_fields(json: &str) -> String {
    json.replace("\"manager_pubkey\"", "\"managerPubkey\"")
}
