use std::{collections::HashSet, sync::LazyLock};

use anyhow::{Context as _, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    primitives::{AccountId, BlockHash, BlockReference, Level},
    string_or_native,
};

/// A contract snapshot, tagged with the block it was observed in.
/// `script` and `storage` hold Michelson, as JSON when freshly decoded
/// and as text once the transformer has run.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Account {
    pub manager: AccountId,
    #[serde(with = "string_or_native")]
    pub balance: u64,
    pub spendable: bool,
    pub delegate_setable: bool,
    pub delegate_value: Option<AccountId>,
    #[serde(with = "string_or_native")]
    pub counter: u64,
    pub script: Option<Value>,
    pub storage: Option<Value>,
    pub block_id: BlockHash,
    pub block_level: Level,
}

impl Account {
    pub fn from_json(json: &str, observed_in: &BlockReference) -> Result<Self> {
        let raw = serde_json::from_str::<RawAccount>(json)
            .context("failed to decode contract document")?;

        let (script, storage) = match raw.script {
            Some(script) => (Some(script.code), Some(script.storage)),
            None => (None, None),
        };

        let (delegate_setable, delegate_value) = match raw.delegate {
            Some(delegate) => (delegate.setable, delegate.value),
            None => (false, None),
        };

        Ok(Self {
            manager: raw.manager,
            balance: raw.balance,
            spendable: raw.spendable,
            delegate_setable,
            delegate_value,
            counter: raw.counter,
            script,
            storage,
            block_id: observed_in.hash.clone(),
            block_level: observed_in.level,
        })
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ManagerKey {
    pub manager: AccountId,
    #[serde(default)]
    pub key: Option<String>,
}

impl ManagerKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to decode manager key document")
    }
}

#[derive(Deserialize)]
struct RawAccount {
    manager: AccountId,
    #[serde(with = "string_or_native")]
    balance: u64,
    #[serde(default)]
    spendable: bool,
    #[serde(default)]
    delegate: Option<RawDelegate>,
    #[serde(with = "string_or_native")]
    counter: u64,
    #[serde(default)]
    script: Option<RawScript>,
}

#[derive(Deserialize)]
struct RawDelegate {
    #[serde(default)]
    setable: bool,
    #[serde(default)]
    value: Option<AccountId>,
}

#[derive(Deserialize)]
struct RawScript {
    code: Value,
    storage: Value,
}

static ACCOUNT_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(tz1|tz2|tz3|KT1)[1-9A-HJ-NP-Za-km-z]{33}")
        .expect("account reference pattern is valid")
});

/// Scans an operations document for the account ids it touches.
/// First occurrence wins; order of appearance is preserved.
#[must_use]
pub fn extract_account_references(json: &str) -> Vec<AccountId> {
    let mut seen = HashSet::new();

    ACCOUNT_REFERENCE
        .find_iter(json)
        .map(|reference| reference.as_str())
        .filter(|id| seen.insert(*id))
        .map(AccountId::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn block_reference() -> BlockReference {
        BlockReference {
            hash: BlockHash::from("BKpbfCvh777DQHnXjU2sqHvVUNZ7dBAdqEfKkdw8EGSkD9LSYXb"),
            level: 100_000,
        }
    }

    #[test]
    fn contract_document_decodes_with_delegate_and_script() -> Result<()> {
        let document = json!({
            "manager": "tz1ZbQcFt3rfZF1uoZcXhcDhehVtBuV5Eiuq",
            "balance": "4000000",
            "spendable": true,
            "delegate": { "setable": true, "value": "tz1Yju7jmmsaUiG9qQLoYv35v5pHgnWoLWbt" },
            "counter": "5",
            "script": {
                "code": [{ "prim": "parameter", "args": [{ "prim": "unit" }] }],
                "storage": { "prim": "Unit" }
            }
        });

        let account = Account::from_json(&document.to_string(), &block_reference())?;

        assert_eq!(account.balance, 4_000_000);
        assert!(account.delegate_setable);
        assert_eq!(
            account.delegate_value.as_ref().map(AccountId::as_str),
            Some("tz1Yju7jmmsaUiG9qQLoYv35v5pHgnWoLWbt"),
        );
        assert!(account.script.is_some());
        assert_eq!(account.block_level, 100_000);

        Ok(())
    }

    #[test]
    fn implicit_account_decodes_without_delegate_or_script() -> Result<()> {
        let document = json!({
            "manager": "tz1ZbQcFt3rfZF1uoZcXhcDhehVtBuV5Eiuq",
            "balance": "12",
            "spendable": true,
            "counter": "0"
        });

        let account = Account::from_json(&document.to_string(), &block_reference())?;

        assert!(!account.delegate_setable);
        assert_eq!(account.delegate_value, None);
        assert_eq!(account.script, None);
        assert_eq!(account.storage, None);

        Ok(())
    }

    #[test]
    fn account_references_deduplicate_preserving_order() {
        let document = concat!(
            "{\"source\":\"tz1ZbQcFt3rfZF1uoZcXhcDhehVtBuV5Eiuq\",",
            "\"destination\":\"KT1BUKeJTemAaVBfRz6cqxeUBQGQqMxfG19A\",",
            "\"refund\":\"tz1ZbQcFt3rfZF1uoZcXhcDhehVtBuV5Eiuq\"}",
        );

        let references = extract_account_references(document);

        assert_eq!(
            references,
            vec![
                AccountId::from("tz1ZbQcFt3rfZF1uoZcXhcDhehVtBuV5Eiuq"),
                AccountId::from("KT1BUKeJTemAaVBfRz6cqxeUBQGQqMxfG19A"),
            ],
        );
    }

    #[test]
    fn short_or_malformed_ids_are_not_references() {
        assert_eq!(extract_account_references("{\"note\":\"tz1short\"}"), vec![]);
    }
}
