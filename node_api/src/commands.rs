//! Command paths understood by the node, relative to `chains/main/`.
//! Historical blocks are addressed by offset from a known hash
//! (`blocks/H~k`); an absent offset serializes as the empty string, so
//! `blocks/H~` is a valid reference to `H` itself.

use types::{AccountId, BlockHash, Level, Offset};

#[must_use]
pub fn block(reference: &BlockHash) -> String {
    format!("blocks/{reference}")
}

#[must_use]
pub fn block_at_offset(reference: &BlockHash, offset: Offset) -> String {
    format!("blocks/{reference}~{offset}")
}

#[must_use]
pub fn operations(reference: &BlockHash) -> String {
    format!("blocks/{reference}/operations")
}

#[must_use]
pub fn contracts(reference: &BlockHash) -> String {
    format!("blocks/{reference}/context/contracts")
}

#[must_use]
pub fn contract(reference: &BlockHash, id: &AccountId) -> String {
    format!("blocks/{reference}/context/contracts/{id}")
}

#[must_use]
pub fn manager_key(reference: &BlockHash, id: &AccountId) -> String {
    format!("blocks/{reference}/context/contracts/{id}/manager_key")
}

#[must_use]
pub fn current_quorum(reference: &BlockHash, offset: Option<Offset>) -> String {
    format!(
        "blocks/{reference}~{}/votes/current_quorum",
        offset_fragment(offset),
    )
}

#[must_use]
pub fn current_proposal(reference: &BlockHash, offset: Option<Offset>) -> String {
    format!(
        "blocks/{reference}~{}/votes/current_proposal",
        offset_fragment(offset),
    )
}

#[must_use]
pub fn voting_listings(reference: &BlockHash) -> String {
    format!("blocks/{reference}/votes/listings")
}

#[must_use]
pub fn voting_proposals(reference: &BlockHash) -> String {
    format!("blocks/{reference}/votes/proposals")
}

#[must_use]
pub fn voting_ballots(reference: &BlockHash) -> String {
    format!("blocks/{reference}/votes/ballots")
}

#[must_use]
pub fn voting_ballot_list(reference: &BlockHash) -> String {
    format!("blocks/{reference}/votes/ballot_list")
}

#[must_use]
pub fn baking_rights(reference: &BlockHash, level: Level) -> String {
    format!("blocks/{reference}/helpers/baking_rights?level={level}")
}

#[must_use]
pub fn endorsing_rights(reference: &BlockHash, level: Level) -> String {
    format!("blocks/{reference}/helpers/endorsing_rights?level={level}")
}

fn offset_fragment(offset: Option<Offset>) -> String {
    offset.map(|offset| offset.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn head_addresses_the_chain_tip() {
        assert_eq!(block(&BlockHash::head()), "blocks/head");
    }

    #[test_case(Some(12), "blocks/head~12/votes/current_quorum"; "explicit offset")]
    #[test_case(None, "blocks/head~/votes/current_quorum"; "absent offset serializes empty")]
    fn quorum_offset_serialization(offset: Option<Offset>, expected: &str) {
        assert_eq!(current_quorum(&BlockHash::head(), offset), expected);
    }

    #[test]
    fn ancestor_addressing_uses_tilde() {
        let reference = BlockHash::from("BKpbfCvh777DQHnXjU2sqHvVUNZ7dBAdqEfKkdw8EGSkD9LSYXb");

        assert_eq!(
            block_at_offset(&reference, 5),
            "blocks/BKpbfCvh777DQHnXjU2sqHvVUNZ7dBAdqEfKkdw8EGSkD9LSYXb~5",
        );
    }

    #[test]
    fn contract_paths_nest_under_context() {
        let reference = BlockHash::head();
        let id = AccountId::from("tz1ZbQcFt3rfZF1uoZcXhcDhehVtBuV5Eiuq");

        assert_eq!(
            manager_key(&reference, &id),
            "blocks/head/context/contracts/tz1ZbQcFt3rfZF1uoZcXhcDhehVtBuV5Eiuq/manager_key",
        );
    }
}
