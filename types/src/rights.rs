use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::primitives::{AccountId, Level};

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BakingRights {
    pub level: Level,
    pub delegate: AccountId,
    pub priority: i32,
    #[serde(default)]
    pub estimated_time: Option<DateTime<Utc>>,
}

impl BakingRights {
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        serde_json::from_str(json).context("failed to decode baking rights document")
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct EndorsingRights {
    pub level: Level,
    pub delegate: AccountId,
    pub slots: Vec<i32>,
    #[serde(default)]
    pub estimated_time: Option<DateTime<Utc>>,
}

impl EndorsingRights {
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        serde_json::from_str(json).context("failed to decode endorsing rights document")
    }
}
