use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeysharesError {
    #[error("keyshares file contains no shares")]
    Empty,
    #[error("shares target different operator sets: {first:?} and {other:?}")]
    MixedOperatorSets { first: Vec<u64>, other: Vec<u64> },
}

/// A `keyshares.json` file written by an ssv-dkg ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysharesFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub shares: Vec<KeyShare>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShare {
    pub data: ShareData,
    pub payload: SharePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareData {
    pub owner_nonce: u64,
    pub owner_address: String,
    pub public_key: String,
    #[serde(default)]
    pub operators: Vec<ShareOperator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareOperator {
    pub id: u64,
    pub operator_key: String,
}

/// The arguments of the `registerValidator` contract call for one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePayload {
    pub public_key: String,
    pub operator_ids: Vec<u64>,
    pub shares_data: String,
}

impl KeysharesFile {
    /// The operator set every share targets.
    ///
    /// A bulk registration can only address one cluster, so shares for different operator sets
    /// are rejected.
    pub fn operator_ids(&self) -> Result<Vec<u64>, KeysharesError> {
        let (first, rest) = self.shares.split_first().ok_or(KeysharesError::Empty)?;
        for share in rest {
            if share.payload.operator_ids != first.payload.operator_ids {
                return Err(KeysharesError::MixedOperatorSets {
                    first: first.payload.operator_ids.clone(),
                    other: share.payload.operator_ids.clone(),
                });
            }
        }
        Ok(first.payload.operator_ids.clone())
    }

    /// The lowest owner nonce used by the shares in this file.
    pub fn min_owner_nonce(&self) -> Option<u64> {
        self.shares.iter().map(|share| share.data.owner_nonce).min()
    }

    pub fn public_keys(&self) -> Vec<&str> {
        self.shares.iter().map(|share| share.payload.public_key.as_str()).collect()
    }
}
