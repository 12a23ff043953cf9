use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// The cluster state the SSVNetwork contract expects alongside every cluster mutation.
///
/// The subgraph serializes BigInt fields as decimal strings, so every numeric field accepts
/// either a JSON number or a string.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub validator_count: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub network_fee_index: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub index: u64,
    pub active: bool,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub balance: u128,
}

impl Default for ClusterSnapshot {
    /// A cluster that has never been created on chain.
    fn default() -> Self {
        Self { validator_count: 0, network_fee_index: 0, index: 0, active: true, balance: 0 }
    }
}

/// A validator entry of a subgraph cluster. The id is the validator public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub id: String,
    pub active: bool,
}

/// A cluster as indexed by the subgraph under `account.clusters`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    pub id: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub validator_count: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub network_fee_index: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub index: u64,
    pub active: bool,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub balance: u128,
    #[serde_as(as = "Vec<PickFirst<(_, DisplayFromStr)>>")]
    pub operator_ids: Vec<u64>,
    #[serde(default)]
    pub validators: Vec<ValidatorRecord>,
}

impl ClusterRecord {
    pub fn snapshot(&self) -> ClusterSnapshot {
        ClusterSnapshot {
            validator_count: self.validator_count,
            network_fee_index: self.network_fee_index,
            index: self.index,
            active: self.active,
            balance: self.balance,
        }
    }
}

/// The subgraph id of a cluster: `<owner lowercase>-<op1>-<op2>-...`.
pub fn cluster_id(owner: &str, operator_ids: &[u64]) -> String {
    let mut id = owner.to_lowercase();
    for operator_id in operator_ids {
        id.push('-');
        id.push_str(&operator_id.to_string());
    }
    id
}
