use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of a `deposit_data.json` file, as produced by the staking deposit cli and by
/// ssv-dkg. Fields this tool does not interpret are carried through untouched so merged files
/// stay byte-compatible with the launchpad format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositData {
    pub pubkey: String,
    pub withdrawal_credentials: String,
    /// Deposit amount in gwei.
    pub amount: u64,
    pub signature: String,
    pub deposit_data_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_message_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
