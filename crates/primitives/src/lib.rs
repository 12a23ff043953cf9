mod cluster;
mod deposit;
mod keyshares;
mod operator;

pub use cluster::{cluster_id, ClusterRecord, ClusterSnapshot, ValidatorRecord};
pub use deposit::DepositData;
pub use keyshares::{
    KeyShare, KeysharesError, KeysharesFile, ShareData, ShareOperator, SharePayload,
};
pub use operator::{OperatorInfo, OwnedCluster};

/// Lowercase hex without the `0x` prefix, used when comparing validator public keys coming from
/// different sources (subgraph, deposit files, directory names).
pub fn normalize_pubkey(pubkey: &str) -> String {
    let trimmed = pubkey.trim();
    trimmed.strip_prefix("0x").unwrap_or(trimmed).to_ascii_lowercase()
}
