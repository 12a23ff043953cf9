use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// Operator metadata as served by the SSV REST API (`/operators/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorInfo {
    pub id: u64,
    pub public_key: String,
    #[serde(default)]
    pub dkg_address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl OperatorInfo {
    /// The DKG endpoint of the operator, if one is configured.
    ///
    /// The API reports operators without an endpoint either with a missing field or an empty
    /// string.
    pub fn dkg_endpoint(&self) -> Option<&str> {
        self.dkg_address.as_deref().map(str::trim).filter(|address| !address.is_empty())
    }
}

/// A cluster entry from the `/clusters/owner/{owner}` listing.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedCluster {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: u64,
    #[serde_as(as = "Vec<PickFirst<(_, DisplayFromStr)>>")]
    pub operators: Vec<u64>,
}
