mod ssv_api;
mod subgraph;

use async_trait::async_trait;
use reqwest::StatusCode;
use ssv_automate_primitives::{ClusterRecord, ClusterSnapshot, OperatorInfo};

pub use ssv_api::{new_operators, SsvApiClient};
pub use subgraph::{
    account_clusters_query, account_nonce_query, cluster_snapshot_query, validators_by_tx_query,
    GraphQlRequest, SubgraphClient,
};

/// Errors that can occur while querying the SSV API or the subgraph.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Failed HTTP request: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Failed to decode: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Request to {url} returned {status}")]
    Status { url: String, status: StatusCode },
    #[error("Subgraph query failed: {0}")]
    GraphQl(String),
    #[error("Subgraph response carried no data")]
    EmptyResponse,
    #[error("Failed to parse or build URL")]
    Url,
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Source of operator metadata.
#[async_trait]
pub trait OperatorDirectory: Send + Sync {
    /// Look up a single operator. `None` when the operator does not exist.
    async fn operator(&self, id: u64) -> eyre::Result<Option<OperatorInfo>>;
}

/// Source of per-owner account state.
#[async_trait]
pub trait AccountIndex: Send + Sync {
    async fn owner_nonce(&self, owner: &str) -> eyre::Result<u64>;

    async fn cluster_snapshot(
        &self,
        owner: &str,
        operator_ids: &[u64],
    ) -> eyre::Result<ClusterSnapshot>;

    async fn account_clusters(&self, owner: &str) -> eyre::Result<Vec<ClusterRecord>>;
}
