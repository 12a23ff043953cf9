use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use ssv_automate_primitives::{cluster_id, ClusterRecord, ClusterSnapshot};
use tracing::debug;

use super::{AccountIndex, ApiError, ApiResult};

/// Entities requested per page. The Graph returns 100 when `first` is omitted.
pub const PAGE_SIZE: usize = 1000;

const ACCOUNT_NONCE_QUERY: &str = r#"
query accountNonce($owner: String!) {
    account(id: $owner) {
        nonce
    }
}"#;

const CLUSTER_SNAPSHOT_QUERY: &str = r#"
query clusterSnapshot($cluster: String!) {
    cluster(id: $cluster) {
        validatorCount
        networkFeeIndex
        index
        active
        balance
    }
}"#;

const ACCOUNT_CLUSTERS_QUERY: &str = r#"
query accountClusters($owner: String!, $first: Int!, $skip: Int!) {
    account(id: $owner) {
        clusters(first: $first, skip: $skip, orderBy: id) {
            id
            validatorCount
            networkFeeIndex
            index
            active
            balance
            operatorIds
            validators(first: $first) {
                id
                active
            }
        }
    }
}"#;

const VALIDATORS_BY_TX_QUERY: &str = r#"
query validators($txhashes: [Bytes!], $first: Int!, $skip: Int!) {
    validatorAddeds(
        first: $first
        skip: $skip
        orderBy: id
        where: {transactionHash_in: $txhashes}
    ) {
        publicKey
    }
}"#;

/// The JSON body of a GraphQL POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    pub query: &'static str,
    pub variables: Value,
}

pub fn account_nonce_query(owner: &str) -> GraphQlRequest {
    GraphQlRequest {
        query: ACCOUNT_NONCE_QUERY,
        variables: json!({ "owner": owner.to_lowercase() }),
    }
}

pub fn cluster_snapshot_query(owner: &str, operator_ids: &[u64]) -> GraphQlRequest {
    GraphQlRequest {
        query: CLUSTER_SNAPSHOT_QUERY,
        variables: json!({ "cluster": cluster_id(owner, operator_ids) }),
    }
}

/// One page of the owner's clusters, starting after the first `skip` ones.
pub fn account_clusters_query(owner: &str, skip: usize) -> GraphQlRequest {
    GraphQlRequest {
        query: ACCOUNT_CLUSTERS_QUERY,
        variables: json!({ "owner": owner.to_lowercase(), "first": PAGE_SIZE, "skip": skip }),
    }
}

/// Query for the `ValidatorAdded` events emitted by the given transactions. The hashes are
/// passed through exactly as given.
pub fn validators_by_tx_query(tx_hashes: &[String], skip: usize) -> GraphQlRequest {
    GraphQlRequest {
        query: VALIDATORS_BY_TX_QUERY,
        variables: json!({ "txhashes": tx_hashes, "first": PAGE_SIZE, "skip": skip }),
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AccountData<T> {
    account: Option<T>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct AccountNonce {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    nonce: u64,
}

#[derive(Debug, Deserialize)]
struct AccountClusters {
    clusters: Vec<ClusterRecord>,
}

#[derive(Debug, Deserialize)]
struct ClusterData {
    cluster: Option<ClusterSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidatorAddedData {
    validator_addeds: Vec<ValidatorAdded>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidatorAdded {
    public_key: String,
}

/// Client for the SSV network subgraph.
#[derive(Clone)]
pub struct SubgraphClient {
    endpoint: Url,
    inner: Client,
}

impl SubgraphClient {
    pub fn new(endpoint: Url, timeout: Duration) -> ApiResult<Self> {
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, inner })
    }

    pub async fn query<T: DeserializeOwned>(&self, request: &GraphQlRequest) -> ApiResult<T> {
        let response = self.inner.post(self.endpoint.clone()).json(request).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                url: self.endpoint.to_string(),
                status: response.status(),
            });
        }

        let body: GraphQlResponse<T> = response.json().await?;
        if !body.errors.is_empty() {
            let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(ApiError::GraphQl(messages.join("; ")));
        }
        body.data.ok_or(ApiError::EmptyResponse)
    }

    /// The owner's registration nonce. Accounts the subgraph has never seen start at 0.
    pub async fn get_owner_nonce(&self, owner: &str) -> ApiResult<u64> {
        let data: AccountData<AccountNonce> = self.query(&account_nonce_query(owner)).await?;
        let nonce = data.account.map(|account| account.nonce).unwrap_or_default();
        debug!(owner, nonce, "fetched owner nonce");
        Ok(nonce)
    }

    /// The on-chain state of the cluster `owner` forms with `operator_ids`. Clusters that do not
    /// exist yet are reported as the empty active cluster.
    pub async fn get_cluster_snapshot(
        &self,
        owner: &str,
        operator_ids: &[u64],
    ) -> ApiResult<ClusterSnapshot> {
        let data: ClusterData = self.query(&cluster_snapshot_query(owner, operator_ids)).await?;
        let snapshot = data.cluster.unwrap_or_default();
        debug!(owner, ?operator_ids, ?snapshot, "fetched cluster snapshot");
        Ok(snapshot)
    }

    /// Every cluster of the owner, fetched page by page until a short page comes back.
    pub async fn get_account_clusters(&self, owner: &str) -> ApiResult<Vec<ClusterRecord>> {
        let mut clusters = Vec::new();
        loop {
            let data: AccountData<AccountClusters> =
                self.query(&account_clusters_query(owner, clusters.len())).await?;
            let page = data.account.map(|account| account.clusters).unwrap_or_default();
            let last = page.len() < PAGE_SIZE;
            clusters.extend(page);
            if last {
                break;
            }
        }
        debug!(owner, clusters = clusters.len(), "fetched account clusters");
        Ok(clusters)
    }

    /// Public keys of validators registered by the given transactions.
    pub async fn validator_pubkeys(&self, tx_hashes: &[String]) -> ApiResult<Vec<String>> {
        let mut pubkeys = Vec::new();
        loop {
            let data: ValidatorAddedData =
                self.query(&validators_by_tx_query(tx_hashes, pubkeys.len())).await?;
            let last = data.validator_addeds.len() < PAGE_SIZE;
            pubkeys.extend(data.validator_addeds.into_iter().map(|added| added.public_key));
            if last {
                break;
            }
        }
        debug!(txs = tx_hashes.len(), validators = pubkeys.len(), "fetched validator keys");
        Ok(pubkeys)
    }
}

impl Debug for SubgraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubgraphClient").field("endpoint", &self.endpoint).finish()
    }
}

#[async_trait]
impl AccountIndex for SubgraphClient {
    async fn owner_nonce(&self, owner: &str) -> eyre::Result<u64> {
        Ok(self.get_owner_nonce(owner).await?)
    }

    async fn cluster_snapshot(
        &self,
        owner: &str,
        operator_ids: &[u64],
    ) -> eyre::Result<ClusterSnapshot> {
        Ok(self.get_cluster_snapshot(owner, operator_ids).await?)
    }

    async fn account_clusters(&self, owner: &str) -> eyre::Result<Vec<ClusterRecord>> {
        Ok(self.get_account_clusters(owner).await?)
    }
}
