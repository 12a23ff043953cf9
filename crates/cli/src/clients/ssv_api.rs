use std::{
    collections::{BTreeMap, HashSet},
    fmt::Debug,
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use ssv_automate_primitives::{OperatorInfo, OwnedCluster};
use tracing::debug;

use super::{ApiError, ApiResult, OperatorDirectory};

pub const PER_PAGE: u32 = 100;
/// Upper bound on followed pages in case the API keeps reporting more pages.
const MAX_PAGES: u32 = 50;

#[derive(Debug, Deserialize)]
struct Pagination {
    pages: u32,
}

trait Page: DeserializeOwned {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<Pagination>);
}

#[derive(Debug, Deserialize)]
struct OperatorsPage {
    operators: Vec<OperatorInfo>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

impl Page for OperatorsPage {
    type Item = OperatorInfo;

    fn into_parts(self) -> (Vec<OperatorInfo>, Option<Pagination>) {
        (self.operators, self.pagination)
    }
}

#[derive(Debug, Deserialize)]
struct ClustersPage {
    clusters: Vec<OwnedCluster>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

impl Page for ClustersPage {
    type Item = OwnedCluster;

    fn into_parts(self) -> (Vec<OwnedCluster>, Option<Pagination>) {
        (self.clusters, self.pagination)
    }
}

/// Client for the SSV REST API (`{SSV_API}/operators`, `{SSV_API}/clusters`).
#[derive(Clone)]
pub struct SsvApiClient {
    endpoint: Url,
    inner: Client,
}

impl SsvApiClient {
    pub fn new(endpoint: Url, timeout: Duration) -> ApiResult<Self> {
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, inner })
    }

    /// Append path segments to the API base, keeping the base path (`/api/v4/holesky`) intact.
    fn url(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut().map_err(|_| ApiError::Url)?.pop_if_empty().extend(segments);
        Ok(url)
    }

    /// Fetch one operator by id. Unknown operators yield `None`.
    pub async fn get_operator(&self, id: u64) -> ApiResult<Option<OperatorInfo>> {
        let url = self.url(&["operators", &id.to_string()])?;
        let response = self.inner.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ApiError::Status { url: url.to_string(), status: response.status() });
        }
        let operator: OperatorInfo = response.json().await?;
        debug!(id, dkg_address = ?operator.dkg_address, "fetched operator");
        Ok(Some(operator))
    }

    /// All operators whose name matches `term`, one entry per operator id, ordered by id.
    pub async fn search_operators(&self, term: &str) -> ApiResult<Vec<OperatorInfo>> {
        let url = self.url(&["operators"])?;
        let operators = self
            .fetch_all_pages::<OperatorsPage>(url, &[("ordering", "id:asc"), ("search", term)])
            .await?;

        let mut by_id = BTreeMap::new();
        for operator in operators {
            by_id.entry(operator.id).or_insert(operator);
        }
        Ok(by_id.into_values().collect())
    }

    /// All clusters owned by `owner`, one entry per cluster id.
    pub async fn clusters_owned_by(&self, owner: &str) -> ApiResult<Vec<OwnedCluster>> {
        let url = self.url(&["clusters", "owner", owner])?;
        let clusters =
            self.fetch_all_pages::<ClustersPage>(url, &[("ordering", "id:asc")]).await?;

        let mut seen = HashSet::new();
        Ok(clusters.into_iter().filter(|cluster| seen.insert(cluster.id)).collect())
    }

    async fn fetch_all_pages<P: Page>(
        &self,
        url: Url,
        params: &[(&str, &str)],
    ) -> ApiResult<Vec<P::Item>> {
        let per_page = PER_PAGE.to_string();
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let page_number = page.to_string();
            let response = self
                .inner
                .get(url.clone())
                .query(&[("page", page_number.as_str()), ("perPage", per_page.as_str())])
                .query(params)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(ApiError::Status { url: url.to_string(), status: response.status() });
            }

            let (batch, pagination) = response.json::<P>().await?.into_parts();
            let batch_len = batch.len();
            items.extend(batch);

            let last_page = match pagination {
                Some(pagination) => page >= pagination.pages,
                None => batch_len < PER_PAGE as usize,
            };
            if last_page || batch_len == 0 || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        debug!(url = %url, pages = page, items = items.len(), "fetched paginated listing");
        Ok(items)
    }
}

impl Debug for SsvApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsvApiClient").field("endpoint", &self.endpoint).finish()
    }
}

#[async_trait]
impl OperatorDirectory for SsvApiClient {
    async fn operator(&self, id: u64) -> eyre::Result<Option<OperatorInfo>> {
        Ok(self.get_operator(id).await?)
    }
}

/// Candidate operators that are not part of any cluster in `clusters`.
///
/// The result keeps the candidate order and is always a subset of `candidates`.
pub fn new_operators(candidates: &[u64], clusters: &[OwnedCluster]) -> Vec<u64> {
    let clustered: HashSet<u64> =
        clusters.iter().flat_map(|cluster| cluster.operators.iter().copied()).collect();
    debug!(?clustered, "operators in owned clusters");

    let mut seen = HashSet::new();
    candidates.iter().copied().filter(|id| !clustered.contains(id) && seen.insert(*id)).collect()
}
