use std::collections::HashSet;

use alloy_primitives::Address;
use clap::Parser;
use eyre::Result;
use serde::Serialize;
use tracing::info;

use crate::{clients::SsvApiClient, config::ApiOpts};

pub const DEFAULT_OPERATOR_SEARCH: &str = "Lido -";

#[derive(Debug, Serialize)]
struct OperatorListing<'a> {
    id: u64,
    name: Option<&'a str>,
    dkg_address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_cluster: Option<bool>,
}

#[derive(Debug, Parser)]
pub struct OperatorsCommand {
    /// Mark the operators that already share a cluster with this owner
    owner: Option<Address>,

    /// Operator name filter
    #[clap(long, default_value = DEFAULT_OPERATOR_SEARCH)]
    search: String,

    #[clap(flatten)]
    api: ApiOpts,
}

impl OperatorsCommand {
    pub async fn execute(&self) -> Result<()> {
        let client = SsvApiClient::new(self.api.ssv_api.clone(), self.api.timeout())?;
        let operators = client.search_operators(&self.search).await?;
        info!(search = self.search, count = operators.len(), "found operators");

        let clustered: Option<HashSet<u64>> = match self.owner {
            Some(owner) => {
                let clusters = client.clusters_owned_by(&owner.to_string()).await?;
                info!(%owner, clusters = clusters.len(), "fetched owned clusters");
                Some(clusters.into_iter().flat_map(|cluster| cluster.operators).collect())
            }
            None => None,
        };

        let listing: Vec<OperatorListing<'_>> = operators
            .iter()
            .map(|operator| OperatorListing {
                id: operator.id,
                name: operator.name.as_deref(),
                dkg_address: operator.dkg_endpoint(),
                in_cluster: clustered.as_ref().map(|ids| ids.contains(&operator.id)),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        Ok(())
    }
}
