use alloy_primitives::Address;
use clap::Parser;
use eyre::Result;
use tracing::info;

use super::operators::DEFAULT_OPERATOR_SEARCH;
use crate::{
    clients::{new_operators, SsvApiClient},
    config::ApiOpts,
};

#[derive(Debug, Parser)]
pub struct NewOperatorsCommand {
    /// The address of the cluster owner
    owner: Address,

    /// Comma-separated candidate operator ids, defaults to every operator matching --search
    #[clap(short = 'o', long, value_delimiter = ',')]
    operators: Vec<u64>,

    /// Operator name filter used when no candidates are given
    #[clap(long, default_value = DEFAULT_OPERATOR_SEARCH)]
    search: String,

    #[clap(flatten)]
    api: ApiOpts,
}

impl NewOperatorsCommand {
    pub async fn execute(&self) -> Result<()> {
        let client = SsvApiClient::new(self.api.ssv_api.clone(), self.api.timeout())?;

        let candidates = if self.operators.is_empty() {
            let operators = client.search_operators(&self.search).await?;
            operators.into_iter().map(|operator| operator.id).collect()
        } else {
            self.operators.clone()
        };

        let clusters = client.clusters_owned_by(&self.owner.to_string()).await?;
        info!(
            owner = %self.owner,
            clusters = clusters.len(),
            candidates = candidates.len(),
            "fetched owned clusters"
        );

        let fresh = new_operators(&candidates, &clusters);
        info!(count = fresh.len(), "operators without a cluster");
        println!("{}", serde_json::to_string(&fresh)?);
        Ok(())
    }
}
