use alloy_primitives::Address;
use clap::Parser;
use eyre::Result;
use tracing::info;

use super::finish;
use crate::{
    chain::{self, DEFAULT_SSV_AMOUNT},
    clients::SubgraphClient,
    config::{ChainOpts, SubgraphOpts},
    pipeline::{OffboardAction, Offboarding},
};

#[derive(Debug, Parser)]
pub struct OffboardCommand {
    /// The address of the cluster owner
    owner: Address,

    /// The action to perform on every cluster of the owner
    #[clap(value_enum)]
    action: OffboardAction,

    #[clap(flatten)]
    subgraph: SubgraphOpts,

    #[clap(flatten)]
    chain: ChainOpts,
}

impl OffboardCommand {
    pub async fn execute(&self) -> Result<()> {
        let accounts =
            SubgraphClient::new(self.subgraph.subgraph_api.clone(), self.subgraph.timeout())?;
        let contracts = chain::connect(&self.chain, DEFAULT_SSV_AMOUNT)?;

        let report = Offboarding::new(&accounts, &contracts).run(self.owner, self.action).await?;
        info!(action = %self.action, clusters = report.processed, "offboarding finished");
        finish(&report.problems, "cluster/validator")
    }
}
