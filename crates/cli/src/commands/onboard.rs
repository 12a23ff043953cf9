use alloy_primitives::{Address, U256};
use clap::Parser;
use eyre::Result;
use tracing::info;

use super::finish;
use crate::{
    chain::{self, DEFAULT_SSV_AMOUNT},
    clients::{SsvApiClient, SubgraphClient},
    config::{ApiOpts, ChainOpts, DkgOpts},
    dkg::DockerDkg,
    pipeline::{Onboarding, DEFAULT_CLUSTER_OPERATORS},
};

#[derive(Debug, Parser)]
pub struct OnboardCommand {
    /// The address of the cluster owner, also used as withdrawal address
    owner: Address,

    /// Comma-separated ids of the operators to create a validator with
    #[clap(short = 'o', long, value_delimiter = ',', required = true)]
    operators: Vec<u64>,

    /// Operators joining every ceremony next to the operator under test
    #[clap(long, value_delimiter = ',', default_values_t = DEFAULT_CLUSTER_OPERATORS)]
    cluster_operators: Vec<u64>,

    /// SSV tokens (in wei) deposited into the cluster with every registration
    #[clap(long, env = "SSV_AMOUNT", default_value_t = DEFAULT_SSV_AMOUNT)]
    ssv_amount: U256,

    #[clap(flatten)]
    api: ApiOpts,

    #[clap(flatten)]
    chain: ChainOpts,

    #[clap(flatten)]
    dkg: DkgOpts,
}

impl OnboardCommand {
    pub async fn execute(&self) -> Result<()> {
        let directory = SsvApiClient::new(self.api.ssv_api.clone(), self.api.timeout())?;
        let accounts =
            SubgraphClient::new(self.api.subgraph.subgraph_api.clone(), self.api.timeout())?;
        let dkg = DockerDkg::new(&self.dkg);
        let contracts = chain::connect(&self.chain, self.ssv_amount)?;

        let report = Onboarding::new(&directory, &accounts, &dkg, &contracts)
            .with_cluster_operators(self.cluster_operators.clone())
            .with_validators(self.dkg.validators)
            .run(self.owner, &self.operators)
            .await?;

        info!(completed = ?report.completed, next_nonce = report.next_nonce, "onboarding finished");
        finish(&report.problems, "operator")
    }
}
