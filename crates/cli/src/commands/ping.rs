use alloy_primitives::Address;
use clap::Parser;
use eyre::Result;
use tracing::info;

use super::finish;
use crate::{
    clients::SsvApiClient,
    config::{ApiOpts, DkgOpts},
    dkg::DockerDkg,
    pipeline::ping_operators,
};

#[derive(Debug, Parser)]
pub struct PingCommand {
    /// The address of the cluster owner
    owner: Address,

    /// Comma-separated ids of the operators to ping
    #[clap(short = 'o', long, value_delimiter = ',', required = true)]
    operators: Vec<u64>,

    #[clap(flatten)]
    api: ApiOpts,

    #[clap(flatten)]
    dkg: DkgOpts,
}

impl PingCommand {
    pub async fn execute(&self) -> Result<()> {
        info!(owner = %self.owner, operators = ?self.operators, "pinging DKG endpoints");
        let directory = SsvApiClient::new(self.api.ssv_api.clone(), self.api.timeout())?;
        let dkg = DockerDkg::new(&self.dkg);

        let report = ping_operators(&directory, &dkg, &self.operators).await;
        info!(reachable = ?report.reachable, "good operators");
        finish(&report.problems, "operator")
    }
}
