use std::{collections::HashSet, path::PathBuf};

use clap::Parser;
use eyre::{bail, Result};
use ssv_automate_primitives::normalize_pubkey;
use time::OffsetDateTime;
use tracing::info;

use crate::{clients::SubgraphClient, config::SubgraphOpts, files};

#[derive(Debug, Parser)]
pub struct MergeDepositCommand {
    /// Folder holding the per-validator ceremony output directories
    folder: PathBuf,

    /// Comma-separated registration transaction hashes; only their validators are merged
    #[clap(short = 't', long, value_delimiter = ',')]
    txhashes: Vec<String>,

    /// Output file, defaults to deposit_data-<timestamp>.json
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,

    #[clap(flatten)]
    subgraph: SubgraphOpts,
}

impl MergeDepositCommand {
    pub async fn execute(&self) -> Result<()> {
        let filter = if self.txhashes.is_empty() {
            None
        } else {
            let client =
                SubgraphClient::new(self.subgraph.subgraph_api.clone(), self.subgraph.timeout())?;
            let pubkeys = client.validator_pubkeys(&self.txhashes).await?;
            info!(txs = self.txhashes.len(), validators = pubkeys.len(), "resolved validators");
            if pubkeys.is_empty() {
                bail!("No validators were registered by the given transactions");
            }
            Some(pubkeys.iter().map(|pubkey| normalize_pubkey(pubkey)).collect::<HashSet<_>>())
        };

        let pairs = files::find_validator_pairs(&self.folder)?;
        info!(folder = %self.folder.display(), pairs = pairs.len(), "paired validator files");

        let deposits = files::merge_deposits(&pairs, filter.as_ref())?;
        let output = match &self.output {
            Some(output) => output.clone(),
            None => files::default_merge_output(OffsetDateTime::now_utc())?,
        };
        files::write_json(&output, &deposits)?;
        info!(output = %output.display(), deposits = deposits.len(), "merged deposit data");
        Ok(())
    }
}
