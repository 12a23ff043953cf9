use std::fmt;

use alloy_primitives::Address;
use clap::ValueEnum;
use eyre::WrapErr;
use ssv_automate_primitives::ClusterRecord;
use tracing::{debug, info};

use crate::{chain::ValidatorContracts, clients::AccountIndex, problems::ProblemLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OffboardAction {
    /// Ask the operators to exit every validator from the beacon chain
    Exit,
    /// Remove every validator from its cluster
    Remove,
    /// Liquidate the clusters
    Liquidate,
}

impl fmt::Display for OffboardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit => f.write_str("exit"),
            Self::Remove => f.write_str("remove"),
            Self::Liquidate => f.write_str("liquidate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffboardReport {
    /// Keyed by cluster id or validator public key.
    pub problems: ProblemLog<String>,
    /// Clusters the action was applied to without any failure.
    pub processed: usize,
}

/// Applies one offboarding action to every cluster owned by an account.
pub struct Offboarding<'a> {
    accounts: &'a dyn AccountIndex,
    contracts: &'a dyn ValidatorContracts,
}

impl<'a> Offboarding<'a> {
    pub fn new(accounts: &'a dyn AccountIndex, contracts: &'a dyn ValidatorContracts) -> Self {
        Self { accounts, contracts }
    }

    pub async fn run(
        &self,
        owner: Address,
        action: OffboardAction,
    ) -> eyre::Result<OffboardReport> {
        let clusters = self.accounts.account_clusters(&owner.to_string()).await?;
        info!(%owner, %action, clusters = clusters.len(), "offboarding clusters");

        let mut problems = ProblemLog::new();
        let mut processed = 0;
        for cluster in &clusters {
            info!(cluster = cluster.id, validators = cluster.validator_count, "processing cluster");
            // a cluster snapshot only stays valid for the first mutation made with it
            if cluster.validator_count > 1 {
                problems.record(
                    cluster.id.clone(),
                    format!(
                        "Cluster {} has {} validators, they can't be offboarded one by one",
                        cluster.id, cluster.validator_count
                    ),
                );
                continue;
            }

            match action {
                OffboardAction::Liquidate => {
                    if let Err(err) = self.liquidate(owner, cluster).await {
                        problems.record(cluster.id.clone(), format!("{err:#}"));
                        continue;
                    }
                }
                OffboardAction::Exit | OffboardAction::Remove => {
                    let mut succeeded = 0;
                    let mut failed = false;
                    for validator in &cluster.validators {
                        if !validator.active {
                            debug!(pubkey = %validator.id, "skipping inactive validator");
                            continue;
                        }
                        match self.offboard_validator(action, cluster, &validator.id).await {
                            Ok(()) => succeeded += 1,
                            Err(err) => {
                                problems.record(validator.id.clone(), format!("{err:#}"));
                                failed = true;
                            }
                        }
                    }
                    if failed || succeeded == 0 {
                        continue;
                    }
                }
            }
            processed += 1;
        }

        Ok(OffboardReport { problems, processed })
    }

    async fn liquidate(&self, owner: Address, cluster: &ClusterRecord) -> eyre::Result<()> {
        if !cluster.active {
            eyre::bail!("Cluster {} is already liquidated", cluster.id);
        }
        info!(cluster = cluster.id, "liquidating cluster");
        self.contracts
            .liquidate(owner, &cluster.operator_ids, cluster.snapshot())
            .await
            .wrap_err_with(|| format!("Error liquidating cluster {}", cluster.id))?;
        Ok(())
    }

    async fn offboard_validator(
        &self,
        action: OffboardAction,
        cluster: &ClusterRecord,
        pubkey: &str,
    ) -> eyre::Result<()> {
        info!(%action, cluster = cluster.id, pubkey, "offboarding validator");
        match action {
            OffboardAction::Exit => {
                self.contracts.exit_validator(pubkey, &cluster.operator_ids).await.wrap_err_with(
                    || format!("Error exiting validator {pubkey} of cluster {}", cluster.id),
                )?;
            }
            OffboardAction::Remove => {
                self.contracts
                    .remove_validator(pubkey, &cluster.operator_ids, cluster.snapshot())
                    .await
                    .wrap_err_with(|| {
                        format!("Error removing validator {pubkey} of cluster {}", cluster.id)
                    })?;
            }
            OffboardAction::Liquidate => {}
        }
        Ok(())
    }
}
