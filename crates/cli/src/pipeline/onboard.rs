use alloy_primitives::Address;
use eyre::{bail, eyre, WrapErr};
use ssv_automate_primitives::OperatorInfo;
use tracing::{info, warn};

use super::dedup_ids;
use crate::{
    chain::ValidatorContracts,
    clients::{AccountIndex, OperatorDirectory},
    dkg::{CeremonyRequest, DkgRunner},
    files,
    problems::ProblemLog,
};

/// Operators every onboarding ceremony is run with, next to the operator under test.
pub const DEFAULT_CLUSTER_OPERATORS: [u64; 3] = [1, 2, 3];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardReport {
    pub problems: ProblemLog<u64>,
    pub completed: Vec<u64>,
    /// Owner nonce to use for the next registration.
    pub next_nonce: u64,
}

/// Creates, activates and registers one validator per requested operator.
///
/// For each operator a DKG ceremony is run with the cluster operators plus that operator, every
/// resulting deposit is submitted to the deposit contract and the key shares are registered with
/// the SSVNetwork contract.
pub struct Onboarding<'a> {
    directory: &'a dyn OperatorDirectory,
    accounts: &'a dyn AccountIndex,
    dkg: &'a dyn DkgRunner,
    contracts: &'a dyn ValidatorContracts,
    cluster_operators: Vec<u64>,
    validators: u32,
}

impl<'a> Onboarding<'a> {
    pub fn new(
        directory: &'a dyn OperatorDirectory,
        accounts: &'a dyn AccountIndex,
        dkg: &'a dyn DkgRunner,
        contracts: &'a dyn ValidatorContracts,
    ) -> Self {
        Self {
            directory,
            accounts,
            dkg,
            contracts,
            cluster_operators: DEFAULT_CLUSTER_OPERATORS.to_vec(),
            validators: 1,
        }
    }

    pub fn with_cluster_operators(mut self, operator_ids: Vec<u64>) -> Self {
        self.cluster_operators = dedup_ids(&operator_ids);
        self
    }

    pub fn with_validators(mut self, validators: u32) -> Self {
        self.validators = validators.max(1);
        self
    }

    /// Info of the cluster operators. Every one of them needs a DKG endpoint.
    async fn resolve_cluster_operators(&self) -> eyre::Result<Vec<OperatorInfo>> {
        let mut operators = Vec::with_capacity(self.cluster_operators.len());
        for &id in &self.cluster_operators {
            let operator = self
                .directory
                .operator(id)
                .await?
                .ok_or_else(|| eyre!("Cluster operator {id} does not exist"))?;
            if operator.dkg_endpoint().is_none() {
                bail!("Cluster operator {id} does not have a DKG endpoint set");
            }
            operators.push(operator);
        }
        let endpoints: Vec<&str> =
            operators.iter().filter_map(OperatorInfo::dkg_endpoint).collect();
        info!(?endpoints, "resolved cluster operators");
        Ok(operators)
    }

    pub async fn run(&self, owner: Address, operator_ids: &[u64]) -> eyre::Result<OnboardReport> {
        let cluster = self.resolve_cluster_operators().await?;

        let owner_key = owner.to_string();
        let mut nonce = self.accounts.owner_nonce(&owner_key).await?;
        info!(%owner, nonce, "fetched owner nonce");

        let mut problems = ProblemLog::new();
        let mut completed = Vec::new();
        for id in dedup_ids(operator_ids) {
            if self.cluster_operators.contains(&id) {
                problems.record(id, format!("Operator {id} is already a cluster operator"));
                continue;
            }
            match self.onboard_operator(owner, &cluster, id, nonce).await {
                Ok(registered) => {
                    nonce += registered;
                    completed.push(id);
                    info!(operator = id, next_nonce = nonce, "operator onboarded");
                }
                Err(err) => problems.record(id, format!("{err:#}")),
            }
        }

        if !problems.is_empty() {
            warn!(count = problems.len(), "onboarding finished with problems");
        }
        Ok(OnboardReport { problems, completed, next_nonce: nonce })
    }

    /// Returns the number of validators registered, which is how far the owner nonce advances.
    async fn onboard_operator(
        &self,
        owner: Address,
        cluster: &[OperatorInfo],
        id: u64,
        nonce: u64,
    ) -> eyre::Result<u64> {
        let operator = self
            .directory
            .operator(id)
            .await?
            .ok_or_else(|| eyre!("Operator {id} does not exist"))?;
        if operator.dkg_endpoint().is_none() {
            bail!("Operator {id} does not have a DKG endpoint set");
        }

        let mut operators = cluster.to_vec();
        operators.push(operator);
        operators.sort_by_key(|operator| operator.id);

        info!(operator = id, nonce, "launching DKG ceremony");
        let request = CeremonyRequest {
            owner: owner.to_string(),
            nonce,
            withdraw_address: owner.to_string(),
            operators,
            validators: self.validators,
        };
        let outputs = self
            .dkg
            .run_ceremony(&request)
            .await
            .wrap_err_with(|| format!("DKG ceremony failed for operator {id}"))?;

        let deposits = files::read_deposit_file(&outputs.deposit)?;
        let keyshares = files::read_keyshares_file(&outputs.keyshares)?;

        for deposit in &deposits {
            let tx_hash = self
                .contracts
                .deposit(deposit)
                .await
                .wrap_err_with(|| format!("Could not activate validator {}", deposit.pubkey))?;
            info!(pubkey = %deposit.pubkey, %tx_hash, "validator activated");
        }

        let operator_ids = keyshares.operator_ids()?;
        let snapshot = self.accounts.cluster_snapshot(&owner.to_string(), &operator_ids).await?;
        let tx_hash = self
            .contracts
            .bulk_register(&keyshares, snapshot)
            .await
            .wrap_err_with(|| format!("Could not register validators for operator {id}"))?;
        info!(operator = id, ?operator_ids, %tx_hash, "validators registered");

        Ok(keyshares.shares.len() as u64)
    }
}
