use std::{
    collections::{HashMap, HashSet},
    fs,
    sync::Mutex,
};

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use eyre::eyre;
use serde_json::json;
use ssv_automate_primitives::{
    cluster_id, ClusterRecord, ClusterSnapshot, DepositData, KeysharesFile, OperatorInfo,
    ValidatorRecord,
};
use tempfile::TempDir;

use crate::{
    chain::ValidatorContracts,
    clients::{AccountIndex, OperatorDirectory},
    dkg::{CeremonyRequest, DkgRunner},
    files::CeremonyOutputs,
};

pub(crate) fn owner() -> Address {
    "0xaA184b86B4cdb747F4A3BF6e6FCd5e27c1d92c5c".parse().unwrap()
}

pub(crate) fn endpoint(id: u64) -> String {
    format!("https://10.0.0.{id}:3030")
}

pub(crate) fn cluster_record(
    operator_ids: &[u64],
    pubkeys: &[&str],
    active: bool,
) -> ClusterRecord {
    ClusterRecord {
        id: cluster_id(&owner().to_string(), operator_ids),
        validator_count: pubkeys.len() as u32,
        network_fee_index: 0,
        index: 0,
        active,
        balance: 1_000_000_000_000_000_000,
        operator_ids: operator_ids.to_vec(),
        validators: pubkeys
            .iter()
            .map(|pubkey| ValidatorRecord { id: pubkey.to_string(), active: true })
            .collect(),
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockDirectory {
    operators: HashMap<u64, OperatorInfo>,
}

impl MockDirectory {
    pub(crate) fn with_operators(ids: &[u64]) -> Self {
        let operators = ids
            .iter()
            .map(|&id| {
                let operator = OperatorInfo {
                    id,
                    public_key: format!("LS0t{id}"),
                    dkg_address: Some(endpoint(id)),
                    name: Some(format!("Lido - Operator {id}")),
                };
                (id, operator)
            })
            .collect();
        Self { operators }
    }

    pub(crate) fn insert_without_endpoint(&mut self, id: u64) {
        let operator =
            OperatorInfo { id, public_key: format!("LS0t{id}"), dkg_address: None, name: None };
        self.operators.insert(id, operator);
    }
}

#[async_trait]
impl OperatorDirectory for MockDirectory {
    async fn operator(&self, id: u64) -> eyre::Result<Option<OperatorInfo>> {
        Ok(self.operators.get(&id).cloned())
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockAccounts {
    nonce: u64,
    clusters: Vec<ClusterRecord>,
}

impl MockAccounts {
    pub(crate) fn with_nonce(nonce: u64) -> Self {
        Self { nonce, clusters: Vec::new() }
    }

    pub(crate) fn with_clusters(clusters: Vec<ClusterRecord>) -> Self {
        Self { nonce: 0, clusters }
    }
}

#[async_trait]
impl AccountIndex for MockAccounts {
    async fn owner_nonce(&self, _owner: &str) -> eyre::Result<u64> {
        Ok(self.nonce)
    }

    async fn cluster_snapshot(
        &self,
        owner: &str,
        operator_ids: &[u64],
    ) -> eyre::Result<ClusterSnapshot> {
        let id = cluster_id(owner, operator_ids);
        Ok(self
            .clusters
            .iter()
            .find(|cluster| cluster.id == id)
            .map(ClusterRecord::snapshot)
            .unwrap_or_default())
    }

    async fn account_clusters(&self, _owner: &str) -> eyre::Result<Vec<ClusterRecord>> {
        Ok(self.clusters.clone())
    }
}

/// Writes ceremony outputs into a temporary folder instead of running a container.
#[derive(Debug)]
pub(crate) struct MockDkg {
    dir: TempDir,
    failing: HashSet<u64>,
    requests: Mutex<Vec<CeremonyRequest>>,
    pinged: Mutex<Vec<String>>,
}

impl MockDkg {
    pub(crate) fn new() -> eyre::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
            failing: HashSet::new(),
            requests: Mutex::new(Vec::new()),
            pinged: Mutex::new(Vec::new()),
        })
    }

    /// Ceremonies including `id` and pings of its endpoint fail.
    pub(crate) fn failing_for(mut self, id: u64) -> Self {
        self.failing.insert(id);
        self
    }

    pub(crate) fn requests(&self) -> Vec<CeremonyRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn pinged(&self) -> Vec<String> {
        self.pinged.lock().unwrap().clone()
    }
}

#[async_trait]
impl DkgRunner for MockDkg {
    async fn run_ceremony(&self, request: &CeremonyRequest) -> eyre::Result<CeremonyOutputs> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if request.operators.iter().any(|operator| self.failing.contains(&operator.id)) {
            return Err(eyre!("ERROR: could not reach operator"));
        }

        let operator_ids: Vec<u64> = request.operators.iter().map(|operator| operator.id).collect();
        let mut deposits = Vec::new();
        let mut shares = Vec::new();
        for offset in 0..u64::from(request.validators) {
            let pubkey = format!("0x{index:02x}{offset:02x}");
            let nonce = request.nonce + offset;
            deposits.push(json!({
                "pubkey": pubkey,
                "withdrawal_credentials": "0x01",
                "amount": 32000000000u64,
                "signature": "0x02",
                "deposit_data_root": format!("0x{}", "00".repeat(32)),
            }));
            shares.push(json!({
                "data": {
                    "ownerNonce": nonce,
                    "ownerAddress": request.owner,
                    "publicKey": pubkey,
                    "operators": [],
                },
                "payload": {
                    "publicKey": pubkey,
                    "operatorIds": operator_ids,
                    "sharesData": "0x03",
                },
            }));
        }

        let ceremony = self.dir.path().join(format!("ceremony-{index}"));
        fs::create_dir_all(&ceremony)?;
        let outputs = CeremonyOutputs {
            deposit: ceremony.join("deposit_data.json"),
            keyshares: ceremony.join("keyshares.json"),
        };
        fs::write(&outputs.deposit, serde_json::to_string(&deposits)?)?;
        fs::write(&outputs.keyshares, json!({ "shares": shares }).to_string())?;
        Ok(outputs)
    }

    async fn ping(&self, addresses: &[String]) -> eyre::Result<()> {
        self.pinged.lock().unwrap().extend(addresses.iter().cloned());
        if addresses.iter().any(|address| self.failing.iter().any(|&id| *address == endpoint(id))) {
            return Err(eyre!("ERROR: operator unreachable"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ContractCall {
    Deposit(String),
    Register { pubkeys: Vec<String>, operator_ids: Vec<u64> },
    Exit { pubkey: String, operator_ids: Vec<u64> },
    Remove { pubkey: String, operator_ids: Vec<u64> },
    Liquidate { owner: Address, operator_ids: Vec<u64> },
}

#[derive(Debug, Default)]
pub(crate) struct MockContracts {
    failing_register: HashSet<u64>,
    failing_offboard: HashSet<String>,
    calls: Mutex<Vec<ContractCall>>,
}

impl MockContracts {
    /// Registrations for clusters containing `id` revert.
    pub(crate) fn failing_register_for(mut self, id: u64) -> Self {
        self.failing_register.insert(id);
        self
    }

    pub(crate) fn failing_offboard_for(mut self, pubkey: &str) -> Self {
        self.failing_offboard.insert(pubkey.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<ContractCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ContractCall) -> B256 {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        B256::with_last_byte(calls.len() as u8)
    }
}

#[async_trait]
impl ValidatorContracts for MockContracts {
    async fn deposit(&self, deposit: &DepositData) -> eyre::Result<B256> {
        Ok(self.record(ContractCall::Deposit(deposit.pubkey.clone())))
    }

    async fn bulk_register(
        &self,
        keyshares: &KeysharesFile,
        _cluster: ClusterSnapshot,
    ) -> eyre::Result<B256> {
        let operator_ids = keyshares.operator_ids()?;
        if operator_ids.iter().any(|id| self.failing_register.contains(id)) {
            return Err(eyre!("register transaction reverted"));
        }
        let pubkeys = keyshares.public_keys().into_iter().map(str::to_string).collect();
        Ok(self.record(ContractCall::Register { pubkeys, operator_ids }))
    }

    async fn exit_validator(&self, pubkey: &str, operator_ids: &[u64]) -> eyre::Result<B256> {
        if self.failing_offboard.contains(pubkey) {
            return Err(eyre!("exit transaction reverted"));
        }
        Ok(self.record(ContractCall::Exit {
            pubkey: pubkey.to_string(),
            operator_ids: operator_ids.to_vec(),
        }))
    }

    async fn remove_validator(
        &self,
        pubkey: &str,
        operator_ids: &[u64],
        _cluster: ClusterSnapshot,
    ) -> eyre::Result<B256> {
        if self.failing_offboard.contains(pubkey) {
            return Err(eyre!("remove transaction reverted"));
        }
        Ok(self.record(ContractCall::Remove {
            pubkey: pubkey.to_string(),
            operator_ids: operator_ids.to_vec(),
        }))
    }

    async fn liquidate(
        &self,
        owner: Address,
        operator_ids: &[u64],
        _cluster: ClusterSnapshot,
    ) -> eyre::Result<B256> {
        Ok(self.record(ContractCall::Liquidate { owner, operator_ids: operator_ids.to_vec() }))
    }
}
