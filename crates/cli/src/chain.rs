use std::fmt::Debug;

use alloy_network::{Ethereum, EthereumWallet, ReceiptResponse};
use alloy_primitives::{hex::FromHexError, Address, Bytes, B256, U256};
use alloy_provider::{PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder};
use alloy_signer_local::{LocalSignerError, PrivateKeySigner};
use async_trait::async_trait;
use ssv_automate_contracts::{Cluster, DepositContract, SSVNetwork};
use ssv_automate_primitives::{ClusterSnapshot, DepositData, KeysharesError, KeysharesFile};
use tracing::info;

use crate::config::ChainOpts;

/// 10 SSV, the per-registration funding used when none is configured.
pub const DEFAULT_SSV_AMOUNT: U256 = U256::from_limbs([10_000_000_000_000_000_000, 0, 0, 0]);
const GWEI: u64 = 1_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid private key: {0}")]
    Signer(#[from] LocalSignerError),
    #[error("Invalid hex field {field}: {source}")]
    Hex {
        field: &'static str,
        #[source]
        source: FromHexError,
    },
    #[error("Contract call failed: {0}")]
    Contract(#[from] alloy_contract::Error),
    #[error("Failed waiting for receipt: {0}")]
    Receipt(#[from] PendingTransactionError),
    #[error("{action} transaction {tx_hash} reverted")]
    Reverted { action: &'static str, tx_hash: B256 },
    #[error(transparent)]
    Keyshares(#[from] KeysharesError),
}

/// Contract interactions performed by the onboarding and offboarding pipelines.
///
/// Every method waits for the transaction to be mined and returns its hash.
#[async_trait]
pub trait ValidatorContracts: Send + Sync {
    async fn deposit(&self, deposit: &DepositData) -> eyre::Result<B256>;

    async fn bulk_register(
        &self,
        keyshares: &KeysharesFile,
        cluster: ClusterSnapshot,
    ) -> eyre::Result<B256>;

    async fn exit_validator(&self, pubkey: &str, operator_ids: &[u64]) -> eyre::Result<B256>;

    async fn remove_validator(
        &self,
        pubkey: &str,
        operator_ids: &[u64],
        cluster: ClusterSnapshot,
    ) -> eyre::Result<B256>;

    async fn liquidate(
        &self,
        owner: Address,
        operator_ids: &[u64],
        cluster: ClusterSnapshot,
    ) -> eyre::Result<B256>;
}

fn parse_bytes(field: &'static str, value: &str) -> Result<Bytes, ChainError> {
    value.parse().map_err(|source| ChainError::Hex { field, source })
}

pub fn cluster_arg(snapshot: ClusterSnapshot) -> Cluster {
    Cluster {
        validatorCount: snapshot.validator_count,
        networkFeeIndex: snapshot.network_fee_index,
        index: snapshot.index,
        active: snapshot.active,
        balance: U256::from(snapshot.balance),
    }
}

/// Decoded arguments of a `deposit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositArgs {
    pub pubkey: Bytes,
    pub withdrawal_credentials: Bytes,
    pub signature: Bytes,
    pub deposit_data_root: B256,
    pub value: U256,
}

impl TryFrom<&DepositData> for DepositArgs {
    type Error = ChainError;

    fn try_from(deposit: &DepositData) -> Result<Self, Self::Error> {
        Ok(Self {
            pubkey: parse_bytes("pubkey", &deposit.pubkey)?,
            withdrawal_credentials: parse_bytes(
                "withdrawal_credentials",
                &deposit.withdrawal_credentials,
            )?,
            signature: parse_bytes("signature", &deposit.signature)?,
            deposit_data_root: deposit
                .deposit_data_root
                .parse()
                .map_err(|source| ChainError::Hex { field: "deposit_data_root", source })?,
            value: U256::from(deposit.amount) * U256::from(GWEI),
        })
    }
}

/// Decoded arguments of a share registration for one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub public_keys: Vec<Bytes>,
    pub operator_ids: Vec<u64>,
    pub shares: Vec<Bytes>,
}

impl TryFrom<&KeysharesFile> for Registration {
    type Error = ChainError;

    fn try_from(keyshares: &KeysharesFile) -> Result<Self, Self::Error> {
        let operator_ids = keyshares.operator_ids()?;
        let mut public_keys = Vec::with_capacity(keyshares.shares.len());
        let mut shares = Vec::with_capacity(keyshares.shares.len());
        for share in &keyshares.shares {
            public_keys.push(parse_bytes("publicKey", &share.payload.public_key)?);
            shares.push(parse_bytes("sharesData", &share.payload.shares_data)?);
        }
        Ok(Self { public_keys, operator_ids, shares })
    }
}

/// Submits transactions to the beacon deposit contract and the SSVNetwork contract.
#[derive(Clone)]
pub struct SsvContractClient<P> {
    provider: P,
    ssv_contract: Address,
    deposit_contract: Address,
    gas_limit: u64,
    ssv_amount: U256,
}

/// Build a signing client from the chain configuration.
pub fn connect(
    opts: &ChainOpts,
    ssv_amount: U256,
) -> Result<SsvContractClient<impl Provider + Clone>, ChainError> {
    let signer: PrivateKeySigner = opts.private_key.parse()?;
    info!(sender = %signer.address(), rpc = %opts.rpc_endpoint, "connecting to execution client");
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::new(signer))
        .on_http(opts.rpc_endpoint.clone());

    Ok(SsvContractClient {
        provider,
        ssv_contract: opts.ssv_contract,
        deposit_contract: opts.deposit_contract,
        gas_limit: opts.gas_limit,
        ssv_amount,
    })
}

impl<P: Provider + Clone> SsvContractClient<P> {
    async fn confirm(
        &self,
        action: &'static str,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> Result<B256, ChainError> {
        let tx_hash = *pending.tx_hash();
        info!(action, %tx_hash, "transaction sent");

        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            return Err(ChainError::Reverted { action, tx_hash });
        }
        info!(action, %tx_hash, block = ?receipt.block_number(), "transaction confirmed");
        Ok(tx_hash)
    }

    pub async fn submit_deposit(&self, deposit: &DepositData) -> Result<B256, ChainError> {
        let args = DepositArgs::try_from(deposit)?;
        let contract = DepositContract::new(self.deposit_contract, self.provider.clone());
        let pending = contract
            .deposit(
                args.pubkey,
                args.withdrawal_credentials,
                args.signature,
                args.deposit_data_root,
            )
            .value(args.value)
            .gas(self.gas_limit)
            .send()
            .await?;
        self.confirm("deposit", pending).await
    }

    pub async fn register(
        &self,
        keyshares: &KeysharesFile,
        cluster: ClusterSnapshot,
    ) -> Result<B256, ChainError> {
        let mut registration = Registration::try_from(keyshares)?;
        let contract = SSVNetwork::new(self.ssv_contract, self.provider.clone());

        let pending = if registration.public_keys.len() == 1 {
            let (Some(public_key), Some(shares)) =
                (registration.public_keys.pop(), registration.shares.pop())
            else {
                return Err(KeysharesError::Empty.into());
            };
            contract
                .registerValidator(
                    public_key,
                    registration.operator_ids,
                    shares,
                    self.ssv_amount,
                    cluster_arg(cluster),
                )
                .gas(self.gas_limit)
                .send()
                .await?
        } else {
            contract
                .bulkRegisterValidator(
                    registration.public_keys,
                    registration.operator_ids,
                    registration.shares,
                    self.ssv_amount,
                    cluster_arg(cluster),
                )
                .gas(self.gas_limit)
                .send()
                .await?
        };
        self.confirm("register", pending).await
    }

    pub async fn exit(&self, pubkey: &str, operator_ids: &[u64]) -> Result<B256, ChainError> {
        let contract = SSVNetwork::new(self.ssv_contract, self.provider.clone());
        let pending = contract
            .exitValidator(parse_bytes("pubkey", pubkey)?, operator_ids.to_vec())
            .gas(self.gas_limit)
            .send()
            .await?;
        self.confirm("exit", pending).await
    }

    pub async fn remove(
        &self,
        pubkey: &str,
        operator_ids: &[u64],
        cluster: ClusterSnapshot,
    ) -> Result<B256, ChainError> {
        let contract = SSVNetwork::new(self.ssv_contract, self.provider.clone());
        let pending = contract
            .removeValidator(
                parse_bytes("pubkey", pubkey)?,
                operator_ids.to_vec(),
                cluster_arg(cluster),
            )
            .gas(self.gas_limit)
            .send()
            .await?;
        self.confirm("remove", pending).await
    }

    pub async fn liquidate_cluster(
        &self,
        owner: Address,
        operator_ids: &[u64],
        cluster: ClusterSnapshot,
    ) -> Result<B256, ChainError> {
        let contract = SSVNetwork::new(self.ssv_contract, self.provider.clone());
        let pending = contract
            .liquidate(owner, operator_ids.to_vec(), cluster_arg(cluster))
            .gas(self.gas_limit)
            .send()
            .await?;
        self.confirm("liquidate", pending).await
    }
}

impl<P> Debug for SsvContractClient<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsvContractClient")
            .field("ssv_contract", &self.ssv_contract)
            .field("deposit_contract", &self.deposit_contract)
            .field("gas_limit", &self.gas_limit)
            .field("ssv_amount", &self.ssv_amount)
            .finish()
    }
}

#[async_trait]
impl<P: Provider + Clone> ValidatorContracts for SsvContractClient<P> {
    async fn deposit(&self, deposit: &DepositData) -> eyre::Result<B256> {
        Ok(self.submit_deposit(deposit).await?)
    }

    async fn bulk_register(
        &self,
        keyshares: &KeysharesFile,
        cluster: ClusterSnapshot,
    ) -> eyre::Result<B256> {
        Ok(self.register(keyshares, cluster).await?)
    }

    async fn exit_validator(&self, pubkey: &str, operator_ids: &[u64]) -> eyre::Result<B256> {
        Ok(self.exit(pubkey, operator_ids).await?)
    }

    async fn remove_validator(
        &self,
        pubkey: &str,
        operator_ids: &[u64],
        cluster: ClusterSnapshot,
    ) -> eyre::Result<B256> {
        Ok(self.remove(pubkey, operator_ids, cluster).await?)
    }

    async fn liquidate(
        &self,
        owner: Address,
        operator_ids: &[u64],
        cluster: ClusterSnapshot,
    ) -> eyre::Result<B256> {
        Ok(self.liquidate_cluster(owner, operator_ids, cluster).await?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use ssv_automate_primitives::{KeyShare, ShareData, SharePayload};

    use super::*;

    fn share(pubkey: &str, operator_ids: Vec<u64>) -> KeyShare {
        KeyShare {
            data: ShareData {
                owner_nonce: 0,
                owner_address: "0xaa184b86b4cdb747f4a3bf6e6fcd5e27c1d92c5c".to_string(),
                public_key: pubkey.to_string(),
                operators: vec![],
            },
            payload: SharePayload {
                public_key: pubkey.to_string(),
                operator_ids,
                shares_data: "0xdeadbeef".to_string(),
            },
        }
    }

    #[test]
    fn test_default_ssv_amount() {
        assert_eq!(DEFAULT_SSV_AMOUNT, U256::from(10u64) * U256::from(10u64).pow(U256::from(18)));
    }

    #[test]
    fn test_cluster_arg() {
        let cluster = cluster_arg(ClusterSnapshot {
            validator_count: 2,
            network_fee_index: 5,
            index: 7,
            active: true,
            balance: 1_500_000_000_000_000_000,
        });
        assert_eq!(cluster.validatorCount, 2);
        assert_eq!(cluster.networkFeeIndex, 5);
        assert_eq!(cluster.index, 7);
        assert!(cluster.active);
        assert_eq!(cluster.balance, U256::from(1_500_000_000_000_000_000u128));
    }

    #[test]
    fn test_deposit_args() -> eyre::Result<()> {
        let deposit: DepositData = serde_json::from_value(json!({
            "pubkey": "aa01",
            "withdrawal_credentials": "0x0100",
            "amount": 32000000000u64,
            "signature": "bb02",
            "deposit_data_root": format!("0x{}", "11".repeat(32)),
        }))?;
        let args = DepositArgs::try_from(&deposit)?;
        assert_eq!(args.pubkey, Bytes::from(vec![0xaa, 0x01]));
        assert_eq!(args.withdrawal_credentials, Bytes::from(vec![0x01, 0x00]));
        assert_eq!(args.deposit_data_root, B256::repeat_byte(0x11));
        assert_eq!(args.value, U256::from(32u64) * U256::from(10u64).pow(U256::from(18)));
        Ok(())
    }

    #[test]
    fn test_deposit_args_rejects_bad_root() -> eyre::Result<()> {
        let deposit: DepositData = serde_json::from_value(json!({
            "pubkey": "aa01",
            "withdrawal_credentials": "0x0100",
            "amount": 32000000000u64,
            "signature": "bb02",
            "deposit_data_root": "0x1234",
        }))?;
        assert!(matches!(
            DepositArgs::try_from(&deposit),
            Err(ChainError::Hex { field: "deposit_data_root", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_registration() -> eyre::Result<()> {
        let keyshares = KeysharesFile {
            version: None,
            created_at: None,
            shares: vec![share("0xaa01", vec![1, 2, 3, 4]), share("0xaa02", vec![1, 2, 3, 4])],
        };
        let registration = Registration::try_from(&keyshares)?;
        assert_eq!(registration.operator_ids, vec![1, 2, 3, 4]);
        assert_eq!(registration.public_keys.len(), 2);
        assert_eq!(registration.shares[1], Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]));
        Ok(())
    }

    #[test]
    fn test_registration_rejects_mixed_clusters() {
        let keyshares = KeysharesFile {
            version: None,
            created_at: None,
            shares: vec![share("0xaa01", vec![1, 2, 3, 4]), share("0xaa02", vec![1, 2, 3, 5])],
        };
        assert!(matches!(
            Registration::try_from(&keyshares),
            Err(ChainError::Keyshares(KeysharesError::MixedOperatorSets { .. }))
        ));
    }
}
