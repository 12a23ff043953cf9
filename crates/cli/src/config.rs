use std::{path::PathBuf, time::Duration};

use alloy_primitives::Address;
use clap::Args;
use reqwest::Url;

pub const DEFAULT_SUBGRAPH_API: &str =
    "https://api.studio.thegraph.com/query/71118/ssv-network-holesky/version/latest";
pub const DEFAULT_DKG_IMAGE: &str = "bloxstaking/ssv-dkg:v2.1.0";
/// The beacon deposit contract address shared by mainnet-style testnets.
pub const DEFAULT_DEPOSIT_CONTRACT: &str = "0x4242424242424242424242424242424242424242";
/// Gas estimation fails against SSVNetwork for these calls, so a fixed limit is sent.
pub const DEFAULT_GAS_LIMIT: u64 = 3_000_000;

/// The SSV subgraph, source of account nonces and cluster state.
#[derive(Debug, Clone, Args)]
pub struct SubgraphOpts {
    /// SSV subgraph GraphQL endpoint
    #[clap(long, env = "SUBGRAPH_API", default_value = DEFAULT_SUBGRAPH_API)]
    pub subgraph_api: Url,

    /// HTTP request timeout in seconds
    #[clap(long, env = "REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,
}

impl SubgraphOpts {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Endpoints used to look up operators, clusters and account state.
#[derive(Debug, Clone, Args)]
pub struct ApiOpts {
    /// Base URL of the SSV REST API, e.g. https://api.ssv.network/api/v4/holesky
    #[clap(long, env = "SSV_API")]
    pub ssv_api: Url,

    #[clap(flatten)]
    pub subgraph: SubgraphOpts,
}

impl ApiOpts {
    pub fn timeout(&self) -> Duration {
        self.subgraph.timeout()
    }
}

/// Execution layer connection and the contracts transactions are sent to.
#[derive(Debug, Clone, Args)]
pub struct ChainOpts {
    /// The RPC URL of the Ethereum node
    #[clap(long, env = "RPC_ENDPOINT")]
    pub rpc_endpoint: Url,

    /// Private key for signing transactions
    #[clap(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// The SSVNetwork contract address
    #[clap(long, env = "SSV_CONTRACT")]
    pub ssv_contract: Address,

    /// The beacon chain deposit contract address
    #[clap(long, env = "DEPOSIT_CONTRACT", default_value = DEFAULT_DEPOSIT_CONTRACT)]
    pub deposit_contract: Address,

    /// Gas limit attached to every transaction
    #[clap(long, env = "GAS_LIMIT", default_value_t = DEFAULT_GAS_LIMIT)]
    pub gas_limit: u64,
}

/// How the ssv-dkg container is launched.
#[derive(Debug, Clone, Args)]
pub struct DkgOpts {
    /// Host folder mounted into the DKG container as its output path
    #[clap(long, env = "OUTPUT_FOLDER", default_value = "output")]
    pub output_folder: PathBuf,

    /// Network name passed to the DKG ceremony
    #[clap(long, env = "NETWORK", default_value = "holesky")]
    pub network: String,

    /// DKG container image
    #[clap(long, env = "DKG_IMAGE", default_value = DEFAULT_DKG_IMAGE)]
    pub dkg_image: String,

    /// Container runtime binary
    #[clap(long, env = "DOCKER_BIN", default_value = "docker")]
    pub docker_bin: String,

    /// Number of validators generated per ceremony
    #[clap(long, default_value = "1")]
    pub validators: u32,

    /// Maximum duration of a single DKG invocation in seconds
    #[clap(long, env = "CEREMONY_TIMEOUT", default_value = "600")]
    pub ceremony_timeout: u64,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[clap(flatten)]
        api: ApiOpts,
        #[clap(flatten)]
        dkg: DkgOpts,
    }

    #[test]
    fn test_defaults() {
        let cli =
            TestCli::parse_from(["test", "--ssv-api", "https://api.ssv.network/api/v4/holesky"]);
        assert_eq!(cli.api.subgraph.subgraph_api.as_str(), DEFAULT_SUBGRAPH_API);
        assert_eq!(cli.api.timeout(), Duration::from_secs(30));
        assert_eq!(cli.dkg.dkg_image, DEFAULT_DKG_IMAGE);
        assert_eq!(cli.dkg.validators, 1);
        assert_eq!(cli.dkg.output_folder, PathBuf::from("output"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = TestCli::try_parse_from(["test", "--ssv-api", "not a url"]);
        assert!(result.is_err());
    }
}
