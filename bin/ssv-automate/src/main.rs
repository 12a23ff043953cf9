use clap::{Parser, Subcommand};
use ssv_automate_cmd::{
    initialize_tracing_log, MergeDepositCommand, NewOperatorsCommand, OffboardCommand,
    OnboardCommand, OperatorsCommand, PingCommand,
};
use tracing::error;

#[derive(Debug, Parser)]
#[command(author, version, about = "Automate SSV validator onboarding", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace), ignored when RUST_LOG is set
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbosity: u8,

    /// Print the full error report with its cause chain on failure
    #[clap(long, global = true)]
    verbose: bool,

    /// The command to execute
    #[clap(subcommand)]
    command: Commands,
}

/// Commands to be executed
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List operators matching a name filter
    #[command(name = "operators")]
    Operators(OperatorsCommand),

    /// Operators that are not part of any cluster of the owner yet
    #[command(name = "new")]
    NewOperators(NewOperatorsCommand),

    /// Check the DKG endpoints of operators
    #[command(name = "ping")]
    Ping(PingCommand),

    /// Create, activate and register a validator with every given operator
    #[command(name = "onboard", visible_alias = "automate")]
    Onboard(Box<OnboardCommand>),

    /// Exit, remove or liquidate the validators of an owner
    #[command(name = "offboard")]
    Offboard(OffboardCommand),

    /// Merge per-validator deposit files into one, ordered by owner nonce
    #[command(name = "merge-deposit")]
    MergeDeposit(MergeDepositCommand),
}

async fn execute(command: Commands) -> eyre::Result<()> {
    match command {
        Commands::Operators(cmd) => cmd.execute().await,
        Commands::NewOperators(cmd) => cmd.execute().await,
        Commands::Ping(cmd) => cmd.execute().await,
        Commands::Onboard(cmd) => cmd.execute().await,
        Commands::Offboard(cmd) => cmd.execute().await,
        Commands::MergeDeposit(cmd) => cmd.execute().await,
    }
}

fn main() {
    let cli = Cli::parse();
    initialize_tracing_log(cli.verbosity);

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(eyre::Report::from)
        .and_then(|runtime| runtime.block_on(execute(cli.command)));

    if let Err(err) = result {
        if cli.verbose {
            eprintln!("Error: {err:?}");
        } else {
            error!("{err}");
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_automate_alias() {
        let cli = Cli::try_parse_from([
            "ssv-automate",
            "-vv",
            "automate",
            "0xaA184b86B4cdb747F4A3BF6e6FCd5e27c1d92c5c",
            "-o",
            "10,11",
            "--ssv-api",
            "https://api.ssv.network/api/v4/holesky",
            "--rpc-endpoint",
            "http://localhost:8545",
            "--private-key",
            "0x0000000000000000000000000000000000000000000000000000000000000001",
            "--ssv-contract",
            "0x38A4794cCEd47d3baf7370CcC43B560D3a1beEFA",
        ])
        .unwrap();
        assert_eq!(cli.verbosity, 2);
        assert!(matches!(cli.command, Commands::Onboard(_)));
    }

    #[test]
    fn test_offboard_action_is_validated() {
        let result = Cli::try_parse_from([
            "ssv-automate",
            "offboard",
            "0xaA184b86B4cdb747F4A3BF6e6FCd5e27c1d92c5c",
            "destroy",
            "--rpc-endpoint",
            "http://localhost:8545",
            "--private-key",
            "0x01",
            "--ssv-contract",
            "0x38A4794cCEd47d3baf7370CcC43B560D3a1beEFA",
        ]);
        assert!(result.is_err());
    }
}
