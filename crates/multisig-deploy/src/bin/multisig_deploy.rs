use clap::{Parser, Subcommand};
use eyre::Result;
use multisig_deploy::{
    constants::DEFAULT_NETWORK, known_networks, pipeline, size::SizeTable, Credentials,
    DeployConfig, PathsConfig,
};
use tracing_subscriber::EnvFilter;

/// Deploys the multisig contracts.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// The network to run against.
    #[arg(long, global = true, default_value = DEFAULT_NETWORK)]
    network: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the deployment actions.
    Deploy {
        /// Only run the actions with one of these tags.
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Run every deployment action.
    DeployContracts,
    /// Compile the contracts into artifacts.
    Compile,
    /// Print the deployed bytecode size of every compiled contract.
    Size,
    /// Verify a deployed contract on the network's block explorer.
    Verify { contract: String },
    /// List the known networks.
    Networks,
}

fn resolve(network: &str) -> Result<DeployConfig> {
    let credentials = Credentials::from_env()?;
    Ok(DeployConfig::resolve(
        network,
        &credentials,
        PathsConfig::from_env()?,
    )?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine, everything can come from the environment.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Deploy { tags } => {
            let report = pipeline::deploy(&resolve(&cli.network)?, &tags).await?;
            print!("{}", report);
        }
        Command::DeployContracts => {
            let report = pipeline::deploy(&resolve(&cli.network)?, &[]).await?;
            print!("{}", report);
        }
        Command::Compile => {
            for path in pipeline::compile(&resolve(&cli.network)?).await? {
                println!("{}", path.display());
            }
        }
        Command::Size => {
            let sizes = pipeline::sizes(&resolve(&cli.network)?)?;
            print!("{}", SizeTable(&sizes));
        }
        Command::Verify { contract } => {
            pipeline::verify(&resolve(&cli.network)?, &contract).await?
        }
        Command::Networks => {
            for network in known_networks() {
                println!(
                    "{:<16} chain {:<6} {}",
                    network.name,
                    network.chain_id,
                    network.credential.unwrap_or("")
                );
            }
        }
    }

    Ok(())
}
