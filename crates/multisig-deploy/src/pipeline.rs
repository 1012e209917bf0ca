/// The deployment run: select the actions, execute them in order against one
/// chain, and report and persist what was deployed. A failing action stops
/// the run. Whatever earlier actions deployed stays deployed and recorded.
use std::{fmt, fs, path::PathBuf};

use ethers::types::Address;
use multisig_addresses::Addresses;
use tracing::{info, instrument, warn};

use crate::{
    actions::{default_actions, select_actions, DeployAction},
    artifacts::ArtifactStore,
    chain::{Chain, RpcChain},
    compile::SolcCompiler,
    config::DeployConfig,
    deploy::{DeployedContract, Deployer},
    deployments::DeploymentStore,
    error::{ConfigurationError, DeploymentError, Result, VerificationError},
    size::{contract_sizes, ContractSize, EIP170_LIMIT},
    verify::{EtherscanVerifier, VerificationRequest, Verifier},
};

pub const ADDRESSES_FILE: &str = "addresses.json";

/// What a run did, in the order the actions ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub network: String,
    pub chain_id: u64,
    pub deployer: Address,
    pub deployed: Vec<DeployedContract>,
}

impl Report {
    pub fn addresses(&self) -> Addresses {
        let mut addresses = Addresses::default();
        for contract in &self.deployed {
            if !addresses.set(&contract.name, contract.address) {
                warn!(contract = %contract.name, "not tracked in the addresses file");
            }
        }
        addresses
    }

    pub fn get(&self, name: &str) -> Option<&DeployedContract> {
        self.deployed.iter().find(|contract| contract.name == name)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "network {} (chain {}), deployer {:?}",
            self.network, self.chain_id, self.deployer
        )?;
        for contract in &self.deployed {
            writeln!(
                f,
                "  {:<16} {:?} {}",
                contract.name,
                contract.address,
                if contract.newly_deployed {
                    "deployed"
                } else {
                    "reused"
                }
            )?;
        }
        Ok(())
    }
}

/// Opens the deployment records of the configured network. Ephemeral networks
/// start from nothing every run.
pub fn open_store(
    config: &DeployConfig,
    chain_id: u64,
) -> Result<DeploymentStore, DeploymentError> {
    if config.network.ephemeral {
        Ok(DeploymentStore::in_memory(&config.network.name))
    } else {
        DeploymentStore::open(
            &config.paths.deployments_dir(),
            &config.network.name,
            chain_id,
        )
    }
}

/// The addresses of every action: the ones that just ran from the report, the
/// others from their deployment records. Contracts never deployed on this
/// network stay zero.
pub fn collect_addresses(
    report: &Report,
    actions: &[DeployAction],
    store: &mut DeploymentStore,
) -> Result<Addresses, DeploymentError> {
    let mut addresses = report.addresses();
    for action in actions {
        let contract_name = action.spec(report.deployer).contract_name;
        if report.get(&contract_name).is_some() {
            continue;
        }
        if let Some(record) = store.get(&contract_name)? {
            addresses.set(&contract_name, record.address);
        }
    }
    Ok(addresses)
}

/// Writes the addresses to `<artifacts>/addresses.json`.
pub fn write_addresses(
    config: &DeployConfig,
    addresses: &Addresses,
) -> Result<PathBuf, DeploymentError> {
    let dir = config.paths.artifacts_dir();
    fs::create_dir_all(&dir)?;
    let path = dir.join(ADDRESSES_FILE);
    fs::write(&path, serde_json::to_string_pretty(addresses)?)?;
    Ok(path)
}

/// Runs the actions carrying any of the tags against an already connected
/// chain.
#[instrument(skip_all, fields(network = %config.network.name))]
pub async fn run_pipeline<C: Chain + ?Sized>(
    chain: &C,
    config: &DeployConfig,
    actions: &[DeployAction],
    tags: &[String],
) -> Result<Report> {
    let selected = select_actions(actions, tags)?;
    let chain_id = chain.chain_id().await?;
    if chain_id != config.network.chain_id {
        return Err(ConfigurationError::ChainIdMismatch {
            network: config.network.name.clone(),
            expected: config.network.chain_id,
            actual: chain_id,
        }
        .into());
    }

    let mut store = open_store(config, chain_id)?;
    let artifacts = ArtifactStore::new(config.paths.artifacts_dir());
    let mut deployer = Deployer::new(chain, &config.network, &artifacts, &mut store);

    let mut report = Report {
        network: config.network.name.clone(),
        chain_id,
        deployer: chain.deployer(),
        deployed: vec![],
    };
    for action in selected {
        info!(action = action.name, "running");
        let spec = action.spec(chain.deployer());
        report.deployed.push(deployer.deploy(&spec).await?);
    }

    let addresses = collect_addresses(&report, actions, deployer.store())?;
    let path = write_addresses(config, &addresses)?;
    info!(path = %path.display(), count = report.deployed.len(), "deployment finished");
    Ok(report)
}

/// Connects to the configured network and runs the default actions.
pub async fn deploy(config: &DeployConfig, tags: &[String]) -> Result<Report> {
    // Bad tags fail before anything is spawned or dialed.
    let actions = default_actions();
    select_actions(&actions, tags)?;
    let chain = RpcChain::connect(&config.network).await?;
    run_pipeline(&chain, config, &actions, tags).await
}

/// Compiles the sources and writes their artifacts.
pub async fn compile(config: &DeployConfig) -> Result<Vec<PathBuf>> {
    let compiler = SolcCompiler::new(config.compiler.clone(), config.paths.clone());
    let artifacts = ArtifactStore::new(config.paths.artifacts_dir());
    // Installing and running solc blocks.
    let written = tokio::task::spawn_blocking(move || compiler.compile_to(&artifacts))
        .await
        .map_err(crate::error::CompilationError::from)??;
    Ok(written)
}

/// The deployed bytecode sizes of the compiled contracts in alphabetical
/// order. Contracts over the EIP-170 limit are logged as warnings.
pub fn sizes(config: &DeployConfig) -> Result<Vec<ContractSize>> {
    let sizes = contract_sizes(&ArtifactStore::new(config.paths.artifacts_dir()))?;
    for size in sizes.iter().filter(|size| size.over_limit()) {
        warn!(
            contract = %size.name,
            size = size.deployed_size,
            limit = EIP170_LIMIT,
            "contract exceeds the code size limit"
        );
    }
    Ok(sizes)
}

/// Verifies the recorded deployment of a contract on the network's block
/// explorer.
pub async fn verify(config: &DeployConfig, contract: &str) -> Result<()> {
    let network = &config.network;
    let api_url = network
        .explorer_api
        .clone()
        .ok_or_else(|| VerificationError::Unsupported(network.name.clone()))?;
    let api_key = config.etherscan_api_key.clone().ok_or_else(|| {
        ConfigurationError::MissingCredential {
            network: network.name.clone(),
            variable: "ETHERSCAN_API_KEY",
        }
    })?;

    let not_deployed = || VerificationError::NotDeployed {
        contract: contract.to_string(),
        network: network.name.clone(),
    };
    if network.ephemeral {
        return Err(not_deployed().into());
    }
    let mut store = open_store(config, network.chain_id)?;
    let record = store.get(contract)?.ok_or_else(not_deployed)?;
    let artifact = ArtifactStore::new(config.paths.artifacts_dir()).load(contract)?;

    let compiler = SolcCompiler::new(config.compiler.clone(), config.paths.clone());
    let source_name = artifact.source_name.clone();
    let (source, compiler_version) =
        tokio::task::spawn_blocking(move || compiler.verification_input(&source_name))
            .await
            .map_err(crate::error::CompilationError::from)??;

    let request = VerificationRequest {
        address: record.address,
        contract: format!("{}:{}", artifact.source_name, artifact.contract_name),
        source,
        compiler_version,
        constructor_args: record.encoded_args,
    };
    EtherscanVerifier::new(api_url, api_key)?
        .verify(&request)
        .await?;
    Ok(())
}
