use std::fs;

use ethers::types::{Address, H256};
use eyre::Result;
use multisig_addresses::Addresses;
use multisig_deploy::{
    actions::{default_actions, multisig_args},
    artifacts::ArtifactStore,
    deploy::{deterministic_address, encode_init_code},
    deployments::DeploymentStore,
    pipeline::{open_store, sizes, ADDRESSES_FILE},
    run_pipeline, Chain, ConfigurationError, Credentials, DeployConfig, Deployer,
    DeploymentError, DeploymentSpec, Error, PathsConfig, EIP170_LIMIT,
};
use tempfile::TempDir;
use test_utils::{write_fixture_artifacts, MemoryChain};

/// A `local` configuration rooted in a fresh directory holding the fixture
/// artifacts.
fn local_config() -> Result<(TempDir, DeployConfig)> {
    let dir = tempfile::tempdir()?;
    let config = DeployConfig::resolve(
        "local",
        &Credentials::default(),
        PathsConfig::with_root(dir.path()),
    )?;
    write_fixture_artifacts(&config.paths.artifacts_dir())?;
    Ok((dir, config))
}

#[tokio::test]
async fn test_deterministic_deployment_is_idempotent() -> Result<()> {
    let (_dir, config) = local_config()?;
    let chain = MemoryChain::new(config.network.chain_id);
    let artifacts = ArtifactStore::new(config.paths.artifacts_dir());
    let mut store = DeploymentStore::in_memory(&config.network.name);

    let owner = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse::<Address>()?;
    let spec = DeploymentSpec::new("Multisig", chain.deployer())
        .args(multisig_args(&[owner], 1))
        .deterministic(H256::zero());

    let mut deployer = Deployer::new(&chain, &config.network, &artifacts, &mut store);
    let first = deployer.deploy(&spec).await?;
    let transactions = chain.transactions().len();
    let second = deployer.deploy(&spec).await?;

    assert!(first.newly_deployed);
    assert!(!second.newly_deployed);
    assert_eq!(first.address, second.address);
    assert_eq!(chain.transactions().len(), transactions);

    let (init_code, _) = encode_init_code(&artifacts.load("Multisig")?, &spec.constructor_args)?;
    assert_eq!(first.address, deterministic_address(H256::zero(), &init_code));
    assert!(!chain.code_at(first.address).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_different_salts_give_different_addresses() -> Result<()> {
    let (_dir, config) = local_config()?;
    let chain = MemoryChain::new(config.network.chain_id);
    let artifacts = ArtifactStore::new(config.paths.artifacts_dir());
    let mut store = DeploymentStore::in_memory(&config.network.name);
    let mut deployer = Deployer::new(&chain, &config.network, &artifacts, &mut store);

    let spec = DeploymentSpec::new("Multisig", chain.deployer())
        .args(multisig_args(&[Address::from_low_u64_be(1)], 1));
    let zero = deployer.deploy(&spec.clone().deterministic(H256::zero())).await?;
    let one = deployer
        .deploy(&spec.deterministic(H256::from_low_u64_be(1)))
        .await?;
    assert_ne!(zero.address, one.address);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_runs_actions_in_order() -> Result<()> {
    let (dir, config) = local_config()?;
    let chain = MemoryChain::new(config.network.chain_id);

    let report = run_pipeline(&chain, &config, &default_actions(), &[]).await?;
    let names = report
        .deployed
        .iter()
        .map(|contract| contract.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Multisig", "MultisigProxy"]);
    assert!(report.deployed.iter().all(|contract| contract.newly_deployed));

    // The addresses file and the deployment records are written.
    let addresses: Addresses = serde_json::from_str(&fs::read_to_string(
        config.paths.artifacts_dir().join(ADDRESSES_FILE),
    )?)?;
    assert_eq!(addresses, report.addresses());
    assert!(dir.path().join("deployments/local/Multisig.json").exists());
    assert!(dir.path().join("deployments/local/MultisigProxy.json").exists());
    let record = open_store(&config, 31337)?
        .get("Multisig")?
        .ok_or_else(|| eyre::eyre!("missing Multisig record"))?;
    assert_eq!(record.address, addresses.multisig);
    assert!(record.deterministic);

    // A second run reuses everything.
    let transactions = chain.transactions().len();
    let rerun = run_pipeline(&chain, &config, &default_actions(), &[]).await?;
    assert!(rerun.deployed.iter().all(|contract| !contract.newly_deployed));
    assert_eq!(rerun.addresses(), report.addresses());
    assert_eq!(chain.transactions().len(), transactions);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_filters_by_tag() -> Result<()> {
    let (_dir, config) = local_config()?;
    let chain = MemoryChain::new(config.network.chain_id);

    let report = run_pipeline(
        &chain,
        &config,
        &default_actions(),
        &["MultisigProxy".to_string()],
    )
    .await?;
    assert_eq!(report.deployed.len(), 1);
    assert_eq!(report.deployed[0].name, "MultisigProxy");
    assert_eq!(report.addresses().multisig, Address::zero());

    // Nothing ever deployed the multisig, so the file leaves it zero.
    let addresses: Addresses = serde_json::from_str(&fs::read_to_string(
        config.paths.artifacts_dir().join(ADDRESSES_FILE),
    )?)?;
    assert_eq!(addresses.multisig, Address::zero());
    assert_eq!(addresses.multisig_proxy, report.deployed[0].address);
    Ok(())
}

#[tokio::test]
async fn test_tagged_rerun_keeps_recorded_addresses() -> Result<()> {
    let (_dir, config) = local_config()?;
    let chain = MemoryChain::new(config.network.chain_id);
    let full = run_pipeline(&chain, &config, &default_actions(), &[]).await?;

    let tagged = run_pipeline(
        &chain,
        &config,
        &default_actions(),
        &["MultisigProxy".to_string()],
    )
    .await?;
    assert_eq!(tagged.deployed.len(), 1);

    // The multisig didn't run but its recorded address is still written.
    let addresses: Addresses = serde_json::from_str(&fs::read_to_string(
        config.paths.artifacts_dir().join(ADDRESSES_FILE),
    )?)?;
    assert_eq!(addresses, full.addresses());
    assert_ne!(addresses.multisig, Address::zero());
    Ok(())
}

#[tokio::test]
async fn test_unknown_tag_never_touches_the_chain() -> Result<()> {
    let (_dir, config) = local_config()?;
    let chain = MemoryChain::new(config.network.chain_id);

    let err = run_pipeline(&chain, &config, &default_actions(), &["Token".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::UnknownTag(_))
    ));
    assert_eq!(chain.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_network_never_touches_the_chain() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let chain = MemoryChain::new(31337);

    let result = match DeployConfig::resolve(
        "moonbase",
        &Credentials::default(),
        PathsConfig::with_root(dir.path()),
    ) {
        Ok(config) => run_pipeline(&chain, &config, &default_actions(), &[]).await,
        Err(err) => Err(err.into()),
    };
    assert!(matches!(
        result,
        Err(Error::Configuration(ConfigurationError::UnknownNetwork(_)))
    ));
    assert_eq!(chain.calls(), 0);
    assert!(chain.transactions().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_mainnet_without_infura_key() -> Result<()> {
    let credentials = Credentials {
        mnemonic: Some("test test test test test test test test test test test junk".to_string()),
        ..Default::default()
    };
    let err = DeployConfig::resolve("mainnet", &credentials, PathsConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::MissingCredential {
            variable: "INFURA_KEY",
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_failing_action_aborts_the_run() -> Result<()> {
    let (dir, config) = local_config()?;
    let chain = MemoryChain::new(config.network.chain_id);
    // Funding the proxy deployer, the proxy itself and the multisig.
    chain.reject_transactions_after(3);

    let err = run_pipeline(&chain, &config, &default_actions(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Deployment(DeploymentError::Rpc(_))));

    // The multisig stays deployed and recorded, the proxy never happened.
    let record = open_store(&config, 31337)?
        .get("Multisig")?
        .ok_or_else(|| eyre::eyre!("missing Multisig record"))?;
    assert!(!chain.code_at(record.address).is_empty());
    assert!(!dir.path().join("deployments/local/MultisigProxy.json").exists());
    assert!(!config.paths.artifacts_dir().join(ADDRESSES_FILE).exists());
    Ok(())
}

#[tokio::test]
async fn test_chain_id_mismatch() -> Result<()> {
    let (_dir, config) = local_config()?;
    let chain = MemoryChain::new(1);

    let err = run_pipeline(&chain, &config, &default_actions(), &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::ChainIdMismatch {
            expected: 31337,
            actual: 1,
            ..
        })
    ));
    assert!(chain.transactions().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_ephemeral_networks_keep_no_records() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = DeployConfig::resolve(
        "hardhat",
        &Credentials::default(),
        PathsConfig::with_root(dir.path()),
    )?;
    write_fixture_artifacts(&config.paths.artifacts_dir())?;
    let chain = MemoryChain::new(config.network.chain_id);

    run_pipeline(&chain, &config, &default_actions(), &[]).await?;
    assert!(!config.paths.deployments_dir().exists());
    assert!(config.paths.artifacts_dir().join(ADDRESSES_FILE).exists());
    Ok(())
}

#[tokio::test]
async fn test_sizes_of_fixture_artifacts() -> Result<()> {
    let (_dir, config) = local_config()?;
    let chain = MemoryChain::new(config.network.chain_id);
    // The addresses file lands among the artifacts and isn't one.
    run_pipeline(&chain, &config, &default_actions(), &[]).await?;

    let sizes = sizes(&config)?;
    let names = sizes.iter().map(|size| size.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Multisig", "MultisigProxy"]);
    assert!(sizes.iter().all(|size| size.deployed_size == 10));
    assert!(sizes.iter().all(|size| size.deployed_size <= EIP170_LIMIT && !size.over_limit()));
    Ok(())
}
