use eyre::Result;
use multisig_deploy::{
    chain::{Chain, RpcChain},
    default_actions, run_pipeline, Credentials, DeployConfig, PathsConfig,
};
use test_utils::write_fixture_artifacts;

// Needs `anvil` on the path.
#[ignore]
#[tokio::test]
async fn test_deploys_to_anvil() -> Result<()> {
    // Set up the logger.
    tracing_subscriber::fmt::init();

    let dir = tempfile::tempdir()?;
    let config = DeployConfig::resolve(
        "hardhat",
        &Credentials::default(),
        PathsConfig::with_root(dir.path()),
    )?;
    write_fixture_artifacts(&config.paths.artifacts_dir())?;

    // The deterministic deployment proxy is bootstrapped on the fresh node and
    // both contracts land at their CREATE2 addresses.
    let chain = RpcChain::connect(&config.network).await?;
    let report = run_pipeline(&chain, &config, &default_actions(), &[]).await?;
    for contract in &report.deployed {
        assert!(contract.newly_deployed);
        assert!(!chain.get_code(contract.address).await?.is_empty());
    }

    // Running again against the same node deploys nothing.
    let rerun = run_pipeline(&chain, &config, &default_actions(), &[]).await?;
    assert_eq!(rerun.addresses(), report.addresses());
    assert!(rerun.deployed.iter().all(|contract| !contract.newly_deployed));

    Ok(())
}
