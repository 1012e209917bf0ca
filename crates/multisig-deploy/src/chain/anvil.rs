/// Helpers for the in-memory network, which is an anvil node that lives as long
/// as the run.
use ethers::{
    providers::{JsonRpcClient, Middleware, Provider},
    types::{Address, U256},
    utils::{Anvil, AnvilInstance},
};

use crate::{error::DeploymentError, network::NetworkProfile};

/// Spawns anvil with the profile's chain id and gas settings. Anvil picks a
/// free port, so the profile's url is only nominal for ephemeral networks.
pub(super) fn spawn(profile: &NetworkProfile) -> Result<AnvilInstance, DeploymentError> {
    spawn_with(Anvil::new(), profile)
}

fn spawn_with(anvil: Anvil, profile: &NetworkProfile) -> Result<AnvilInstance, DeploymentError> {
    let mut anvil = anvil.chain_id(profile.chain_id);
    if let Some(block_gas_limit) = profile.gas.block_gas_limit {
        anvil = anvil
            .arg("--gas-limit")
            .arg(block_gas_limit.to_string());
    }
    if profile.gas.allow_unlimited_contract_size {
        anvil = anvil.arg("--disable-code-size-limit");
    }
    anvil
        .try_spawn()
        .map_err(|e| DeploymentError::NodeUnavailable(e.to_string()))
}

/// Tops the account up to 10,000 ether.
pub(super) async fn deal<P: JsonRpcClient>(
    provider: &Provider<P>,
    address: Address,
) -> Result<(), DeploymentError> {
    let balance = provider
        .get_balance(address, None)
        .await
        .map_err(|e| DeploymentError::Rpc(e.to_string()))?;
    let target = U256::exp10(22);
    if balance < target {
        provider
            .request::<(Address, U256), ()>("anvil_setBalance", (address, target))
            .await
            .map_err(|e| DeploymentError::Rpc(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use eyre::Result;

    use super::*;
    use crate::{config::Credentials, network::resolve_network};

    #[test]
    fn test_missing_anvil_is_an_error() -> Result<()> {
        let profile = resolve_network("hardhat", &Credentials::default())?;
        let err = spawn_with(Anvil::at("/nonexistent/bin/anvil"), &profile).unwrap_err();
        assert!(matches!(err, DeploymentError::NodeUnavailable(_)));
        Ok(())
    }
}
