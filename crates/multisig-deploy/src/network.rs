/// The table of networks the tooling knows how to reach, and the resolution of
/// a network name into a `NetworkProfile`.
use reqwest::Url;

use crate::{
    config::Credentials,
    error::ConfigurationError,
    signing::{resolve_signing, SigningMaterial},
};

/// Gas settings that only apply to some chains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasParams {
    /// A fixed gas limit for every transaction.
    pub gas: Option<u64>,
    pub block_gas_limit: Option<u64>,
    pub allow_unlimited_contract_size: bool,
}

/// A fully resolved network.
#[derive(Clone, Debug)]
pub struct NetworkProfile {
    pub name: String,
    pub url: Url,
    pub chain_id: u64,
    pub signing: SigningMaterial,
    pub gas: GasParams,
    /// Ephemeral networks are spun up for the run and thrown away afterwards.
    pub ephemeral: bool,
    /// The Etherscan-style API used to verify contracts, if the network has
    /// one.
    pub explorer_api: Option<Url>,
}

/// A row of the network table. `{key}` in the url is replaced by the value of
/// the credential the network requires.
#[derive(Clone, Copy, Debug)]
pub struct KnownNetwork {
    pub name: &'static str,
    pub url: &'static str,
    pub chain_id: u64,
    pub credential: Option<&'static str>,
    pub explorer_api: Option<&'static str>,
    pub ephemeral: bool,
}

const HARDHAT_GAS: GasParams = GasParams {
    gas: Some(100_000_000),
    block_gas_limit: Some(100_000_000),
    allow_unlimited_contract_size: true,
};

const NETWORKS: &[KnownNetwork] = &[
    KnownNetwork {
        name: "hardhat",
        url: "http://127.0.0.1:8545",
        chain_id: 31337,
        credential: None,
        explorer_api: None,
        ephemeral: true,
    },
    KnownNetwork {
        name: "local",
        url: "http://127.0.0.1:8545",
        chain_id: 31337,
        credential: None,
        explorer_api: None,
        ephemeral: false,
    },
    KnownNetwork {
        name: "mainnet",
        url: "https://mainnet.infura.io/v3/{key}",
        chain_id: 1,
        credential: Some("INFURA_KEY"),
        explorer_api: Some("https://api.etherscan.io/api"),
        ephemeral: false,
    },
    KnownNetwork {
        name: "rinkeby",
        url: "https://rinkeby.infura.io/v3/{key}",
        chain_id: 4,
        credential: Some("INFURA_KEY"),
        explorer_api: Some("https://api-rinkeby.etherscan.io/api"),
        ephemeral: false,
    },
    KnownNetwork {
        name: "goerli",
        url: "https://goerli.infura.io/v3/{key}",
        chain_id: 5,
        credential: Some("INFURA_KEY"),
        explorer_api: Some("https://api-goerli.etherscan.io/api"),
        ephemeral: false,
    },
    KnownNetwork {
        name: "kovan",
        url: "https://kovan.infura.io/v3/{key}",
        chain_id: 42,
        credential: Some("INFURA_KEY"),
        explorer_api: Some("https://api-kovan.etherscan.io/api"),
        ephemeral: false,
    },
    KnownNetwork {
        name: "ethMainnet",
        url: "https://eth-mainnet.g.alchemy.com/v2/{key}",
        chain_id: 1,
        credential: Some("ALCHEMY_API_KEY"),
        explorer_api: Some("https://api.etherscan.io/api"),
        ephemeral: false,
    },
    KnownNetwork {
        name: "xdai",
        url: "https://xdai.poanetwork.dev",
        chain_id: 100,
        credential: None,
        explorer_api: None,
        ephemeral: false,
    },
    KnownNetwork {
        name: "ewc",
        url: "https://rpc.energyweb.org",
        chain_id: 246,
        credential: None,
        explorer_api: None,
        ephemeral: false,
    },
    KnownNetwork {
        name: "volta",
        url: "https://volta-rpc.energyweb.org",
        chain_id: 73799,
        credential: None,
        explorer_api: None,
        ephemeral: false,
    },
    KnownNetwork {
        name: "bscmainnet",
        url: "https://rpc.ankr.com/bsc",
        chain_id: 56,
        credential: None,
        explorer_api: Some("https://api.bscscan.com/api"),
        ephemeral: false,
    },
    KnownNetwork {
        name: "bsctestnet",
        url: "https://rpc.ankr.com/bsc_testnet_chapel",
        chain_id: 97,
        credential: None,
        explorer_api: Some("https://api-testnet.bscscan.com/api"),
        ephemeral: false,
    },
    KnownNetwork {
        name: "polygonMainnet",
        url: "https://rpc.ankr.com/polygon",
        chain_id: 137,
        credential: None,
        explorer_api: Some("https://api.polygonscan.com/api"),
        ephemeral: false,
    },
];

/// Lists every network that `resolve_network` accepts.
pub fn known_networks() -> &'static [KnownNetwork] {
    NETWORKS
}

/// Resolves a network name into a profile. This never touches the network:
/// unknown names and missing credentials fail immediately.
pub fn resolve_network(
    name: &str,
    credentials: &Credentials,
) -> Result<NetworkProfile, ConfigurationError> {
    let known = NETWORKS
        .iter()
        .find(|n| n.name == name)
        .ok_or_else(|| ConfigurationError::UnknownNetwork(name.to_string()))?;

    let url = match known.credential {
        Some(variable) => {
            let key = credentials.get(variable).ok_or_else(|| {
                ConfigurationError::MissingCredential {
                    network: name.to_string(),
                    variable,
                }
            })?;
            known.url.replace("{key}", key)
        }
        None => known.url.to_string(),
    };
    let url = parse_url(name, &url)?;
    let explorer_api = known
        .explorer_api
        .map(|api| parse_url(name, api))
        .transpose()?;

    Ok(NetworkProfile {
        name: known.name.to_string(),
        url,
        chain_id: known.chain_id,
        signing: resolve_signing(credentials),
        gas: if known.ephemeral {
            HARDHAT_GAS
        } else {
            GasParams::default()
        },
        ephemeral: known.ephemeral,
        explorer_api,
    })
}

fn parse_url(network: &str, url: &str) -> Result<Url, ConfigurationError> {
    Url::parse(url).map_err(|e| ConfigurationError::InvalidUrl {
        network: network.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use eyre::Result;

    use super::*;
    use crate::constants::DEFAULT_MNEMONIC;

    fn all_credentials() -> Credentials {
        Credentials {
            infura_key: Some("infura".to_string()),
            alchemy_api_key: Some("alchemy".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_every_network_resolves_to_a_url() -> Result<()> {
        let credentials = all_credentials();
        for network in known_networks() {
            let profile = resolve_network(network.name, &credentials)?;
            assert_eq!(profile.name, network.name);
            assert!(matches!(profile.url.scheme(), "http" | "https"));
            assert!(profile.url.host_str().is_some());
            assert!(!profile.url.as_str().contains("{key}"));
        }
        Ok(())
    }

    #[test]
    fn test_local_network() -> Result<()> {
        let profile = resolve_network("local", &Credentials::default())?;
        assert_eq!(profile.url.as_str(), "http://127.0.0.1:8545/");
        assert_eq!(profile.url.port(), Some(8545));
        assert_eq!(
            profile.signing,
            SigningMaterial::Mnemonic(DEFAULT_MNEMONIC.to_string())
        );
        assert!(!profile.ephemeral);
        assert_eq!(profile.gas, GasParams::default());
        Ok(())
    }

    #[test]
    fn test_hardhat_network_is_ephemeral() -> Result<()> {
        let profile = resolve_network("hardhat", &Credentials::default())?;
        assert!(profile.ephemeral);
        assert_eq!(profile.chain_id, 31337);
        assert_eq!(profile.gas.gas, Some(100_000_000));
        assert_eq!(profile.gas.block_gas_limit, Some(100_000_000));
        assert!(profile.gas.allow_unlimited_contract_size);
        Ok(())
    }

    #[test]
    fn test_mainnet_requires_infura_key() {
        let err = resolve_network("mainnet", &Credentials::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingCredential {
                variable: "INFURA_KEY",
                ..
            }
        ));
        for name in ["rinkeby", "kovan", "goerli"] {
            assert!(matches!(
                resolve_network(name, &Credentials::default()),
                Err(ConfigurationError::MissingCredential { .. })
            ));
        }
    }

    #[test]
    fn test_infura_key_is_substituted() -> Result<()> {
        let profile = resolve_network("goerli", &all_credentials())?;
        assert_eq!(profile.url.as_str(), "https://goerli.infura.io/v3/infura");
        assert_eq!(profile.chain_id, 5);
        assert!(profile.explorer_api.is_some());
        Ok(())
    }

    #[test]
    fn test_unknown_network() {
        let err = resolve_network("moonbase", &all_credentials()).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownNetwork(name) if name == "moonbase"));
    }
}
