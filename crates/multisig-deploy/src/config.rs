/// This module builds the configuration that the rest of the crate consumes.
/// The process environment is read exactly once, by `Credentials::from_env`
/// and `PathsConfig::from_env`, and the resolved `DeployConfig` is passed by
/// reference from there on.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigurationError,
    network::{resolve_network, NetworkProfile},
};

/// Optional secrets read from the environment.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    pub infura_key: Option<String>,
    pub alchemy_api_key: Option<String>,
    pub mnemonic: Option<String>,
    pub pk: Option<String>,
    #[serde(alias = "etherscan_key")]
    pub etherscan_api_key: Option<String>,
}

impl Credentials {
    /// Reads the credentials from the environment after loading `.env` if one
    /// exists.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Ok(envy::from_env::<Credentials>()?)
    }

    /// Looks up a credential by its environment variable name. Empty values
    /// count as absent.
    pub fn get(&self, variable: &str) -> Option<&str> {
        let value = match variable {
            "INFURA_KEY" => self.infura_key.as_deref(),
            "ALCHEMY_API_KEY" => self.alchemy_api_key.as_deref(),
            "MNEMONIC" => self.mnemonic.as_deref(),
            "PK" => self.pk.as_deref(),
            "ETHERSCAN_API_KEY" => self.etherscan_api_key.as_deref(),
            _ => None,
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

// Never print secrets.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("infura_key", &redact(&self.infura_key))
            .field("alchemy_api_key", &redact(&self.alchemy_api_key))
            .field("mnemonic", &redact(&self.mnemonic))
            .field("pk", &redact(&self.pk))
            .field("etherscan_api_key", &redact(&self.etherscan_api_key))
            .finish()
    }
}

/// Project layout, read from `MULTISIG_*` environment variables.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub root: PathBuf,
    pub sources: PathBuf,
    pub artifacts: PathBuf,
    pub cache: PathBuf,
    pub deployments: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            sources: PathBuf::from("contracts"),
            artifacts: PathBuf::from("artifacts"),
            cache: PathBuf::from("cache"),
            deployments: PathBuf::from("deployments"),
        }
    }
}

impl PathsConfig {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Ok(envy::prefixed("MULTISIG_").from_env::<PathsConfig>()?)
    }

    /// A layout with the default directories under `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.root.join(&self.sources)
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join(&self.artifacts)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.cache)
    }

    pub fn deployments_dir(&self) -> PathBuf {
        self.root.join(&self.deployments)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: usize,
}

/// The solc settings the contracts were written against.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CompilerProfile {
    pub version: String,
    pub optimizer: OptimizerSettings,
}

impl Default for CompilerProfile {
    fn default() -> Self {
        Self {
            version: "0.7.6".to_string(),
            optimizer: OptimizerSettings {
                enabled: true,
                runs: 200,
            },
        }
    }
}

/// Everything a deployment run needs, resolved up front.
#[derive(Clone, Debug)]
pub struct DeployConfig {
    pub network: NetworkProfile,
    pub compiler: CompilerProfile,
    pub paths: PathsConfig,
    pub etherscan_api_key: Option<String>,
}

impl DeployConfig {
    /// Resolves the configuration for the named network. Fails before any
    /// network access if the network is unknown or its credentials are
    /// missing.
    pub fn resolve(
        network: &str,
        credentials: &Credentials,
        paths: PathsConfig,
    ) -> Result<Self, ConfigurationError> {
        let network = resolve_network(network, credentials)?;
        Ok(Self {
            network,
            compiler: CompilerProfile::default(),
            paths,
            etherscan_api_key: credentials.get("ETHERSCAN_API_KEY").map(str::to_string),
        })
    }
}
