//! Error types for configuration, deployment, compilation and verification.
//!
//! Configuration errors are raised before anything touches a chain. The other
//! kinds carry the collaborator's message through unchanged.
use std::path::PathBuf;

use ethers::types::{Address, H256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown network `{0}`")]
    UnknownNetwork(String),
    #[error("could not find {variable} in env, unable to connect to network {network}")]
    MissingCredential {
        network: String,
        variable: &'static str,
    },
    #[error("invalid rpc url for network {network}: {reason}")]
    InvalidUrl { network: String, reason: String },
    #[error("invalid signer: {0}")]
    InvalidSigner(String),
    #[error("no deployment action is tagged `{0}`")]
    UnknownTag(String),
    #[error("network {network} expects chain id {expected} but the node reports {actual}")]
    ChainIdMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),
}

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("no artifact found for contract {0}")]
    ArtifactNotFound(String),
    #[error("failed to read artifact {name}: {reason}")]
    InvalidArtifact { name: String, reason: String },
    #[error("failed to encode constructor arguments for {contract}: {reason}")]
    Encoding { contract: String, reason: String },
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("transaction {tx_hash:?} deploying {contract} reverted")]
    Reverted { contract: String, tx_hash: H256 },
    #[error("transaction {0:?} didn't create a contract")]
    NoContractAddress(H256),
    #[error("no code at {address:?} after deploying {contract}")]
    MissingCode { contract: String, address: Address },
    #[error("deterministic deployment proxy is unavailable: {0}")]
    FactoryUnavailable(String),
    #[error("failed to start anvil: {0}")]
    NodeUnavailable(String),
    #[error("deployments for {network} were recorded on chain {recorded}, not chain {chain_id}")]
    StoreChainMismatch {
        network: String,
        recorded: u64,
        chain_id: u64,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid chain id in {}: {reason}", path.display())]
    InvalidChainId { path: PathBuf, reason: String },
    #[error("invalid deployment record {}: {reason}", path.display())]
    InvalidRecord { path: PathBuf, reason: String },
    #[error("failed to persist deployment: {0}")]
    Store(#[from] std::io::Error),
    #[error("failed to serialize deployment: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CompilationError {
    #[error("compiler error: {0}")]
    Solc(#[from] ethers_solc::error::SolcError),
    #[error("compilation failed:\n{0}")]
    Diagnostics(String),
    #[error("contract {0} is missing from the compiler output")]
    MissingContract(String),
    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize artifact: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("compiler task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("network {0} has no block explorer api")]
    Unsupported(String),
    #[error("no deployment of {contract} recorded on {network}")]
    NotDeployed { contract: String, network: String },
    #[error("explorer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("explorer rejected the request: {0}")]
    Rejected(String),
    #[error("verification is still pending after {0} checks")]
    Timeout(usize),
}

/// Any error the deployment tooling can surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Compilation(#[from] CompilationError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
