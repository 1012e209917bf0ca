//! Deployment tooling for the multisig contracts.
//!
//! A run resolves a named network into a `NetworkProfile`, connects to it
//! with the deployer's key, and executes the selected `DeployAction`s in
//! order. Deterministic actions go through the CREATE2 deployment proxy, so
//! the same contract and arguments land at the same address on every chain.

#[macro_use]
extern crate lazy_static;

pub mod actions;
pub mod artifacts;
pub mod chain;
pub mod compile;
pub mod config;
pub mod constants;
pub mod deploy;
pub mod deployments;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod signing;
pub mod size;
pub mod verify;

pub use actions::{default_actions, select_actions, DeployAction};
pub use chain::{Chain, RpcChain};
pub use config::{Credentials, DeployConfig, PathsConfig};
pub use deploy::{DeployedContract, Deployer, DeploymentSpec};
pub use error::{
    CompilationError, ConfigurationError, DeploymentError, Error, Result, VerificationError,
};
pub use network::{known_networks, resolve_network, NetworkProfile};
pub use pipeline::{run_pipeline, Report};
pub use signing::{resolve_signing, SigningMaterial};
pub use size::{contract_sizes, ContractSize, EIP170_LIMIT};
