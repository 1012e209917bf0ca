/// Records of past deployments, kept per network under
/// `<deployments>/<network>/<Contract>.json` alongside a `.chainId` file.
/// Ephemeral networks keep their records in memory only.
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use ethers::{
    abi::Abi,
    types::{Address, Bytes, H256},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{constants::CHAIN_ID_FILE, error::DeploymentError};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub address: Address,
    pub abi: Abi,
    /// The constructor arguments, human readable.
    pub args: Vec<String>,
    pub encoded_args: Bytes,
    pub bytecode: Bytes,
    pub transaction_hash: Option<H256>,
    pub deterministic: bool,
    pub salt: Option<H256>,
}

impl DeploymentRecord {
    /// Whether this record was produced from the same bytecode and
    /// constructor arguments.
    pub fn matches(&self, bytecode: &Bytes, encoded_args: &Bytes) -> bool {
        &self.bytecode == bytecode && &self.encoded_args == encoded_args
    }
}

#[derive(Debug)]
pub struct DeploymentStore {
    network: String,
    dir: Option<PathBuf>,
    records: BTreeMap<String, DeploymentRecord>,
}

impl DeploymentStore {
    /// Opens the store of a network, creating its directory if needed. Fails
    /// if the directory holds deployments from a different chain.
    pub fn open(root: &Path, network: &str, chain_id: u64) -> Result<Self, DeploymentError> {
        let dir = root.join(network);
        fs::create_dir_all(&dir)?;
        let chain_id_file = dir.join(CHAIN_ID_FILE);
        if chain_id_file.exists() {
            let recorded =
                fs::read_to_string(&chain_id_file).map_err(|source| DeploymentError::Read {
                    path: chain_id_file.clone(),
                    source,
                })?;
            let recorded = recorded.trim().parse::<u64>().map_err(|e| {
                DeploymentError::InvalidChainId {
                    path: chain_id_file.clone(),
                    reason: e.to_string(),
                }
            })?;
            if recorded != chain_id {
                return Err(DeploymentError::StoreChainMismatch {
                    network: network.to_string(),
                    recorded,
                    chain_id,
                });
            }
        } else {
            fs::write(&chain_id_file, chain_id.to_string())?;
        }
        Ok(Self {
            network: network.to_string(),
            dir: Some(dir),
            records: BTreeMap::new(),
        })
    }

    /// A store that doesn't outlive the process.
    pub fn in_memory(network: &str) -> Self {
        Self {
            network: network.to_string(),
            dir: None,
            records: BTreeMap::new(),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn get(
        &mut self,
        contract_name: &str,
    ) -> Result<Option<DeploymentRecord>, DeploymentError> {
        if let Some(record) = self.records.get(contract_name) {
            return Ok(Some(record.clone()));
        }
        let Some(path) = self.path(contract_name) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(|source| DeploymentError::Read {
            path: path.clone(),
            source,
        })?;
        let record: DeploymentRecord =
            serde_json::from_str(&contents).map_err(|e| DeploymentError::InvalidRecord {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        self.records
            .insert(contract_name.to_string(), record.clone());
        Ok(Some(record))
    }

    pub fn save(
        &mut self,
        contract_name: &str,
        record: DeploymentRecord,
    ) -> Result<(), DeploymentError> {
        if let Some(path) = self.path(contract_name) {
            fs::write(&path, serde_json::to_string_pretty(&record)?)?;
            debug!(path = %path.display(), "saved deployment");
        }
        self.records.insert(contract_name.to_string(), record);
        Ok(())
    }

    fn path(&self, contract_name: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", contract_name)))
    }
}
