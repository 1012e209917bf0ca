/// Compiled contract artifacts in the hardhat layout:
/// `<artifacts>/<source name>/<Contract>.json`.
use std::{
    fs,
    path::{Path, PathBuf},
};

use ethers::{abi::Abi, types::Bytes};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DeploymentError;

pub const ARTIFACT_FORMAT: &str = "hh-sol-artifact-1";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    #[serde(rename = "_format", default)]
    pub format: String,
    pub contract_name: String,
    #[serde(default)]
    pub source_name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
    #[serde(default)]
    pub deployed_bytecode: Bytes,
}

/// Reads and writes the artifacts directory.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads the artifact of the named contract.
    pub fn load(&self, contract_name: &str) -> Result<ContractArtifact, DeploymentError> {
        let path = self
            .find(contract_name)?
            .ok_or_else(|| DeploymentError::ArtifactNotFound(contract_name.to_string()))?;
        let invalid = |reason: String| DeploymentError::InvalidArtifact {
            name: contract_name.to_string(),
            reason,
        };
        let contents = fs::read_to_string(&path).map_err(|e| invalid(e.to_string()))?;
        let artifact: ContractArtifact =
            serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
        if artifact.bytecode.is_empty() {
            return Err(invalid(
                "artifact has no bytecode (abstract contract or interface?)".to_string(),
            ));
        }
        Ok(artifact)
    }

    /// Every artifact under the root. Debug files, build info and other json
    /// that isn't an artifact (such as the addresses file) are skipped.
    pub fn all(&self) -> Result<Vec<ContractArtifact>, DeploymentError> {
        let mut paths = vec![];
        if self.root.exists() {
            collect_artifacts(&self.root, &mut paths)?;
        }
        let mut artifacts = vec![];
        for path in paths {
            let contents = fs::read_to_string(&path).map_err(|source| DeploymentError::Read {
                path: path.clone(),
                source,
            })?;
            match serde_json::from_str::<ContractArtifact>(&contents) {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => debug!(path = %path.display(), error = %e, "not an artifact"),
            }
        }
        Ok(artifacts)
    }

    /// Writes an artifact next to the other artifacts of its source file and
    /// returns the path it was written to.
    pub fn write(&self, artifact: &ContractArtifact) -> std::io::Result<PathBuf> {
        let dir = self.root.join(&artifact.source_name);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", artifact.contract_name));
        fs::write(&path, serde_json::to_string_pretty(artifact)?)?;
        Ok(path)
    }

    fn find(&self, contract_name: &str) -> Result<Option<PathBuf>, DeploymentError> {
        if !self.root.exists() {
            return Ok(None);
        }
        find_artifact(&self.root, &format!("{}.json", contract_name))
    }
}

fn read_sorted(dir: &Path) -> Result<Vec<PathBuf>, DeploymentError> {
    let read_error = |source| DeploymentError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = fs::read_dir(dir)
        .map_err(read_error)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error)?;
    // Keep the walk order stable across platforms.
    paths.sort();
    Ok(paths)
}

fn is_build_info(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some("build-info")
}

fn collect_artifacts(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), DeploymentError> {
    for path in read_sorted(dir)? {
        if path.is_dir() {
            if !is_build_info(&path) {
                collect_artifacts(&path, paths)?;
            }
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.ends_with(".json") && !name.ends_with(".dbg.json") {
            paths.push(path);
        }
    }
    Ok(())
}

fn find_artifact(dir: &Path, file_name: &str) -> Result<Option<PathBuf>, DeploymentError> {
    for path in read_sorted(dir)? {
        if path.is_file() {
            if path.file_name().and_then(|n| n.to_str()) == Some(file_name) {
                return Ok(Some(path));
            }
        } else if !is_build_info(&path) {
            if let Some(found) = find_artifact(&path, file_name)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}
