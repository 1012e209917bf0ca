/// Deployed bytecode sizes of the compiled contracts, checked against the
/// EIP-170 limit that mainnet enforces on contract code.
use std::fmt;

use crate::{artifacts::ArtifactStore, error::DeploymentError};

/// The largest runtime code, in bytes, a contract may have.
pub const EIP170_LIMIT: usize = 24_576;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractSize {
    pub name: String,
    pub deployed_size: usize,
}

impl ContractSize {
    pub fn over_limit(&self) -> bool {
        self.deployed_size > EIP170_LIMIT
    }
}

/// The size of every deployable artifact, sorted by contract name. Interfaces
/// and abstract contracts have no runtime code and are left out.
pub fn contract_sizes(artifacts: &ArtifactStore) -> Result<Vec<ContractSize>, DeploymentError> {
    let mut sizes = artifacts
        .all()?
        .into_iter()
        .filter(|artifact| !artifact.deployed_bytecode.is_empty())
        .map(|artifact| ContractSize {
            name: artifact.contract_name,
            deployed_size: artifact.deployed_bytecode.len(),
        })
        .collect::<Vec<_>>();
    sizes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sizes)
}

/// A printable table of contract sizes.
pub struct SizeTable<'a>(pub &'a [ContractSize]);

impl fmt::Display for SizeTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .0
            .iter()
            .map(|size| size.name.len())
            .max()
            .unwrap_or_default()
            .max("Contract".len());
        writeln!(f, "{:<width$}  Size (KiB)", "Contract")?;
        for size in self.0 {
            writeln!(
                f,
                "{:<width$}  {:>10.3}{}",
                size.name,
                size.deployed_size as f64 / 1024.0,
                if size.over_limit() { "  over limit" } else { "" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ethers::{abi::Abi, types::Bytes};
    use eyre::Result;

    use super::*;
    use crate::artifacts::ContractArtifact;

    fn artifact(name: &str, deployed_size: usize) -> ContractArtifact {
        ContractArtifact {
            format: crate::artifacts::ARTIFACT_FORMAT.to_string(),
            contract_name: name.to_string(),
            source_name: format!("contracts/{}.sol", name),
            abi: Abi::default(),
            bytecode: Bytes::from(vec![0x60; deployed_size + 12]),
            deployed_bytecode: Bytes::from(vec![0x60; deployed_size]),
        }
    }

    #[test]
    fn test_sizes_are_sorted_and_checked() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ArtifactStore::new(dir.path());
        store.write(&artifact("Vault", EIP170_LIMIT + 1))?;
        store.write(&artifact("Multisig", 100))?;
        store.write(&artifact("Limit", EIP170_LIMIT))?;
        store.write(&artifact("IMultisig", 0))?;

        let sizes = contract_sizes(&store)?;
        let names = sizes.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Limit", "Multisig", "Vault"]);
        assert!(!sizes[0].over_limit());
        assert!(!sizes[1].over_limit());
        assert!(sizes[2].over_limit());

        let table = SizeTable(&sizes).to_string();
        assert_eq!(table.lines().count(), 4);
        assert!(table.lines().last().unwrap().ends_with("over limit"));
        assert_eq!(table.matches("over limit").count(), 1);
        Ok(())
    }
}
