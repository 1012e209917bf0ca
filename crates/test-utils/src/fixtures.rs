use std::path::Path;

use ethers::abi::Abi;
use eyre::Result;
use multisig_deploy::artifacts::{ArtifactStore, ContractArtifact, ARTIFACT_FORMAT};

/// Init code that returns a one word runtime. Real bytecode isn't needed since
/// `MemoryChain` never executes it.
pub const FIXTURE_BYTECODE: &str = "0x600a600c600039600a6000f3602a60005260206000f3";

const MULTISIG_ABI: &str = r#"[{
    "type": "constructor",
    "stateMutability": "nonpayable",
    "inputs": [
        { "name": "owners", "type": "address[]", "internalType": "address[]" },
        { "name": "threshold", "type": "uint256", "internalType": "uint256" },
        { "name": "fallbackHandler", "type": "address", "internalType": "address" },
        { "name": "setup", "type": "bytes", "internalType": "bytes" }
    ]
}]"#;

const MULTISIG_PROXY_ABI: &str = r#"[{
    "type": "constructor",
    "stateMutability": "payable",
    "inputs": [
        { "name": "logic", "type": "address", "internalType": "address" },
        { "name": "admin", "type": "address", "internalType": "address" },
        { "name": "data", "type": "bytes", "internalType": "bytes" }
    ]
}]"#;

pub fn fixture_artifact(contract_name: &str, abi: &str) -> Result<ContractArtifact> {
    Ok(ContractArtifact {
        format: ARTIFACT_FORMAT.to_string(),
        contract_name: contract_name.to_string(),
        source_name: format!("contracts/{}.sol", contract_name),
        abi: serde_json::from_str::<Abi>(abi)?,
        bytecode: FIXTURE_BYTECODE.parse()?,
        deployed_bytecode: "0x602a60005260206000f3".parse()?,
    })
}

/// Writes `Multisig` and `MultisigProxy` artifacts with the real constructor
/// signatures into `dir`.
pub fn write_fixture_artifacts(dir: &Path) -> Result<ArtifactStore> {
    let store = ArtifactStore::new(dir);
    store.write(&fixture_artifact("Multisig", MULTISIG_ABI)?)?;
    store.write(&fixture_artifact("MultisigProxy", MULTISIG_PROXY_ABI)?)?;
    Ok(store)
}
