/// This module deploys a single contract, either with a plain CREATE
/// transaction or deterministically through the CREATE2 deployment proxy.
///
/// Each deployment is submitted at most once. A deterministic deployment whose
/// address already holds code is a no-op, which is what makes re-running a
/// partially completed pipeline safe.
use ethers::{
    abi::Token,
    types::{Address, Bytes, TransactionReceipt, TransactionRequest, H256, U64},
    utils::{get_create2_address, keccak256},
};
use tracing::{debug, info};

use crate::{
    artifacts::{ArtifactStore, ContractArtifact},
    chain::Chain,
    constants::{
        DETERMINISTIC_DEPLOYMENT_PROXY, PROXY_DEPLOYER, PROXY_DEPLOYMENT_COST,
        PROXY_DEPLOYMENT_TX,
    },
    deployments::{DeploymentRecord, DeploymentStore},
    error::DeploymentError,
    network::NetworkProfile,
};

/// A request to deploy one contract.
#[derive(Clone, Debug, PartialEq)]
pub struct DeploymentSpec {
    pub contract_name: String,
    pub constructor_args: Vec<Token>,
    pub deployer: Address,
    /// Derive the address with CREATE2 instead of from the deployer's nonce.
    pub deterministic: bool,
    pub salt: H256,
}

impl DeploymentSpec {
    pub fn new(contract_name: impl Into<String>, deployer: Address) -> Self {
        Self {
            contract_name: contract_name.into(),
            constructor_args: vec![],
            deployer,
            deterministic: false,
            salt: H256::zero(),
        }
    }

    pub fn args(mut self, args: Vec<Token>) -> Self {
        self.constructor_args = args;
        self
    }

    pub fn deterministic(mut self, salt: H256) -> Self {
        self.deterministic = true;
        self.salt = salt;
        self
    }
}

/// The outcome of a deployment action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    pub name: String,
    pub address: Address,
    /// False when an existing deployment was reused.
    pub newly_deployed: bool,
    pub transaction_hash: Option<H256>,
}

/// Appends the ABI encoded constructor arguments to the artifact's bytecode.
/// Returns the init code and the encoded arguments.
pub fn encode_init_code(
    artifact: &ContractArtifact,
    args: &[Token],
) -> Result<(Bytes, Bytes), DeploymentError> {
    let encoding_error = |reason: String| DeploymentError::Encoding {
        contract: artifact.contract_name.clone(),
        reason,
    };
    let init_code = match artifact.abi.constructor() {
        Some(constructor) => constructor
            .encode_input(artifact.bytecode.to_vec(), args)
            .map_err(|e| encoding_error(e.to_string()))?,
        None if args.is_empty() => artifact.bytecode.to_vec(),
        None => {
            return Err(encoding_error(format!(
                "the contract has no constructor but {} arguments were given",
                args.len()
            )))
        }
    };
    let encoded_args = init_code[artifact.bytecode.len()..].to_vec();
    Ok((init_code.into(), encoded_args.into()))
}

/// The address the deployment proxy creates for the given salt and init code.
pub fn deterministic_address(salt: H256, init_code: &[u8]) -> Address {
    get_create2_address(*DETERMINISTIC_DEPLOYMENT_PROXY, salt.as_bytes(), init_code)
}

/// Runs deployment actions against one chain.
pub struct Deployer<'a, C: Chain + ?Sized> {
    chain: &'a C,
    profile: &'a NetworkProfile,
    artifacts: &'a ArtifactStore,
    store: &'a mut DeploymentStore,
}

impl<'a, C: Chain + ?Sized> Deployer<'a, C> {
    pub fn new(
        chain: &'a C,
        profile: &'a NetworkProfile,
        artifacts: &'a ArtifactStore,
        store: &'a mut DeploymentStore,
    ) -> Self {
        Self {
            chain,
            profile,
            artifacts,
            store,
        }
    }

    pub fn store(&mut self) -> &mut DeploymentStore {
        self.store
    }

    /// Deploys a contract and records it. Failures from the chain are
    /// returned as they are and nothing is retried.
    pub async fn deploy(
        &mut self,
        spec: &DeploymentSpec,
    ) -> Result<DeployedContract, DeploymentError> {
        let artifact = self.artifacts.load(&spec.contract_name)?;
        let (init_code, encoded_args) = encode_init_code(&artifact, &spec.constructor_args)?;
        debug!(
            contract = %spec.contract_name,
            network = %self.profile.name,
            init_code_hash = ?H256::from(keccak256(&init_code)),
            "prepared init code"
        );

        let deployed = if spec.deterministic {
            self.deploy_deterministic(spec, &init_code).await?
        } else {
            match self.reusable(spec, &artifact, &encoded_args).await? {
                Some(deployed) => deployed,
                None => self.deploy_create(spec, init_code).await?,
            }
        };

        if deployed.newly_deployed {
            info!(
                contract = %deployed.name,
                address = ?deployed.address,
                tx = ?deployed.transaction_hash,
                "deployed"
            );
        } else {
            info!(
                contract = %deployed.name,
                address = ?deployed.address,
                "reusing existing deployment"
            );
        }

        let previous_tx = self
            .store
            .get(&spec.contract_name)?
            .filter(|record| record.address == deployed.address)
            .and_then(|record| record.transaction_hash);
        self.store.save(
            &spec.contract_name,
            DeploymentRecord {
                address: deployed.address,
                abi: artifact.abi.clone(),
                args: spec.constructor_args.iter().map(Token::to_string).collect(),
                encoded_args,
                bytecode: artifact.bytecode.clone(),
                transaction_hash: deployed.transaction_hash.or(previous_tx),
                deterministic: spec.deterministic,
                salt: spec.deterministic.then_some(spec.salt),
            },
        )?;

        Ok(deployed)
    }

    async fn deploy_deterministic(
        &self,
        spec: &DeploymentSpec,
        init_code: &Bytes,
    ) -> Result<DeployedContract, DeploymentError> {
        self.ensure_deployment_proxy(spec.deployer).await?;

        let address = deterministic_address(spec.salt, init_code);
        if !self.chain.get_code(address).await?.is_empty() {
            return Ok(DeployedContract {
                name: spec.contract_name.clone(),
                address,
                newly_deployed: false,
                transaction_hash: None,
            });
        }

        let mut data = spec.salt.as_bytes().to_vec();
        data.extend_from_slice(init_code);
        let tx = TransactionRequest::new()
            .from(spec.deployer)
            .to(*DETERMINISTIC_DEPLOYMENT_PROXY)
            .data(data);
        let receipt = self.chain.send_transaction(tx.into()).await?;
        check_status(&spec.contract_name, &receipt)?;
        if self.chain.get_code(address).await?.is_empty() {
            return Err(DeploymentError::MissingCode {
                contract: spec.contract_name.clone(),
                address,
            });
        }

        Ok(DeployedContract {
            name: spec.contract_name.clone(),
            address,
            newly_deployed: true,
            transaction_hash: Some(receipt.transaction_hash),
        })
    }

    /// A non-deterministic deployment is reused when the stored record was
    /// built from the same bytecode and arguments and its code is still on
    /// chain.
    async fn reusable(
        &mut self,
        spec: &DeploymentSpec,
        artifact: &ContractArtifact,
        encoded_args: &Bytes,
    ) -> Result<Option<DeployedContract>, DeploymentError> {
        let Some(record) = self.store.get(&spec.contract_name)? else {
            return Ok(None);
        };
        if record.deterministic || !record.matches(&artifact.bytecode, encoded_args) {
            return Ok(None);
        }
        if self.chain.get_code(record.address).await?.is_empty() {
            return Ok(None);
        }
        Ok(Some(DeployedContract {
            name: spec.contract_name.clone(),
            address: record.address,
            newly_deployed: false,
            transaction_hash: None,
        }))
    }

    async fn deploy_create(
        &self,
        spec: &DeploymentSpec,
        init_code: Bytes,
    ) -> Result<DeployedContract, DeploymentError> {
        let tx = TransactionRequest::new().from(spec.deployer).data(init_code);
        let receipt = self.chain.send_transaction(tx.into()).await?;
        check_status(&spec.contract_name, &receipt)?;
        let address = receipt
            .contract_address
            .ok_or(DeploymentError::NoContractAddress(receipt.transaction_hash))?;
        Ok(DeployedContract {
            name: spec.contract_name.clone(),
            address,
            newly_deployed: true,
            transaction_hash: Some(receipt.transaction_hash),
        })
    }

    /// Deploys the CREATE2 proxy from its presigned transaction if the chain
    /// doesn't have it yet. The presigned transaction's sender is funded by the
    /// deployer first.
    async fn ensure_deployment_proxy(&self, funder: Address) -> Result<(), DeploymentError> {
        if !self
            .chain
            .get_code(*DETERMINISTIC_DEPLOYMENT_PROXY)
            .await?
            .is_empty()
        {
            return Ok(());
        }
        info!(network = %self.profile.name, "deploying the deterministic deployment proxy");

        let balance = self.chain.get_balance(*PROXY_DEPLOYER).await?;
        if balance < *PROXY_DEPLOYMENT_COST {
            let tx = TransactionRequest::new()
                .from(funder)
                .to(*PROXY_DEPLOYER)
                .value(*PROXY_DEPLOYMENT_COST - balance);
            let receipt = self.chain.send_transaction(tx.into()).await?;
            check_status("DeterministicDeploymentProxy", &receipt)?;
        }

        let receipt = self
            .chain
            .send_raw_transaction(PROXY_DEPLOYMENT_TX.clone())
            .await
            .map_err(|e| DeploymentError::FactoryUnavailable(e.to_string()))?;
        check_status("DeterministicDeploymentProxy", &receipt)?;
        if self
            .chain
            .get_code(*DETERMINISTIC_DEPLOYMENT_PROXY)
            .await?
            .is_empty()
        {
            return Err(DeploymentError::FactoryUnavailable(
                "no code at the proxy address after its deployment".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_status(contract: &str, receipt: &TransactionReceipt) -> Result<(), DeploymentError> {
    // Pre-byzantium receipts don't have a status.
    if receipt.status == Some(U64::zero()) {
        return Err(DeploymentError::Reverted {
            contract: contract.to_string(),
            tx_hash: receipt.transaction_hash,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ethers::abi::{Abi, Constructor, Param, ParamType};
    use eyre::Result;

    use super::*;

    fn artifact(constructor: Option<Constructor>) -> ContractArtifact {
        let mut abi = Abi::default();
        abi.constructor = constructor;
        ContractArtifact {
            format: String::new(),
            contract_name: "Multisig".to_string(),
            source_name: "contracts/Multisig.sol".to_string(),
            abi,
            bytecode: vec![0x60, 0x00, 0x60, 0x00, 0xf3].into(),
            deployed_bytecode: Bytes::default(),
        }
    }

    fn threshold_constructor() -> Constructor {
        Constructor {
            inputs: vec![Param {
                name: "threshold".to_string(),
                kind: ParamType::Uint(256),
                internal_type: None,
            }],
        }
    }

    #[test]
    fn test_encode_init_code_appends_args() -> Result<()> {
        let artifact = artifact(Some(threshold_constructor()));
        let (init_code, encoded_args) =
            encode_init_code(&artifact, &[Token::Uint(1u64.into())])?;
        assert_eq!(encoded_args.len(), 32);
        assert_eq!(encoded_args[31], 1);
        assert_eq!(&init_code[..5], &artifact.bytecode[..]);
        assert_eq!(&init_code[5..], &encoded_args[..]);
        Ok(())
    }

    #[test]
    fn test_encode_init_code_rejects_wrong_args() {
        let artifact = artifact(Some(threshold_constructor()));
        let err = encode_init_code(&artifact, &[Token::Bool(true)]).unwrap_err();
        assert!(matches!(err, DeploymentError::Encoding { .. }));

        let artifact = self::artifact(None);
        let err = encode_init_code(&artifact, &[Token::Bool(true)]).unwrap_err();
        assert!(matches!(err, DeploymentError::Encoding { .. }));
    }

    #[test]
    fn test_encode_init_code_without_constructor() -> Result<()> {
        let artifact = artifact(None);
        let (init_code, encoded_args) = encode_init_code(&artifact, &[])?;
        assert_eq!(init_code, artifact.bytecode);
        assert!(encoded_args.is_empty());
        Ok(())
    }

    #[test]
    fn test_deterministic_address() -> Result<()> {
        // EIP-1014 example 0.
        assert_eq!(
            get_create2_address(Address::zero(), [0u8; 32], [0x00u8]),
            "0x4D1A2e2bB4F88F0250f26Ffff098B0b30B26BF38".parse::<Address>()?
        );

        let address = deterministic_address(H256::zero(), &[0x00]);
        assert_eq!(
            address,
            get_create2_address(*DETERMINISTIC_DEPLOYMENT_PROXY, [0u8; 32], [0x00u8])
        );
        assert_eq!(address, deterministic_address(H256::zero(), &[0x00]));
        assert_ne!(address, deterministic_address(H256::repeat_byte(1), &[0x00]));
        assert_ne!(address, deterministic_address(H256::zero(), &[0x01]));
        Ok(())
    }

    #[test]
    fn test_spec_builder() {
        let deployer = Address::from_low_u64_be(1);
        let spec = DeploymentSpec::new("Multisig", deployer)
            .args(vec![Token::Uint(1u64.into())])
            .deterministic(H256::repeat_byte(2));
        assert!(spec.deterministic);
        assert_eq!(spec.salt, H256::repeat_byte(2));
        assert_eq!(spec.constructor_args.len(), 1);
        assert!(!DeploymentSpec::new("Multisig", deployer).deterministic);
    }
}
