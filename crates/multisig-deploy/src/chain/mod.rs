mod anvil;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use ethers::{
    middleware::{NonceManagerMiddleware, SignerMiddleware},
    providers::{
        Http, HttpRateLimitRetryPolicy, Middleware, PendingTransaction, Provider, RetryClient,
        RetryClientBuilder,
    },
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, TransactionReceipt, H256, U256,
    },
    utils::AnvilInstance,
};
use tracing::{debug, info};

use crate::{
    error::{ConfigurationError, DeploymentError, Error},
    network::NetworkProfile,
};

/// The operations the deployer needs from a chain. Every transaction is signed
/// by the deployer account and awaited until it has a receipt.
#[async_trait]
pub trait Chain: Send + Sync {
    /// The address that signs and pays for transactions.
    fn deployer(&self) -> Address;

    async fn chain_id(&self) -> Result<u64, DeploymentError>;

    async fn get_code(&self, address: Address) -> Result<Bytes, DeploymentError>;

    async fn get_balance(&self, address: Address) -> Result<U256, DeploymentError>;

    /// Signs and submits a transaction once and waits for its receipt.
    async fn send_transaction(
        &self,
        tx: TypedTransaction,
    ) -> Result<TransactionReceipt, DeploymentError>;

    /// Submits an already signed transaction once and waits for its receipt.
    async fn send_raw_transaction(&self, tx: Bytes)
        -> Result<TransactionReceipt, DeploymentError>;
}

type ChainClient =
    NonceManagerMiddleware<SignerMiddleware<Provider<Arc<RetryClient<Http>>>, LocalWallet>>;

fn rpc_error<E: std::fmt::Display>(error: E) -> DeploymentError {
    DeploymentError::Rpc(error.to_string())
}

/// A chain reached over JSON-RPC with the deployer's key.
pub struct RpcChain {
    client: Arc<ChainClient>,
    address: Address,
    gas: Option<u64>,
    _maybe_anvil: Option<AnvilInstance>,
}

impl RpcChain {
    /// Connects to the profile's network. Ephemeral networks get a fresh anvil
    /// node that funds the deployer. The node's chain id has to match the
    /// profile before anything is signed.
    pub async fn connect(profile: &NetworkProfile) -> Result<Self, Error> {
        let (url, maybe_anvil) = if profile.ephemeral {
            let anvil = anvil::spawn(profile)?;
            (anvil.endpoint(), Some(anvil))
        } else {
            (profile.url.to_string(), None)
        };

        // Only rate limited requests are retried. Those were never processed
        // by the node, so a deployment can't be submitted twice.
        let provider =
            Provider::<Http>::try_from(url.as_str()).map_err(|e| ConfigurationError::InvalidUrl {
                network: profile.name.clone(),
                reason: e.to_string(),
            })?;
        let provider = RetryClientBuilder::default()
            .rate_limit_retries(10)
            .timeout_retries(0)
            .initial_backoff(Duration::from_millis(500))
            .build(
                provider.as_ref().clone(),
                Box::<HttpRateLimitRetryPolicy>::default(),
            );
        let provider = Provider::new(Arc::new(provider)).interval(Duration::from_millis(
            if profile.ephemeral { 10 } else { 2_000 },
        ));

        let chain_id = provider.get_chainid().await.map_err(rpc_error)?.as_u64();
        if chain_id != profile.chain_id {
            return Err(ConfigurationError::ChainIdMismatch {
                network: profile.name.clone(),
                expected: profile.chain_id,
                actual: chain_id,
            }
            .into());
        }

        let signer = profile.signing.deployer(chain_id)?;
        let address = signer.address();
        if maybe_anvil.is_some() {
            anvil::deal(&provider, address).await?;
        }
        let client = NonceManagerMiddleware::new(SignerMiddleware::new(provider, signer), address);
        info!(network = %profile.name, chain_id, deployer = ?address, "connected");

        Ok(Self {
            client: Arc::new(client),
            address,
            gas: profile.gas.gas,
            _maybe_anvil: maybe_anvil,
        })
    }

    async fn wait(
        &self,
        pending: PendingTransaction<'_, Arc<RetryClient<Http>>>,
    ) -> Result<TransactionReceipt, DeploymentError> {
        let tx_hash: H256 = pending.tx_hash();
        debug!(?tx_hash, "waiting for receipt");
        pending
            .await
            .map_err(rpc_error)?
            .ok_or_else(|| DeploymentError::Rpc(format!("transaction {:?} was dropped", tx_hash)))
    }
}

#[async_trait]
impl Chain for RpcChain {
    fn deployer(&self) -> Address {
        self.address
    }

    async fn chain_id(&self) -> Result<u64, DeploymentError> {
        Ok(self.client.get_chainid().await.map_err(rpc_error)?.as_u64())
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, DeploymentError> {
        self.client.get_code(address, None).await.map_err(rpc_error)
    }

    async fn get_balance(&self, address: Address) -> Result<U256, DeploymentError> {
        self.client
            .get_balance(address, None)
            .await
            .map_err(rpc_error)
    }

    async fn send_transaction(
        &self,
        mut tx: TypedTransaction,
    ) -> Result<TransactionReceipt, DeploymentError> {
        if let (Some(gas), None) = (self.gas, tx.gas()) {
            tx.set_gas(gas);
        }
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(rpc_error)?;
        self.wait(pending).await
    }

    async fn send_raw_transaction(
        &self,
        tx: Bytes,
    ) -> Result<TransactionReceipt, DeploymentError> {
        let pending = self
            .client
            .send_raw_transaction(tx)
            .await
            .map_err(rpc_error)?;
        self.wait(pending).await
    }
}
