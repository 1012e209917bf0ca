use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use ethers::{
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, NameOrAddress, TransactionReceipt,
        H256, U256, U64,
    },
    utils::{get_contract_address, get_create2_address, keccak256},
};
use multisig_deploy::{
    constants::{
        DETERMINISTIC_DEPLOYMENT_PROXY, PROXY_DEPLOYER, PROXY_DEPLOYMENT_COST,
        PROXY_DEPLOYMENT_TX,
    },
    Chain, DeploymentError,
};

lazy_static! {
    // Stands in for the proxy's runtime code. Only its presence matters.
    static ref PROXY_RUNTIME: Bytes = Bytes::from(vec![0x60, 0x00, 0x60, 0x00, 0xf3]);
}

#[derive(Debug, Default)]
struct State {
    code: HashMap<Address, Bytes>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    transactions: Vec<H256>,
    reject_after: Option<usize>,
}

/// An in-process chain for tests. Contract creation stores the init code as
/// the contract's code instead of running it, and calls to the deterministic
/// deployment proxy behave like CREATE2. Every `Chain` call is counted.
#[derive(Debug)]
pub struct MemoryChain {
    chain_id: u64,
    deployer: Address,
    state: Mutex<State>,
    calls: AtomicUsize,
}

impl MemoryChain {
    pub fn new(chain_id: u64) -> Self {
        let deployer = Address::from_low_u64_be(0xd3_9107);
        let mut state = State::default();
        state.balances.insert(deployer, U256::exp10(22));
        Self {
            chain_id,
            deployer,
            state: Mutex::new(state),
            calls: AtomicUsize::new(0),
        }
    }

    /// The number of `Chain` methods called so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The hashes of every accepted transaction, in order.
    pub fn transactions(&self) -> Vec<H256> {
        self.state.lock().unwrap().transactions.clone()
    }

    pub fn code_at(&self, address: Address) -> Bytes {
        self.state
            .lock()
            .unwrap()
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes the node reject every transaction after the first `count`.
    pub fn reject_transactions_after(&self, count: usize) {
        self.state.lock().unwrap().reject_after = Some(count);
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn receipt(
        state: &mut State,
        from: Address,
        contract_address: Option<Address>,
        success: bool,
    ) -> TransactionReceipt {
        let nonce = state.nonces.entry(from).or_default();
        let mut preimage = from.as_bytes().to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        *nonce += 1;
        let transaction_hash = H256::from(keccak256(preimage));
        state.transactions.push(transaction_hash);
        TransactionReceipt {
            transaction_hash,
            from,
            contract_address,
            status: Some(U64::from(success as u64)),
            ..Default::default()
        }
    }

    fn check_accepting(state: &State) -> Result<(), DeploymentError> {
        match state.reject_after {
            Some(count) if state.transactions.len() >= count => Err(DeploymentError::Rpc(
                "transaction rejected by the node".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Chain for MemoryChain {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn chain_id(&self) -> Result<u64, DeploymentError> {
        self.record_call();
        Ok(self.chain_id)
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, DeploymentError> {
        self.record_call();
        Ok(self.code_at(address))
    }

    async fn get_balance(&self, address: Address) -> Result<U256, DeploymentError> {
        self.record_call();
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn send_transaction(
        &self,
        tx: TypedTransaction,
    ) -> Result<TransactionReceipt, DeploymentError> {
        self.record_call();
        let mut state = self.state.lock().unwrap();
        Self::check_accepting(&state)?;

        let from = tx.from().copied().unwrap_or(self.deployer);
        let data = tx.data().cloned().unwrap_or_default();
        let value = tx.value().copied().unwrap_or_default();
        let balance = state.balances.get(&from).copied().unwrap_or_default();
        if balance < value {
            return Err(DeploymentError::Rpc("insufficient funds".to_string()));
        }
        *state.balances.entry(from).or_default() -= value;

        let receipt = match tx.to() {
            None => {
                let nonce = state.nonces.get(&from).copied().unwrap_or_default();
                let address = get_contract_address(from, nonce);
                state.code.insert(address, data);
                Self::receipt(&mut state, from, Some(address), true)
            }
            Some(NameOrAddress::Address(to))
                if *to == *DETERMINISTIC_DEPLOYMENT_PROXY
                    && state.code.contains_key(to) =>
            {
                // The proxy reverts on short calldata and on address collisions.
                let success = data.len() >= 32 && {
                    let address = get_create2_address(*to, &data[..32], &data[32..]);
                    state
                        .code
                        .insert(address, Bytes::from(data[32..].to_vec()))
                        .is_none()
                };
                Self::receipt(&mut state, from, None, success)
            }
            Some(NameOrAddress::Address(to)) => {
                *state.balances.entry(*to).or_default() += value;
                Self::receipt(&mut state, from, None, true)
            }
            Some(NameOrAddress::Name(name)) => {
                return Err(DeploymentError::Rpc(format!("can't resolve {}", name)))
            }
        };
        Ok(receipt)
    }

    async fn send_raw_transaction(
        &self,
        tx: Bytes,
    ) -> Result<TransactionReceipt, DeploymentError> {
        self.record_call();
        let mut state = self.state.lock().unwrap();
        Self::check_accepting(&state)?;
        if tx != *PROXY_DEPLOYMENT_TX {
            return Err(DeploymentError::Rpc(
                "only the proxy deployment can be sent raw".to_string(),
            ));
        }
        let balance = state.balances.get(&*PROXY_DEPLOYER).copied().unwrap_or_default();
        if balance < *PROXY_DEPLOYMENT_COST {
            return Err(DeploymentError::Rpc("insufficient funds".to_string()));
        }
        state
            .balances
            .insert(*PROXY_DEPLOYER, balance - *PROXY_DEPLOYMENT_COST);
        state
            .code
            .insert(*DETERMINISTIC_DEPLOYMENT_PROXY, PROXY_RUNTIME.clone());
        Ok(Self::receipt(&mut state, *PROXY_DEPLOYER, None, true))
    }
}
