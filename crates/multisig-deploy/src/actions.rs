/// The ordered list of deployment actions and the tag filter that selects
/// which of them a run executes.
use ethers::{
    abi::Token,
    types::{Address, H256, U256},
};

use crate::{deploy::DeploymentSpec, error::ConfigurationError};

lazy_static! {
    // The initial multisig owners.
    pub static ref MULTISIG_OWNERS: Vec<Address> = vec![
        "0xBd39f5936969828eD9315220659cD11129071814".parse().unwrap(),
        "0xBca9567A9e8D5F6F58C419d32aF6190F74C880e6".parse().unwrap(),
    ];

    // The logic contract behind the proxy.
    pub static ref PROXY_IMPLEMENTATION: Address =
        "0xbE91E35F02134df33763BfEA8D00fA22901e0cA8".parse().unwrap();

    // The admin contract that may upgrade the proxy. It was deployed by hand,
    // so it has to be replaced with your own admin before deploying.
    pub static ref PROXY_ADMIN: Address =
        "0xBf996BFe7a62ab39130281eC1062eDbEC88B708d".parse().unwrap();
}

pub const MULTISIG_THRESHOLD: u64 = 1;

/// A named deployment step. Its spec is built once the deployer is known.
#[derive(Clone, Copy)]
pub struct DeployAction {
    pub name: &'static str,
    pub tags: &'static [&'static str],
    build: fn(Address) -> DeploymentSpec,
}

impl std::fmt::Debug for DeployAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployAction")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish()
    }
}

impl DeployAction {
    pub const fn new(
        name: &'static str,
        tags: &'static [&'static str],
        build: fn(Address) -> DeploymentSpec,
    ) -> Self {
        Self { name, tags, build }
    }

    pub fn spec(&self, deployer: Address) -> DeploymentSpec {
        (self.build)(deployer)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }
}

/// The constructor arguments of `Multisig`: owners, threshold, fallback
/// handler and setup calldata.
pub fn multisig_args(owners: &[Address], threshold: u64) -> Vec<Token> {
    vec![
        Token::Array(owners.iter().copied().map(Token::Address).collect()),
        Token::Uint(U256::from(threshold)),
        Token::Address(Address::zero()),
        Token::Bytes(vec![]),
    ]
}

/// The constructor arguments of `MultisigProxy`: implementation, admin and
/// initialization calldata.
pub fn multisig_proxy_args(implementation: Address, admin: Address) -> Vec<Token> {
    vec![
        Token::Address(implementation),
        Token::Address(admin),
        Token::Bytes(vec![]),
    ]
}

fn multisig(deployer: Address) -> DeploymentSpec {
    DeploymentSpec::new("Multisig", deployer)
        .args(multisig_args(&MULTISIG_OWNERS, MULTISIG_THRESHOLD))
        .deterministic(H256::zero())
}

fn multisig_proxy(deployer: Address) -> DeploymentSpec {
    DeploymentSpec::new("MultisigProxy", deployer)
        .args(multisig_proxy_args(*PROXY_IMPLEMENTATION, *PROXY_ADMIN))
        .deterministic(H256::zero())
}

/// The deployment actions in the order they run.
pub fn default_actions() -> Vec<DeployAction> {
    vec![
        DeployAction::new("Multisig", &["Multisig"], multisig),
        DeployAction::new("MultisigProxy", &["MultisigProxy"], multisig_proxy),
    ]
}

/// Selects the actions carrying any of the tags, keeping their order. No tags
/// selects everything. A tag that matches nothing is an error so that typos
/// don't silently deploy nothing.
pub fn select_actions<'a>(
    actions: &'a [DeployAction],
    tags: &[String],
) -> Result<Vec<&'a DeployAction>, ConfigurationError> {
    if tags.is_empty() {
        return Ok(actions.iter().collect());
    }
    if let Some(unknown) = tags
        .iter()
        .find(|tag| !actions.iter().any(|action| action.has_tag(tag)))
    {
        return Err(ConfigurationError::UnknownTag(unknown.clone()));
    }
    Ok(actions
        .iter()
        .filter(|action| tags.iter().any(|tag| action.has_tag(tag)))
        .collect())
}
