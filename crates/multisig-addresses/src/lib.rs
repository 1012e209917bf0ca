// TODO: Once the proxy is pointed at the freshly deployed multisig instead of
// a fixed implementation address, this should also record the implementation
// the proxy delegates to.

use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// The addresses of the contracts deployed by a single run. Contracts that
/// weren't part of the run are left as the zero address.
#[derive(Default, Debug, Eq, PartialEq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Addresses {
    #[serde(default)]
    pub multisig: Address,
    #[serde(default)]
    pub multisig_proxy: Address,
}

impl Addresses {
    /// Records the address of a deployed contract by its contract name.
    /// Returns false if the name isn't tracked.
    pub fn set(&mut self, contract_name: &str, address: Address) -> bool {
        match contract_name {
            "Multisig" => self.multisig = address,
            "MultisigProxy" => self.multisig_proxy = address,
            _ => return false,
        }
        true
    }
}
