use std::fmt;

use ethers::signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer};

use crate::{config::Credentials, constants::DEFAULT_MNEMONIC, error::ConfigurationError};

/// The key material that signs deployments. A private key always wins over a
/// mnemonic.
#[derive(Clone, PartialEq, Eq)]
pub enum SigningMaterial {
    PrivateKey(String),
    Mnemonic(String),
}

impl fmt::Debug for SigningMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKey(_) => f.write_str("PrivateKey(<redacted>)"),
            Self::Mnemonic(phrase) if phrase == DEFAULT_MNEMONIC => {
                f.write_str("Mnemonic(<default>)")
            }
            Self::Mnemonic(_) => f.write_str("Mnemonic(<redacted>)"),
        }
    }
}

/// Picks the signing material: `PK` if set, otherwise `MNEMONIC`, otherwise
/// the well-known default mnemonic.
pub fn resolve_signing(credentials: &Credentials) -> SigningMaterial {
    if let Some(pk) = credentials.get("PK") {
        return SigningMaterial::PrivateKey(pk.to_string());
    }
    SigningMaterial::Mnemonic(
        credentials
            .get("MNEMONIC")
            .unwrap_or(DEFAULT_MNEMONIC)
            .to_string(),
    )
}

impl SigningMaterial {
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Mnemonic(phrase) if phrase == DEFAULT_MNEMONIC)
    }

    /// Builds the wallet for an account index. A private key only has account
    /// zero.
    pub fn wallet(&self, index: u32, chain_id: u64) -> Result<LocalWallet, ConfigurationError> {
        let wallet = match self {
            Self::PrivateKey(key) => {
                if index != 0 {
                    return Err(ConfigurationError::InvalidSigner(format!(
                        "a private key only provides account 0, not account {}",
                        index
                    )));
                }
                key.parse::<LocalWallet>()
                    .map_err(|e| ConfigurationError::InvalidSigner(e.to_string()))?
            }
            Self::Mnemonic(phrase) => MnemonicBuilder::<English>::default()
                .phrase(phrase.as_str())
                .index(index)
                .and_then(|builder| builder.build())
                .map_err(|e| ConfigurationError::InvalidSigner(e.to_string()))?,
        };
        Ok(wallet.with_chain_id(chain_id))
    }

    /// The wallet of the named `deployer` account.
    pub fn deployer(&self, chain_id: u64) -> Result<LocalWallet, ConfigurationError> {
        self.wallet(0, chain_id)
    }
}
