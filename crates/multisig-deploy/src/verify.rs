/// Source verification on Etherscan-style block explorers.
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, Bytes};
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::VerificationError;

/// What the explorer needs to rebuild and compare a deployed contract.
#[derive(Clone, Debug)]
pub struct VerificationRequest {
    pub address: Address,
    /// The fully qualified name, e.g. `contracts/Multisig.sol:Multisig`.
    pub contract: String,
    /// The solc standard-json input.
    pub source: String,
    /// The long compiler version, e.g. `v0.7.6+commit.7338295f`.
    pub compiler_version: String,
    pub constructor_args: Bytes,
}

#[async_trait]
pub trait Verifier {
    /// Submits a verification request and waits for the explorer's verdict.
    async fn verify(&self, request: &VerificationRequest) -> Result<(), VerificationError>;
}

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    message: String,
    result: String,
}

#[derive(Debug, PartialEq, Eq)]
enum VerificationStatus {
    Pending,
    Verified,
    Failed(String),
}

fn verification_status(response: &EtherscanResponse) -> VerificationStatus {
    let result = response.result.to_lowercase();
    if result.contains("pending") {
        VerificationStatus::Pending
    } else if result.contains("already verified") || result.starts_with("pass") {
        VerificationStatus::Verified
    } else if response.status == "1" {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Failed(format!("{}: {}", response.message, response.result))
    }
}

pub struct EtherscanVerifier {
    client: Client,
    api_url: Url,
    api_key: String,
    poll_interval: Duration,
    max_checks: usize,
}

impl EtherscanVerifier {
    pub fn new(api_url: Url, api_key: String) -> Result<Self, VerificationError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            poll_interval: Duration::from_secs(5),
            max_checks: 24,
        })
    }

    async fn submit(
        &self,
        request: &VerificationRequest,
    ) -> Result<Option<String>, VerificationError> {
        let address = format!("{:?}", request.address);
        let constructor_args = ethers::utils::hex::encode(&request.constructor_args);
        let response: EtherscanResponse = self
            .client
            .post(self.api_url.clone())
            .form(&[
                ("apikey", self.api_key.as_str()),
                ("module", "contract"),
                ("action", "verifysourcecode"),
                ("contractaddress", address.as_str()),
                ("sourceCode", request.source.as_str()),
                ("codeformat", "solidity-standard-json-input"),
                ("contractname", request.contract.as_str()),
                ("compilerversion", request.compiler_version.as_str()),
                // The misspelling is part of the api.
                ("constructorArguements", constructor_args.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;
        debug!(?response, "submitted verification");

        if response.status == "1" {
            return Ok(Some(response.result));
        }
        match verification_status(&response) {
            VerificationStatus::Verified => Ok(None),
            VerificationStatus::Failed(reason) => Err(VerificationError::Rejected(reason)),
            VerificationStatus::Pending => Err(VerificationError::Rejected(response.result)),
        }
    }

    async fn check(&self, guid: &str) -> Result<VerificationStatus, VerificationError> {
        let response: EtherscanResponse = self
            .client
            .get(self.api_url.clone())
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .send()
            .await?
            .json()
            .await?;
        Ok(verification_status(&response))
    }
}

#[async_trait]
impl Verifier for EtherscanVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), VerificationError> {
        let Some(guid) = self.submit(request).await? else {
            info!(contract = %request.contract, "already verified");
            return Ok(());
        };
        for _ in 0..self.max_checks {
            sleep(self.poll_interval).await;
            match self.check(&guid).await? {
                VerificationStatus::Pending => continue,
                VerificationStatus::Verified => {
                    info!(contract = %request.contract, address = ?request.address, "verified");
                    return Ok(());
                }
                VerificationStatus::Failed(reason) => {
                    return Err(VerificationError::Rejected(reason))
                }
            }
        }
        Err(VerificationError::Timeout(self.max_checks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: &str, message: &str, result: &str) -> EtherscanResponse {
        EtherscanResponse {
            status: status.to_string(),
            message: message.to_string(),
            result: result.to_string(),
        }
    }

    #[test]
    fn test_verification_status() {
        assert_eq!(
            verification_status(&response("0", "NOTOK", "Pending in queue")),
            VerificationStatus::Pending
        );
        assert_eq!(
            verification_status(&response("1", "OK", "Pass - Verified")),
            VerificationStatus::Verified
        );
        assert_eq!(
            verification_status(&response("0", "NOTOK", "Contract source code already verified")),
            VerificationStatus::Verified
        );
        assert_eq!(
            verification_status(&response("0", "NOTOK", "Fail - Unable to verify")),
            VerificationStatus::Failed("NOTOK: Fail - Unable to verify".to_string())
        );
    }

    #[test]
    fn test_parses_explorer_responses() {
        let parsed: EtherscanResponse =
            serde_json::from_str(r#"{"status":"1","message":"OK","result":"abc123"}"#).unwrap();
        assert_eq!(parsed.status, "1");
        assert_eq!(parsed.result, "abc123");
    }
}
