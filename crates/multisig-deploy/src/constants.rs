use ethers::types::{Address, Bytes, U256};

/// The mnemonic used when neither `PK` nor `MNEMONIC` is set. It's public, so
/// it's only meant for local and test networks.
pub const DEFAULT_MNEMONIC: &str =
    "garlic path pool various surface pitch put near dutch strong whisper letter";

/// The name of the network used when `--network` is omitted.
pub const DEFAULT_NETWORK: &str = "hardhat";

/// The file inside a network's deployments directory holding its chain id.
pub const CHAIN_ID_FILE: &str = ".chainId";

lazy_static! {
    // The deterministic deployment proxy. It prepends nothing to the calldata:
    // the first 32 bytes are the salt and the rest is the init code.
    pub static ref DETERMINISTIC_DEPLOYMENT_PROXY: Address =
        "0x4e59b44847b379578588920ca78fbf26c0b4956c".parse().unwrap();

    // The one-off account that signed the proxy's deployment transaction.
    pub static ref PROXY_DEPLOYER: Address =
        "0x3fab184622dc19b6109349b94811493bf2a45362".parse().unwrap();

    // The presigned, chain-agnostic transaction that deploys the proxy.
    pub static ref PROXY_DEPLOYMENT_TX: Bytes =
        "0xf8a58085174876e800830186a08080b853604580600e600039806000f350fe7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe03601600081602082378035828234f58015156039578182fd5b8082525050506014600cf31ba02222222222222222222222222222222222222222222222222222222222222222a02222222222222222222222222222222222222222222222222222222222222222"
            .parse()
            .unwrap();

    // Gas limit times gas price of the presigned transaction (100k gas at
    // 100 gwei).
    pub static ref PROXY_DEPLOYMENT_COST: U256 = U256::from(100_000u64) * U256::exp10(11);
}
