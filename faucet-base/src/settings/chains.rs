use eyre::{eyre, Context, Result};
use serde::{Deserialize, Serialize};

use faucet_core::{Address, U256};

/// Configuration of one EVM chain the faucet serves.
///
/// Field names follow the upper case keys of the config file. Keys are
/// matched case-insensitively on load and written back upper case so the
/// web client can consume `/api/getChainConfigs` unchanged.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConf {
    /// Identifier used in requests and env var names, e.g. `C`
    #[serde(rename(serialize = "ID", deserialize = "id"), alias = "ID")]
    pub id: String,
    /// Display name
    #[serde(rename(serialize = "NAME", deserialize = "name"), alias = "NAME")]
    pub name: String,
    /// Symbol of the native asset
    #[serde(rename(serialize = "TOKEN", deserialize = "token"), alias = "TOKEN")]
    pub token: String,
    /// RPC url. Never served back to clients.
    #[serde(rename(deserialize = "rpc"), alias = "RPC", skip_serializing)]
    pub rpc: String,
    /// EIP-155 chain id
    #[serde(rename(serialize = "CHAINID", deserialize = "chainid"), alias = "CHAINID")]
    pub chain_id: u64,
    /// Block explorer url
    #[serde(
        rename(serialize = "EXPLORER", deserialize = "explorer"),
        alias = "EXPLORER",
        default
    )]
    pub explorer: String,
    /// Logo url
    #[serde(
        rename(serialize = "IMAGE", deserialize = "image"),
        alias = "IMAGE",
        default
    )]
    pub image: String,
    /// Decimals of the native asset
    #[serde(
        rename(serialize = "DECIMALS", deserialize = "decimals"),
        alias = "DECIMALS",
        default = "default_decimals"
    )]
    pub decimals: u32,
    /// Upper bound on `maxPriorityFeePerGas`, in wei
    #[serde(
        rename(serialize = "MAX_PRIORITY_FEE", deserialize = "max_priority_fee"),
        alias = "MAX_PRIORITY_FEE"
    )]
    pub max_priority_fee: String,
    /// Upper bound on `maxFeePerGas` and the legacy gas price, in wei
    #[serde(
        rename(serialize = "MAX_FEE", deserialize = "max_fee"),
        alias = "MAX_FEE"
    )]
    pub max_fee: String,
    /// Whole native units sent per drip
    #[serde(
        rename(serialize = "DRIP_AMOUNT", deserialize = "drip_amount"),
        alias = "DRIP_AMOUNT"
    )]
    pub drip_amount: String,
    /// Seconds between balance and nonce resyncs
    #[serde(
        rename(serialize = "RECALIBRATE", deserialize = "recalibrate"),
        alias = "RECALIBRATE",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub recalibrate: Option<u64>,
    /// Max concurrently pending requests
    #[serde(
        rename(serialize = "ADMISSION_LIMIT", deserialize = "admission_limit"),
        alias = "ADMISSION_LIMIT",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub admission_limit: Option<usize>,
    /// Rate limit settings, unused here but kept for clients
    #[serde(
        rename(serialize = "RATELIMIT", deserialize = "ratelimit"),
        alias = "RATELIMIT",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rate_limit: Option<serde_json::Value>,
}

/// Configuration of one ERC20 token. Unset optional fields are inherited from
/// the host chain, see [`TokenConf::inherit_from`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConf {
    /// Identifier used in requests, e.g. `USDC`
    #[serde(rename(serialize = "ID", deserialize = "id"), alias = "ID")]
    pub id: String,
    /// Display name
    #[serde(rename(serialize = "NAME", deserialize = "name"), alias = "NAME")]
    pub name: String,
    /// Token symbol
    #[serde(rename(serialize = "TOKEN", deserialize = "token"), alias = "TOKEN")]
    pub token: String,
    /// `ID` of the chain the token is deployed on
    #[serde(rename(serialize = "HOSTID", deserialize = "hostid"), alias = "HOSTID")]
    pub host_id: String,
    /// Token contract address
    #[serde(
        rename(serialize = "CONTRACTADDRESS", deserialize = "contractaddress"),
        alias = "CONTRACTADDRESS"
    )]
    pub contract_address: String,
    /// Gas limit of a transfer
    #[serde(
        rename(serialize = "GASLIMIT", deserialize = "gaslimit"),
        alias = "GASLIMIT"
    )]
    pub gas_limit: String,
    /// Whole token units sent per drip
    #[serde(
        rename(serialize = "DRIP_AMOUNT", deserialize = "drip_amount"),
        alias = "DRIP_AMOUNT"
    )]
    pub drip_amount: String,
    /// Token decimals
    #[serde(
        rename(serialize = "DECIMALS", deserialize = "decimals"),
        alias = "DECIMALS",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub decimals: Option<u32>,
    /// Logo url
    #[serde(
        rename(serialize = "IMAGE", deserialize = "image"),
        alias = "IMAGE",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
    /// Inherited from the host chain when unset
    #[serde(
        rename(serialize = "CHAINID", deserialize = "chainid"),
        alias = "CHAINID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub chain_id: Option<u64>,
    /// Inherited from the host chain when unset
    #[serde(
        rename(serialize = "EXPLORER", deserialize = "explorer"),
        alias = "EXPLORER",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub explorer: Option<String>,
    /// Inherited from the host chain when unset
    #[serde(
        rename(serialize = "MAX_PRIORITY_FEE", deserialize = "max_priority_fee"),
        alias = "MAX_PRIORITY_FEE",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_priority_fee: Option<String>,
    /// Inherited from the host chain when unset
    #[serde(
        rename(serialize = "MAX_FEE", deserialize = "max_fee"),
        alias = "MAX_FEE",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_fee: Option<String>,
    /// Inherited from the host chain when unset
    #[serde(
        rename(serialize = "RECALIBRATE", deserialize = "recalibrate"),
        alias = "RECALIBRATE",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub recalibrate: Option<u64>,
    /// Rate limit settings, unused here but kept for clients
    #[serde(
        rename(serialize = "RATELIMIT", deserialize = "ratelimit"),
        alias = "RATELIMIT",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rate_limit: Option<serde_json::Value>,
}

fn default_decimals() -> u32 {
    18
}

fn parse_wei(value: &str, field: &str, owner: &str) -> Result<U256> {
    U256::from_dec_str(value.trim())
        .map_err(|e| eyre!("{e:?}"))
        .with_context(|| format!("Invalid {field} {value:?} for {owner}"))
}

impl ChainConf {
    /// `MAX_PRIORITY_FEE` in wei
    pub fn max_priority_fee(&self) -> Result<U256> {
        parse_wei(&self.max_priority_fee, "MAX_PRIORITY_FEE", &self.id)
    }

    /// `MAX_FEE` in wei
    pub fn max_fee(&self) -> Result<U256> {
        parse_wei(&self.max_fee, "MAX_FEE", &self.id)
    }
}

impl TokenConf {
    /// Fill every unset optional field from the host chain.
    pub fn inherit_from(&mut self, chain: &ChainConf) {
        self.decimals.get_or_insert(chain.decimals);
        self.image.get_or_insert_with(|| chain.image.clone());
        self.chain_id.get_or_insert(chain.chain_id);
        self.explorer.get_or_insert_with(|| chain.explorer.clone());
        self.max_priority_fee
            .get_or_insert_with(|| chain.max_priority_fee.clone());
        self.max_fee.get_or_insert_with(|| chain.max_fee.clone());
        if self.recalibrate.is_none() {
            self.recalibrate = chain.recalibrate;
        }
        if self.rate_limit.is_none() {
            self.rate_limit = chain.rate_limit.clone();
        }
    }

    /// Parsed contract address
    pub fn contract_address(&self) -> Result<Address> {
        self.contract_address
            .trim()
            .parse::<Address>()
            .map_err(|e| eyre!("{e}"))
            .with_context(|| {
                format!(
                    "Invalid CONTRACTADDRESS {:?} for token {}",
                    self.contract_address, self.id
                )
            })
    }

    /// `GASLIMIT` as an integer
    pub fn gas_limit(&self) -> Result<U256> {
        parse_wei(&self.gas_limit, "GASLIMIT", &self.id)
    }
}
