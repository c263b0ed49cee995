use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use eyre::{bail, Context, Result};

use faucet_base::settings::TokenConf;
use faucet_core::{to_base_units, Address, TokenContract, U256};

/// An ERC20 token the faucet drips on one chain
#[derive(Clone)]
pub struct Asset {
    /// Id clients request the token by
    pub id: String,
    /// Display name
    pub name: String,
    /// Token contract address
    pub contract_address: Address,
    /// Token decimals
    pub decimals: u32,
    /// Drip amount in base units
    pub drip_amount: U256,
    /// Gas limit of one transfer
    pub gas_limit: U256,
    /// Last known faucet balance in base units
    pub balance: U256,
    pub(crate) contract: Arc<dyn TokenContract>,
}

impl Debug for Asset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asset")
            .field("id", &self.id)
            .field("contract_address", &self.contract_address)
            .field("decimals", &self.decimals)
            .field("drip_amount", &self.drip_amount)
            .field("balance", &self.balance)
            .finish()
    }
}

/// The tokens of one chain, keyed by id. Filled during startup and handed to
/// the chain's scheduler, which then owns it.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    assets: BTreeMap<String, Asset>,
}

impl TokenRegistry {
    /// Register a token. `drip_amount` is in whole token units and may carry
    /// a fraction, e.g. `"0.5"`.
    pub fn register(
        &mut self,
        id: &str,
        name: &str,
        contract: Arc<dyn TokenContract>,
        decimals: u32,
        drip_amount: &str,
        gas_limit: U256,
    ) -> Result<()> {
        if self.assets.contains_key(id) {
            bail!("Token {id} is already registered");
        }
        let drip_amount = to_base_units(drip_amount, decimals)
            .with_context(|| format!("Invalid DRIP_AMOUNT for token {id}"))?;
        self.assets.insert(
            id.to_owned(),
            Asset {
                id: id.to_owned(),
                name: name.to_owned(),
                contract_address: contract.address(),
                decimals,
                drip_amount,
                gas_limit,
                balance: U256::zero(),
                contract,
            },
        );
        Ok(())
    }

    /// Register a token from its config, binding the contract with `bind`.
    /// The config must already have inherited its host chain's fields.
    pub fn register_conf(
        &mut self,
        conf: &TokenConf,
        bind: impl FnOnce(Address) -> Arc<dyn TokenContract>,
    ) -> Result<()> {
        let contract = bind(conf.contract_address()?);
        self.register(
            &conf.id,
            &conf.name,
            contract,
            conf.decimals.unwrap_or(18),
            &conf.drip_amount,
            conf.gas_limit()?,
        )
    }

    /// The token with this id
    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Asset> {
        self.assets.get_mut(id)
    }

    /// Whether a token with this id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }

    /// All registered tokens ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }
}
