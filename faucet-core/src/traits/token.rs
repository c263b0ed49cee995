use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;

use crate::{Address, Bytes, ChainResult, U256};

/// A fungible token contract the faucet can drip from.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait TokenContract: Send + Sync + Debug {
    /// Address of the contract
    fn address(&self) -> Address;

    /// Call data moving `amount` base units to `to`
    fn transfer_calldata(&self, to: Address, amount: U256) -> Bytes;

    /// Balance of `owner` in base units
    async fn balance_of(&self, owner: Address) -> ChainResult<U256>;
}
