use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use auto_impl::auto_impl;

use crate::{Address, Bytes, ChainResult, TokenContract, H256, U256};

/// Read and write access to a single chain's RPC endpoint. This is
/// everything the dispatch scheduler needs from the remote ledger.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait FaucetChainClient: Send + Sync + Debug {
    /// Whether `address` is a well formed account address on this chain
    fn is_address_valid(&self, address: &str) -> bool;

    /// Transaction count of `address`, including transactions still
    /// waiting in the node's pool
    async fn get_nonce(&self, address: Address) -> ChainResult<U256>;

    /// Native asset balance of `address` in base units
    async fn get_native_balance(&self, address: Address) -> ChainResult<U256>;

    /// Token balance of `owner` held in the token at `contract`
    async fn get_token_balance(&self, contract: Address, owner: Address) -> ChainResult<U256> {
        self.token_contract(contract).balance_of(owner).await
    }

    /// Base fee of the latest block, `None` if the chain has no fee market
    async fn get_base_fee(&self) -> ChainResult<Option<U256>>;

    /// Current legacy gas price
    async fn get_gas_price(&self) -> ChainResult<U256>;

    /// Broadcast an already signed transaction and return its hash once the
    /// node accepted it. Does not wait for inclusion.
    async fn submit_signed_transaction(&self, raw: Bytes) -> ChainResult<H256>;

    /// Bind a token contract deployed at `address`
    fn token_contract(&self, address: Address) -> Arc<dyn TokenContract>;
}
