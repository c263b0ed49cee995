use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use derive_new::new;
use ethers::prelude::{BlockId, BlockNumber, Middleware};
use ethers_core::utils::to_checksum;
use tracing::instrument;

use faucet_core::{
    Address, Bytes, ChainCommunicationError, ChainResult, FaucetChainClient, TokenContract, H256,
    U256,
};

use crate::EthereumTokenContract;

/// A [FaucetChainClient] talking to an EVM chain through an ethers middleware.
#[derive(new)]
pub struct EthereumChainClient<M> {
    provider: Arc<M>,
}

impl<M> Debug for EthereumChainClient<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthereumChainClient").finish()
    }
}

#[async_trait]
impl<M> FaucetChainClient for EthereumChainClient<M>
where
    M: Middleware + 'static,
{
    fn is_address_valid(&self, address: &str) -> bool {
        is_valid_address(address)
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn get_nonce(&self, address: Address) -> ChainResult<U256> {
        self.provider
            .get_transaction_count(address, Some(BlockId::Number(BlockNumber::Pending)))
            .await
            .map_err(ChainCommunicationError::from_other)
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn get_native_balance(&self, address: Address) -> ChainResult<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(ChainCommunicationError::from_other)
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn get_base_fee(&self) -> ChainResult<Option<U256>> {
        let latest_block = self
            .provider
            .get_block(BlockNumber::Latest)
            .await
            .map_err(ChainCommunicationError::from_other)?
            .ok_or_else(|| ChainCommunicationError::from_other_str("Latest block not found"))?;
        Ok(latest_block.base_fee_per_gas)
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn get_gas_price(&self) -> ChainResult<U256> {
        self.provider
            .get_gas_price()
            .await
            .map_err(ChainCommunicationError::from_other)
    }

    #[instrument(skip(self, raw), err)]
    async fn submit_signed_transaction(&self, raw: Bytes) -> ChainResult<H256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(ChainCommunicationError::from_other)?;
        Ok(*pending)
    }

    fn token_contract(&self, address: Address) -> Arc<dyn TokenContract> {
        Arc::new(EthereumTokenContract::new(address, self.provider.clone()))
    }
}

/// Accepts 20 byte hex addresses with or without a `0x` prefix. Mixed case
/// input must carry a valid EIP-55 checksum.
pub fn is_valid_address(address: &str) -> bool {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    if digits.len() != 40 {
        return false;
    }
    let Ok(bytes) = hex::decode(digits) else {
        return false;
    };
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }
    let checksummed = to_checksum(&Address::from_slice(&bytes), None);
    checksummed.trim_start_matches("0x") == digits
}
