#![allow(clippy::enum_variant_names)]
#![allow(missing_docs)]

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::AbiEncode;
use ethers::prelude::{abigen, Middleware};

use faucet_core::{Address, Bytes, ChainResult, TokenContract, U256};

abigen!(Erc20, "$CARGO_MANIFEST_DIR/abis/Erc20.abi.json");

/// An ERC20 token the faucet holds a balance of
pub struct EthereumTokenContract<M>
where
    M: Middleware,
{
    contract: Arc<Erc20<M>>,
}

impl<M> EthereumTokenContract<M>
where
    M: Middleware + 'static,
{
    /// Bind the token at `address`
    pub fn new(address: Address, provider: Arc<M>) -> Self {
        Self {
            contract: Arc::new(Erc20::new(address, provider)),
        }
    }
}

impl<M> Debug for EthereumTokenContract<M>
where
    M: Middleware,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthereumTokenContract")
            .field("address", &self.contract.address())
            .finish()
    }
}

#[async_trait]
impl<M> TokenContract for EthereumTokenContract<M>
where
    M: Middleware + 'static,
{
    fn address(&self) -> Address {
        self.contract.address()
    }

    fn transfer_calldata(&self, to: Address, amount: U256) -> Bytes {
        TransferCall { to, amount }.encode().into()
    }

    async fn balance_of(&self, owner: Address) -> ChainResult<U256> {
        Ok(self.contract.balance_of(owner).call().await?)
    }
}
