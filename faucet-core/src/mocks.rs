#![allow(missing_docs)]

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;

use crate::*;

mock! {
    pub ChainClient {}

    #[async_trait]
    impl FaucetChainClient for ChainClient {
        fn is_address_valid(&self, address: &str) -> bool;
        async fn get_nonce(&self, address: Address) -> ChainResult<U256>;
        async fn get_native_balance(&self, address: Address) -> ChainResult<U256>;
        async fn get_token_balance(&self, contract: Address, owner: Address) -> ChainResult<U256>;
        async fn get_base_fee(&self) -> ChainResult<Option<U256>>;
        async fn get_gas_price(&self) -> ChainResult<U256>;
        async fn submit_signed_transaction(&self, raw: Bytes) -> ChainResult<H256>;
        fn token_contract(&self, address: Address) -> Arc<dyn TokenContract>;
    }
}

impl std::fmt::Debug for MockChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockChainClient")
    }
}

mock! {
    pub Signer {}

    #[async_trait]
    impl FaucetSigner for Signer {
        fn address(&self) -> Address;
        async fn sign(&self, draft: &TypedTransaction) -> Result<SignedTransaction, FaucetSignerError>;
    }
}

impl std::fmt::Debug for MockSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockSigner")
    }
}

mock! {
    pub TokenContract {}

    #[async_trait]
    impl TokenContract for TokenContract {
        fn address(&self) -> Address;
        fn transfer_calldata(&self, to: Address, amount: U256) -> Bytes;
        async fn balance_of(&self, owner: Address) -> ChainResult<U256>;
    }
}

impl std::fmt::Debug for MockTokenContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockTokenContract")
    }
}
