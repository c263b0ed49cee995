use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;
use derive_new::new;

use crate::{Address, Bytes, FaucetSignerError, TypedTransaction, H256};

/// A transaction ready to be broadcast
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct SignedTransaction {
    /// Hash the transaction will be known by on chain
    pub tx_hash: H256,
    /// RLP encoded signed transaction
    pub raw: Bytes,
}

/// Holds the faucet key for one chain and signs drafts with it. Signing may
/// involve a network round trip to a remote key service.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait FaucetSigner: Send + Sync + Debug {
    /// The account the key controls
    fn address(&self) -> Address;

    /// Sign a draft transaction.
    async fn sign(&self, draft: &TypedTransaction) -> Result<SignedTransaction, FaucetSignerError>;
}
