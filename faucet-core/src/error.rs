use std::error::Error as StdError;
use std::fmt::{Debug, Display, Formatter};

use ethers_contract::ContractError;
use ethers_providers::{Middleware, ProviderError};

use crate::H256;

/// The result of interacting with a chain.
pub type ChainResult<T> = Result<T, ChainCommunicationError>;

/// An "Any"-typed error.
pub trait FaucetCustomError: StdError + Send + Sync + 'static {}

impl<E: StdError + Send + Sync + 'static> FaucetCustomError for E {}

/// Thin wrapper around a boxed FaucetCustomError.
#[repr(transparent)]
pub struct FaucetCustomErrorWrapper(Box<dyn FaucetCustomError>);

impl Debug for FaucetCustomErrorWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Display for FaucetCustomErrorWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for FaucetCustomErrorWrapper {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// ChainCommunicationError contains errors returned when attempting to
/// query a chain or submit a transaction to it
#[derive(Debug, thiserror::Error)]
pub enum ChainCommunicationError {
    /// An error with a contract call
    #[error(transparent)]
    ContractError(FaucetCustomErrorWrapper),
    /// Provider Error
    #[error(transparent)]
    ProviderError(#[from] ProviderError),
    /// The node rejected a signed transaction
    #[error("Transaction {tx_hash:?} rejected: {reason}")]
    TransactionRejected {
        /// Hash of the rejected transaction
        tx_hash: H256,
        /// Reason given by the node
        reason: String,
    },
    /// A custom error
    #[error("{0}")]
    CustomError(String),
    /// Any other error; does not implement `From` to prevent
    /// conflicting/absorbing other errors.
    #[error(transparent)]
    Other(FaucetCustomErrorWrapper),
}

impl ChainCommunicationError {
    /// Create a chain communication error from any other existing error
    pub fn from_other<E: FaucetCustomError>(err: E) -> Self {
        Self::Other(FaucetCustomErrorWrapper(Box::new(err)))
    }

    /// Creates a chain communication error of the contract error variant
    /// from any other existing error
    pub fn from_contract_error<E: FaucetCustomError>(err: E) -> Self {
        Self::ContractError(FaucetCustomErrorWrapper(Box::new(err)))
    }

    /// Creates a custom error from a message
    pub fn from_other_str(err: &str) -> Self {
        Self::CustomError(err.to_owned())
    }
}

impl<M> From<ContractError<M>> for ChainCommunicationError
where
    M: Middleware + 'static,
{
    fn from(e: ContractError<M>) -> Self {
        Self::ContractError(FaucetCustomErrorWrapper(Box::new(e)))
    }
}

/// An error incurred by a signer
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct FaucetSignerError(#[from] Box<dyn StdError + Send + Sync>);

impl FaucetSignerError {
    /// Wrap any signer-specific error
    pub fn from_other<E: FaucetCustomError>(err: E) -> Self {
        Self(Box::new(err))
    }
}
