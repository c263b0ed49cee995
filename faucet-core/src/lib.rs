//! This crate contains the chain-agnostic pieces of the faucet: the traits
//! every chain integration implements, the errors they return and the
//! value codec used to convert drip amounts.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use error::*;
pub use traits::*;
pub use value::*;

pub use ethers_core::types::{
    transaction::eip2718::TypedTransaction, Address, Bytes, H160, H256, U256,
};

/// Mock implementations of the core traits for use in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

mod error;
mod traits;
mod value;
