//! The faucet agent drips native and ERC20 test tokens on EVM chains.
//!
//! Every configured chain gets a dispatch scheduler holding the chain's
//! faucet key. The HTTP API hands drip requests to the scheduler of the
//! requested chain and reports its balances and usage.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use crate::faucet::*;

mod faucet;
pub mod server;
pub mod settings;

#[cfg(test)]
mod test_utils;
