//! ethers-rs backed implementations of the faucet chain traits for
//! Ethereum-compatible chains.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub use client::*;
pub use erc20::*;
pub use signers::*;
pub use trait_builder::*;

mod client;

/// Erc20 abi
mod erc20;

mod signers;
mod trait_builder;
