use ethers_core::types::{Eip1559TransactionRequest, TransactionRequest};

use faucet_core::{Address, Bytes, TypedTransaction, U256};

/// Gas of a plain value transfer
pub(crate) const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Fee fields of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GasPrice {
    /// Chains without a base fee
    Legacy { gas_price: U256 },
    /// EIP-1559 chains
    Eip1559 {
        max_fee: U256,
        max_priority_fee: U256,
    },
}

impl GasPrice {
    /// The quoted gas price bumped by a quarter, capped at `max_fee`
    pub(crate) fn legacy(quoted: U256, max_fee: U256) -> Self {
        let bumped = quoted.saturating_mul(5.into()) / 4;
        GasPrice::Legacy {
            gas_price: bumped.min(max_fee),
        }
    }
}

/// What a draft moves to the receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transfer {
    Native {
        to: Address,
        value: U256,
    },
    Token {
        contract: Address,
        gas_limit: U256,
        calldata: Bytes,
    },
}

/// Build the unsigned transaction of a drip
pub(crate) fn build_draft(
    from: Address,
    nonce: U256,
    chain_id: u64,
    gas_price: GasPrice,
    transfer: Transfer,
) -> TypedTransaction {
    let (to, value, gas, data) = match transfer {
        Transfer::Native { to, value } => (to, value, NATIVE_TRANSFER_GAS.into(), None),
        Transfer::Token {
            contract,
            gas_limit,
            calldata,
        } => (contract, U256::zero(), gas_limit, Some(calldata)),
    };

    match gas_price {
        GasPrice::Legacy { gas_price } => {
            let mut tx = TransactionRequest::new()
                .from(from)
                .to(to)
                .value(value)
                .gas(gas)
                .gas_price(gas_price)
                .nonce(nonce)
                .chain_id(chain_id);
            tx.data = data;
            tx.into()
        }
        GasPrice::Eip1559 {
            max_fee,
            max_priority_fee,
        } => {
            let mut tx = Eip1559TransactionRequest::new()
                .from(from)
                .to(to)
                .value(value)
                .gas(gas)
                .max_fee_per_gas(max_fee)
                .max_priority_fee_per_gas(max_priority_fee)
                .nonce(nonce)
                .chain_id(chain_id);
            tx.data = data;
            tx.into()
        }
    }
}
