use ethers_core::utils::parse_units;
use tracing::warn;

use crate::U256;

/// Errors converting a human readable amount into base units
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// The amount is not a non-negative decimal number
    #[error("Invalid amount {0:?}")]
    InvalidAmount(String),
    /// The amount has more significant fractional digits than the asset
    #[error("Amount {amount} has more than {decimals} fractional digits")]
    TooPrecise {
        /// The offending amount
        amount: String,
        /// Decimal count of the asset
        decimals: u32,
    },
    /// The result does not fit in 256 bits
    #[error("Amount {amount} with {decimals} decimals overflows")]
    Overflow {
        /// The offending amount
        amount: String,
        /// Decimal count of the asset
        decimals: u32,
    },
}

fn exp10(decimals: u32) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(decimals))
}

/// Convert a decimal string such as `"2"` or `"0.25"` into base units of an
/// asset with `decimals` decimals.
///
/// `parse_units` silently truncates digits past `decimals` and panics when
/// the scaled value overflows, so both are rejected before calling it.
pub fn to_base_units(amount: &str, decimals: u32) -> Result<U256, ValueError> {
    let amount = amount.trim();
    let invalid = || ValueError::InvalidAmount(amount.to_owned());
    let overflow = || ValueError::Overflow {
        amount: amount.to_owned(),
        decimals,
    };

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(ValueError::TooPrecise {
            amount: amount.to_owned(),
            decimals,
        });
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let scale = exp10(decimals).ok_or_else(overflow)?;
    let max_whole = U256::MAX / scale;
    let whole_value = U256::from_dec_str(whole).map_err(|_| overflow())?;
    if whole_value > max_whole || (whole_value == max_whole && !fraction.is_empty()) {
        return Err(overflow());
    }

    let parsed = parse_units(format!("{whole}.{fraction}"), decimals).map_err(|_| overflow())?;
    Ok(parsed.into())
}

/// Whole units of `amount` for an asset with `decimals` decimals, rounded
/// down. Returns `-1` if the result does not fit an `i64`; only meant for
/// metrics and logs.
pub fn to_display_units(amount: U256, decimals: u32) -> i64 {
    let whole = match exp10(decimals) {
        Some(scale) => amount / scale,
        None => U256::zero(),
    };
    if whole > U256::from(i64::MAX as u64) {
        warn!(%amount, decimals, "Balance overflow converting to display units");
        return -1;
    }
    whole.as_u64() as i64
}
