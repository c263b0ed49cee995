use std::time::Duration;

use eyre::{bail, Context, Result};

use faucet_base::settings::ChainConf;
use faucet_core::{to_base_units, U256};

/// Resync interval when the chain config sets none
pub const DEFAULT_RECALIBRATE_INTERVAL: Duration = Duration::from_secs(30);
/// Max concurrently pending requests when the chain config sets none
pub const DEFAULT_ADMISSION_LIMIT: usize = 15;
/// How long a submission may take before the request fails
pub const DEFAULT_SUBMISSION_TIMEOUT: Duration = Duration::from_secs(40);
/// Period of the dequeue and recalibration ticks
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Immutable configuration of one chain's scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainContext {
    /// Chain identifier, e.g. `C`
    pub id: String,
    /// Display name
    pub name: String,
    /// EIP-155 chain id
    pub chain_id: u64,
    /// Native asset decimals
    pub decimals: u32,
    /// Whether the chain lacks a base fee and needs legacy transactions
    pub legacy: bool,
    /// `maxPriorityFeePerGas` of EIP-1559 drafts
    pub max_priority_fee: U256,
    /// `maxFeePerGas` of EIP-1559 drafts and the cap of legacy gas prices
    pub max_fee: U256,
    /// Native drip amount in base units
    pub drip_amount: U256,
    /// Min time between two resyncs
    pub recalibrate_interval: Duration,
    /// Max requests waiting or in flight
    pub admission_limit: usize,
    /// Submission timeout
    pub submission_timeout: Duration,
    /// Period of the dequeue and recalibration ticks
    pub tick_period: Duration,
}

impl ChainContext {
    /// Build the context of a chain. `legacy` comes from probing the chain
    /// for a base fee.
    pub fn from_conf(conf: &ChainConf, legacy: bool) -> Result<Self> {
        let admission_limit = conf.admission_limit.unwrap_or(DEFAULT_ADMISSION_LIMIT);
        if admission_limit == 0 {
            bail!("ADMISSION_LIMIT of chain {} must be positive", conf.id);
        }
        Ok(Self {
            id: conf.id.clone(),
            name: conf.name.clone(),
            chain_id: conf.chain_id,
            decimals: conf.decimals,
            legacy,
            max_priority_fee: conf.max_priority_fee()?,
            max_fee: conf.max_fee()?,
            drip_amount: to_base_units(&conf.drip_amount, conf.decimals)
                .with_context(|| format!("Invalid DRIP_AMOUNT for chain {}", conf.id))?,
            recalibrate_interval: conf
                .recalibrate
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RECALIBRATE_INTERVAL),
            admission_limit,
            submission_timeout: DEFAULT_SUBMISSION_TIMEOUT,
            tick_period: DEFAULT_TICK_PERIOD,
        })
    }
}

/// A fee-market chain dripping one native unit, limit 2
#[cfg(test)]
pub(crate) fn test_context() -> ChainContext {
    ChainContext {
        id: "C".into(),
        name: "Fuji (C-Chain)".into(),
        chain_id: 43113,
        decimals: 18,
        legacy: false,
        max_priority_fee: U256::from(2_000_000_000u64),
        max_fee: U256::from(100_000_000_000u64),
        drip_amount: U256::exp10(18),
        recalibrate_interval: DEFAULT_RECALIBRATE_INTERVAL,
        admission_limit: 2,
        submission_timeout: DEFAULT_SUBMISSION_TIMEOUT,
        tick_period: DEFAULT_TICK_PERIOD,
    }
}
