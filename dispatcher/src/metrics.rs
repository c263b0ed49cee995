use prometheus::{
    opts, register_int_counter_vec_with_registry, register_int_gauge_vec_with_registry,
    IntCounterVec, IntGaugeVec, Registry,
};

use faucet_core::{to_display_units, Address, U256};

const METRICS_NAMESPACE: &str = "faucet";

/// Label value standing in for the token fields of the native asset
pub const NATIVE_LABEL: &str = "native";

fn namespaced(name: &str) -> String {
    format!("{}_{}", METRICS_NAMESPACE, name)
}

/// Metrics of the dispatch schedulers, labeled by chain id
#[derive(Clone)]
pub struct DispatcherMetrics {
    /// Requests admitted and not yet resolved
    pub requests_in_progress: IntGaugeVec,
    /// Resolved requests by outcome, `sent` or `error`
    pub requests_processed: IntCounterVec,
    /// Cached faucet balances in display units, -1 when too large to show
    pub wallet_balance: IntGaugeVec,
    /// The nonce the next drip will use
    pub next_nonce: IntGaugeVec,
}

impl std::fmt::Debug for DispatcherMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DispatcherMetrics")
    }
}

impl DispatcherMetrics {
    /// Register the metrics on `registry`
    pub fn new(registry: Registry) -> eyre::Result<Self> {
        let requests_in_progress = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced("requests_in_progress"),
                "Number of faucet requests being processed",
            ),
            &["chain"],
            registry.clone()
        )?;
        let requests_processed = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("requests_processed"),
                "Number of processed faucet requests",
            ),
            &["chain", "status"],
            registry.clone()
        )?;
        let wallet_balance = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced("wallet_balance"),
                "Current balance of the faucet wallet: amount of ERC20 (token_name/token_address) or native tokens (token_name/token_address = \"native\")",
            ),
            &[
                "chain",
                "token_id",
                "token_name",
                "token_address",
                "faucet_address"
            ],
            registry.clone()
        )?;
        let next_nonce = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced("next_nonce"),
                "Nonce the next faucet transaction will use",
            ),
            &["chain"],
            registry
        )?;
        Ok(Self {
            requests_in_progress,
            requests_processed,
            wallet_balance,
            next_nonce,
        })
    }

    pub(crate) fn set_in_progress(&self, chain: &str, count: usize) {
        self.requests_in_progress
            .with_label_values(&[chain])
            .set(count as i64);
    }

    pub(crate) fn inc_processed(&self, chain: &str, sent: bool) {
        let status = if sent { "sent" } else { "error" };
        self.requests_processed
            .with_label_values(&[chain, status])
            .inc();
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn set_balance(
        &self,
        chain: &str,
        token_id: &str,
        token_name: &str,
        token_address: &str,
        faucet_address: Address,
        balance: U256,
        decimals: u32,
    ) {
        self.wallet_balance
            .with_label_values(&[
                chain,
                token_id,
                token_name,
                token_address,
                &format!("{faucet_address:?}"),
            ])
            .set(to_display_units(balance, decimals));
    }

    pub(crate) fn set_next_nonce(&self, chain: &str, nonce: U256) {
        let nonce = if nonce > U256::from(i64::MAX) {
            -1
        } else {
            nonce.as_u64() as i64
        };
        self.next_nonce.with_label_values(&[chain]).set(nonce);
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used)]
    pub(crate) fn dummy_instance() -> Self {
        Self::new(Registry::new()).unwrap()
    }
}
