use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

use prometheus::{labels, opts, register_int_gauge_with_registry, Encoder, Registry};

/// Macro to prefix a string with the namespace.
macro_rules! namespaced {
    ($name:expr) => {
        format!("{}_{}", super::NAMESPACE, $name)
    };
}

/// Metrics registry of an agent, shared by every component that reports
/// metrics.
pub struct CoreMetrics {
    /// Metrics registry for adding new metrics and gathering reports
    registry: Registry,
    listen_port: u16,
    agent_name: String,
}

impl CoreMetrics {
    /// Track metrics for a particular agent name.
    ///
    /// - `for_agent` name of the agent these metrics are tracking.
    /// - `listen_port` port to start the HTTP server on.
    /// - `registry` prometheus registry to attach the metrics to
    pub fn new(for_agent: &str, listen_port: u16, registry: Registry) -> prometheus::Result<Self> {
        let const_labels: HashMap<String, String> = labels! {
            namespaced!("baselib_version") => env!("CARGO_PKG_VERSION").into(),
            "agent".into() => for_agent.into(),
        };
        let const_labels_ref = const_labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect::<HashMap<_, _>>();

        let start_time = register_int_gauge_with_registry!(
            opts!(
                namespaced!("start_time_seconds"),
                "Unix timestamp of when the agent started",
                const_labels_ref
            ),
            registry
        )?;
        start_time.set(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or_default(),
        );

        Ok(Self {
            registry,
            listen_port,
            agent_name: for_agent.into(),
        })
    }

    /// Get the prometheus registry for this core.
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Port the HTTP server of the agent listens on
    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    /// Gather available metrics into an encoded (plaintext, OpenMetrics format)
    /// report.
    pub fn gather(&self) -> prometheus::Result<Vec<u8>> {
        let collected_metrics = self.registry.gather();
        let mut out_buf = Vec::with_capacity(1024 * 64);
        let encoder = prometheus::TextEncoder::new();
        encoder.encode(&collected_metrics, &mut out_buf)?;
        Ok(out_buf)
    }

    /// Get the name of this agent, e.g. "faucet"
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }
}

impl Debug for CoreMetrics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CoreMetrics {{ agent_name: {}, listen_port: {} }}",
            self.agent_name, self.listen_port
        )
    }
}

/// Create a metrics registry for tests
#[cfg(test)]
pub(crate) fn test_metrics(registry: Registry) -> eyre::Result<CoreMetrics> {
    Ok(CoreMetrics::new("test", 0, registry)?)
}
