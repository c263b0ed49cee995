use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use eyre::Result;
use tracing::info;

use crate::{
    metrics::CoreMetrics,
    settings::{LoadableFromSettings, Settings},
};

/// A fundamental agent which does not make any assumptions about the tools
/// which are used.
#[async_trait]
pub trait BaseAgent: Send + Sync + Debug {
    /// The agent's name
    const AGENT_NAME: &'static str;

    /// The settings object for this agent
    type Settings: LoadableFromSettings;

    /// Instantiate the agent from the standard settings object
    async fn from_settings(settings: Self::Settings, metrics: Arc<CoreMetrics>) -> Result<Self>
    where
        Self: Sized;

    /// Start running this agent. Returns when the agent stops.
    async fn run(self) -> Result<()>;
}

/// Call this from `main` to fully initialize and run the agent for its entire
/// lifecycle. This assumes only a single agent is being run. This will
/// initialize the metrics and tracing as well.
pub async fn agent_main<A: BaseAgent>() -> Result<()> {
    #[cfg(feature = "color-eyre")]
    color_eyre::install()?;

    // a missing .env file is fine
    let _ = dotenvy::dotenv();

    let settings = A::Settings::load()?;
    let core_settings: &Settings = settings.as_ref();

    let metrics = core_settings.metrics(A::AGENT_NAME)?;
    core_settings.log.start_tracing()?;

    let agent = A::from_settings(settings, metrics).await?;

    let result = agent.run().await;
    info!(agent = A::AGENT_NAME, "Shutting down agent...");
    result
}
