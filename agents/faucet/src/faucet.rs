use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context, Result};
use futures::future::try_join_all;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use faucet_base::{
    server::Server,
    settings::{ChainConf, SignerConf, TokenConf},
    BaseAgent, CoreMetrics,
};
use faucet_core::{FaucetChainClient, FaucetSigner};
use faucet_dispatcher::{
    ChainContext, DispatcherMetrics, Scheduler, SchedulerHandle, TokenRegistry,
};
use faucet_ethereum::{build_http_provider, EthereumChainClient, Signers};

use crate::{server::ServerState, settings::FaucetSettings};

/// A faucet agent
pub struct Faucet {
    settings: FaucetSettings,
    core_metrics: Arc<CoreMetrics>,
    schedulers: Vec<Scheduler>,
    handles: BTreeMap<String, SchedulerHandle>,
}

impl Debug for Faucet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Faucet")
            .field("chains", &self.handles.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl BaseAgent for Faucet {
    const AGENT_NAME: &'static str = "faucet";

    type Settings = FaucetSettings;

    async fn from_settings(settings: Self::Settings, metrics: Arc<CoreMetrics>) -> Result<Self> {
        let dispatcher_metrics = DispatcherMetrics::new(metrics.registry())?;

        let mut schedulers = Vec::with_capacity(settings.evmchains.len());
        let mut handles = BTreeMap::new();
        for chain in settings.evmchains.iter() {
            let signer_conf = SignerConf::from_env(&chain.id)?;
            let (scheduler, handle) = build_scheduler(
                chain,
                settings.tokens_on(&chain.id),
                &signer_conf,
                dispatcher_metrics.clone(),
            )
            .await
            .with_context(|| format!("Failed to set up chain {}", chain.id))?;
            schedulers.push(scheduler);
            handles.insert(chain.id.clone(), handle);
        }

        Ok(Self {
            settings,
            core_metrics: metrics,
            schedulers,
            handles,
        })
    }

    async fn run(self) -> Result<()> {
        let wait = self.settings.wait_for_initial_recalibration;
        let mut schedulers = Vec::with_capacity(self.schedulers.len());
        for scheduler in self.schedulers {
            schedulers.push(scheduler.start(wait).await);
        }

        let router = ServerState::new(
            Arc::new(self.handles),
            Arc::new(self.settings.evmchains.clone()),
            Arc::new(self.settings.erc20tokens.clone()),
        )
        .router();
        let port = self.core_metrics.listen_port();
        let server = Arc::new(Server::new(port, self.core_metrics));
        run_tasks(server.run_with_custom_router(router), schedulers).await
    }
}

/// Wait for the server task. Fails as soon as the server or one of the
/// scheduler tasks panics. A scheduler only stops on its own once the server
/// dropped its handle.
async fn run_tasks(
    mut server: JoinHandle<Result<()>>,
    schedulers: Vec<JoinHandle<()>>,
) -> Result<()> {
    tokio::select! {
        served = &mut server => served.wrap_err("Server task panicked")?,
        stopped = try_join_all(schedulers) => {
            if let Err(err) = stopped {
                error!(?err, "One of the scheduler tasks panicked");
                server.abort();
                return Err(err).wrap_err("Scheduler task panicked");
            }
            server.await.wrap_err("Server task panicked")?
        }
    }
}

/// Connect to a chain and set up the scheduler holding its faucet key.
/// `tokens` are the ERC20 tokens hosted on the chain.
#[instrument(skip_all, fields(chain = %chain.id))]
pub async fn build_scheduler<'a>(
    chain: &ChainConf,
    tokens: impl Iterator<Item = &'a TokenConf>,
    signer_conf: &SignerConf,
    metrics: DispatcherMetrics,
) -> Result<(Scheduler, SchedulerHandle)> {
    let provider = Arc::new(build_http_provider(&chain.rpc)?);
    let client = Arc::new(EthereumChainClient::new(provider));

    let signer: Signers = signer_conf.build().await?;
    let signer = signer.with_chain_id(chain.chain_id);
    info!(address = ?signer.address(), "Created faucet signer");

    let legacy = client
        .get_base_fee()
        .await
        .context("Failed to query the base fee of the chain")?
        .is_none();
    let ctx = ChainContext::from_conf(chain, legacy)?;

    let mut registry = TokenRegistry::default();
    for token in tokens {
        registry
            .register_conf(token, |address| client.token_contract(address))
            .with_context(|| format!("Invalid token {}", token.id))?;
        info!(token = token.id, "Registered token");
    }

    Ok(Scheduler::new(
        ctx,
        client,
        Arc::new(signer),
        registry,
        metrics,
    ))
}
