use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, instrument, warn};

use faucet_core::{Address, FaucetChainClient, U256};

use crate::{ChainContext, DispatchError, PendingDrip, SendTokenResponse};

/// Requests a [`SchedulerHandle`] makes to its scheduler task
#[derive(Debug)]
pub(crate) enum Command {
    Submit {
        receiver: Address,
        asset: Option<String>,
        respond_to: oneshot::Sender<Result<PendingDrip, DispatchError>>,
    },
    Balance {
        asset: Option<String>,
        respond_to: oneshot::Sender<U256>,
    },
    Usage {
        respond_to: oneshot::Sender<usize>,
    },
}

/// Cheap to clone entry point into one chain's scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    ctx: Arc<ChainContext>,
    client: Arc<dyn FaucetChainClient>,
    faucet_address: Address,
    assets: Arc<BTreeSet<String>>,
    commands: mpsc::Sender<Command>,
}

impl SchedulerHandle {
    pub(crate) fn new(
        ctx: Arc<ChainContext>,
        client: Arc<dyn FaucetChainClient>,
        faucet_address: Address,
        assets: BTreeSet<String>,
        commands: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            ctx,
            client,
            faucet_address,
            assets: Arc::new(assets),
            commands,
        }
    }

    /// The chain this scheduler drips on
    pub fn chain(&self) -> &ChainContext {
        &self.ctx
    }

    /// Account the faucet sends from
    pub fn faucet_address(&self) -> Address {
        self.faucet_address
    }

    /// Whether a token with this id is registered on the chain
    pub fn has_asset(&self, id: &str) -> bool {
        self.assets.contains(id)
    }

    /// Ask for a drip of `asset`, or of the native asset if `None`, to
    /// `receiver`. Returns once the request was admitted or rejected.
    #[instrument(skip(self), fields(chain = %self.ctx.id))]
    pub async fn submit(
        &self,
        receiver: &str,
        asset: Option<&str>,
    ) -> Result<PendingDrip, DispatchError> {
        let invalid = || DispatchError::InvalidAddress(receiver.to_owned());
        if !self.client.is_address_valid(receiver) {
            warn!("Rejecting request with invalid address");
            return Err(invalid());
        }
        let receiver: Address = receiver.parse().map_err(|_| invalid())?;

        let (respond_to, admitted) = oneshot::channel();
        self.send(Command::Submit {
            receiver,
            asset: asset.map(str::to_owned),
            respond_to,
        })
        .await?;
        let pending = admitted.await.map_err(|_| self.stopped())??;
        info!(request = %pending.id(), "Request has been added to the queue");
        Ok(pending)
    }

    /// Submit a drip and wait for its outcome
    pub async fn send_token(&self, receiver: &str, asset: Option<&str>) -> SendTokenResponse {
        let outcome = match self.submit(receiver, asset).await {
            Ok(pending) => pending.outcome().await,
            Err(err) => Err(err),
        };
        let response = SendTokenResponse::from_outcome(&self.ctx.name, outcome);
        info!(
            chain = %self.ctx.id,
            status = response.status,
            message = %response.message,
            "Responding to drip request"
        );
        response
    }

    /// Cached balance of `asset` in base units. The native balance if
    /// `asset` is `None` or unknown.
    pub async fn balance(&self, asset: Option<&str>) -> Result<U256, DispatchError> {
        let (respond_to, balance) = oneshot::channel();
        self.send(Command::Balance {
            asset: asset.map(str::to_owned),
            respond_to,
        })
        .await?;
        balance.await.map_err(|_| self.stopped())
    }

    /// Share of the admission limit in use, in percent
    pub async fn faucet_usage(&self) -> Result<f64, DispatchError> {
        let (respond_to, usage) = oneshot::channel();
        self.send(Command::Usage { respond_to }).await?;
        let non_terminal = usage.await.map_err(|_| self.stopped())?;
        Ok(100.0 * non_terminal as f64 / self.ctx.admission_limit.max(1) as f64)
    }

    async fn send(&self, command: Command) -> Result<(), DispatchError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| self.stopped())
    }

    fn stopped(&self) -> DispatchError {
        DispatchError::SchedulerStopped(self.ctx.id.clone())
    }
}
