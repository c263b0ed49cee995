use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

use faucet_core::{FaucetChainClient, FaucetSigner};

use crate::{
    draft::Transfer, metrics::NATIVE_LABEL, request::RequestOutcome, DispatchError,
    DispatcherMetrics, DripRequest, RequestId, RequestStatus, TokenRegistry,
};

pub use context::*;
pub use handle::SchedulerHandle;

use handle::Command;
use processing::{Event, Issuer, TrackedAsset};
use state::{Recalibration, SchedulerState};

mod context;
mod handle;
mod processing;
mod state;

#[cfg(test)]
mod tests;

const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// Owns the faucet account of one chain. Admits drip requests, issues their
/// transactions one nonce at a time and resyncs nonce and balances while
/// idle.
///
/// All state lives in the task started by [`Scheduler::start`]; callers use
/// the [`SchedulerHandle`] returned by [`Scheduler::new`].
#[derive(Debug)]
pub struct Scheduler {
    issuer: Issuer,
    metrics: DispatcherMetrics,
    state: SchedulerState,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
}

impl Scheduler {
    /// Create the scheduler of a chain. `registry` holds the chain's tokens.
    pub fn new(
        ctx: ChainContext,
        client: Arc<dyn FaucetChainClient>,
        signer: Arc<dyn FaucetSigner>,
        registry: TokenRegistry,
        metrics: DispatcherMetrics,
    ) -> (Self, SchedulerHandle) {
        let ctx = Arc::new(ctx);
        let (commands_tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (events_tx, events) = mpsc::unbounded_channel();
        let handle = SchedulerHandle::new(
            ctx.clone(),
            client.clone(),
            signer.address(),
            registry.iter().map(|asset| asset.id.clone()).collect(),
            commands_tx,
        );
        let scheduler = Self {
            issuer: Issuer {
                ctx,
                client,
                signer,
            },
            metrics,
            state: SchedulerState::new(registry),
            commands,
            events_tx,
            events,
        };
        (scheduler, handle)
    }

    fn ctx(&self) -> &ChainContext {
        &self.issuer.ctx
    }

    /// Run the scheduler until every handle is dropped and the requests it
    /// holds are resolved. With `wait_for_initial_recalibration` nonce and
    /// balances are loaded before the task starts serving requests.
    pub async fn start(mut self, wait_for_initial_recalibration: bool) -> JoinHandle<()> {
        if wait_for_initial_recalibration {
            self.state.is_recalibrating = true;
            self.state.last_recalibration = Some(Instant::now());
            let recalibration = self.issuer.recalibration(self.tracked_assets()).await;
            self.on_recalibrated(recalibration);
        }
        let span = info_span!("Scheduler", chain = %self.ctx().id);
        tokio::spawn(self.run().instrument(span))
    }

    async fn run(mut self) {
        info!(legacy = self.ctx().legacy, "Scheduler started");
        let period = self.ctx().tick_period;
        let mut tick = tokio::time::interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut accepting = true;

        loop {
            tokio::select! {
                command = self.commands.recv(), if accepting => match command {
                    Some(command) => self.on_command(command),
                    None => {
                        debug!("All handles dropped, finishing outstanding requests");
                        accepting = false;
                    }
                },
                Some(event) = self.events.recv() => self.on_event(event),
                _ = tick.tick() => {
                    self.process_next();
                    self.recalibrate_if_due();
                }
            }
            if !accepting && self.state.is_idle() && !self.state.is_recalibrating {
                break;
            }
        }
        info!("Scheduler stopped");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Submit {
                receiver,
                asset,
                respond_to,
            } => {
                let ctx = self.issuer.ctx.clone();
                let admitted = self.state.admit(&ctx, receiver, asset.as_deref());
                match &admitted {
                    Ok(pending) => debug!(request = %pending.id(), ?receiver, ?asset, "Admitted request"),
                    Err(DispatchError::AdmissionLimitExceeded) => error!(
                        limit = ctx.admission_limit,
                        "Reached the admission limit"
                    ),
                    Err(err) => warn!(%err, ?receiver, "Rejected request"),
                }
                // the caller may be gone, an admitted request is served anyway
                let _ = respond_to.send(admitted);
                self.update_in_progress();
            }
            Command::Balance { asset, respond_to } => {
                let _ = respond_to.send(self.state.balance(asset.as_deref()));
            }
            Command::Usage { respond_to } => {
                let _ = respond_to.send(self.state.non_terminal());
            }
        }
    }

    /// Move the oldest admitted request into processing
    fn process_next(&mut self) {
        let Some(request) = self.state.dequeue() else {
            return;
        };
        if self.state.is_recalibrating {
            debug!(request = %request.id, "Recalibrating, deferring request");
            self.state.defer(request.id);
            return;
        }

        if !self.state.reserve(&request) {
            error!(
                request = %request.id,
                asset = request.asset.as_deref().unwrap_or(NATIVE_LABEL),
                balance = %self.state.balance(request.asset.as_deref()),
                "Faucet balance is too low!"
            );
            self.finish(request.id, Err(DispatchError::InsufficientBalance));
            return;
        }

        let transfer = match self.transfer_of(&request) {
            Ok(transfer) => transfer,
            Err(err) => {
                self.state.refund(&request);
                self.finish(request.id, Err(err));
                return;
            }
        };
        let Some(nonce) = self.state.assign_nonce(request.id) else {
            return;
        };
        self.metrics
            .set_next_nonce(&self.ctx().id, self.state.next_nonce);
        debug!(request = %request.id, %nonce, "Assigned nonce");

        tokio::spawn(
            self.issuer
                .clone()
                .issue(request, nonce, transfer, self.events_tx.clone())
                .in_current_span(),
        );
    }

    fn transfer_of(&self, request: &DripRequest) -> Result<Transfer, DispatchError> {
        match request.asset.as_deref() {
            None => Ok(Transfer::Native {
                to: request.receiver,
                value: request.amount,
            }),
            Some(id) => {
                let asset = self
                    .state
                    .registry
                    .get(id)
                    .ok_or_else(|| DispatchError::UnknownAsset(id.to_owned()))?;
                Ok(Transfer::Token {
                    contract: asset.contract_address,
                    gas_limit: asset.gas_limit,
                    calldata: asset
                        .contract
                        .transfer_calldata(request.receiver, request.amount),
                })
            }
        }
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Signed { id, tx_hash } => self.state.set_tx_hash(id, tx_hash),
            Event::Finished { id, outcome } => self.finish(id, outcome),
            Event::Recalibrated(recalibration) => self.on_recalibrated(recalibration),
        }
    }

    /// Resolve a request that left processing
    fn finish(&mut self, id: RequestId, outcome: RequestOutcome) {
        let sent = outcome.is_ok();
        let Some((request, status)) = self.state.resolve(id, outcome.clone()) else {
            warn!(request = %id, "Finished request is unknown");
            return;
        };

        match (&outcome, status) {
            (Ok(tx_hash), _) => info!(?request, ?tx_hash, "Request has been processed"),
            (Err(DispatchError::SigningError(reason)), _) => {
                // nothing was broadcast
                self.state.refund(&request);
                error!(?request, %reason, "Signing failed");
            }
            (Err(err), RequestStatus::InFlight { nonce, tx_hash }) => error!(
                ?request,
                %nonce,
                ?tx_hash,
                reason = err.as_label(),
                %err,
                "Transaction failed after its nonce was assigned, forcing recalibration"
            ),
            (Err(err), _) => warn!(?request, %err, "Request failed"),
        }

        self.metrics.inc_processed(&self.ctx().id, sent);
        self.update_in_progress();
        self.state.force_recalibration();
    }

    fn recalibrate_if_due(&mut self) {
        let now = Instant::now();
        if !self
            .state
            .needs_recalibration(now, self.ctx().recalibrate_interval)
        {
            return;
        }
        self.state.is_recalibrating = true;
        self.state.last_recalibration = Some(now);

        let issuer = self.issuer.clone();
        let events = self.events_tx.clone();
        let assets = self.tracked_assets();
        tokio::spawn(
            async move {
                let recalibration = issuer.recalibration(assets).await;
                if events.send(Event::Recalibrated(recalibration)).is_err() {
                    warn!("Scheduler stopped before recalibration finished");
                }
            }
            .in_current_span(),
        );
    }

    fn tracked_assets(&self) -> Vec<TrackedAsset> {
        self.state
            .registry
            .iter()
            .map(|asset| TrackedAsset {
                id: asset.id.clone(),
                decimals: asset.decimals,
                contract: asset.contract.clone(),
            })
            .collect()
    }

    fn on_recalibrated(&mut self, recalibration: Recalibration) {
        self.state.apply_recalibration(recalibration);
        debug!(
            next_nonce = %self.state.next_nonce,
            native_balance = %self.state.native_balance,
            "Recalibrated"
        );
        self.update_balance_metrics();
    }

    fn update_in_progress(&self) {
        self.metrics
            .set_in_progress(&self.ctx().id, self.state.non_terminal());
    }

    fn update_balance_metrics(&self) {
        let ctx = self.ctx();
        let faucet_address = self.issuer.signer.address();
        self.metrics.set_balance(
            &ctx.id,
            NATIVE_LABEL,
            NATIVE_LABEL,
            NATIVE_LABEL,
            faucet_address,
            self.state.native_balance,
            ctx.decimals,
        );
        for asset in self.state.registry.iter() {
            self.metrics.set_balance(
                &ctx.id,
                &asset.id,
                &asset.name,
                &format!("{:?}", asset.contract_address),
                faucet_address,
                asset.balance,
                asset.decimals,
            );
        }
        self.metrics.set_next_nonce(&ctx.id, self.state.next_nonce);
    }
}
