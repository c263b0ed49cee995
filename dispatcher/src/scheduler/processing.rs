use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn, Instrument};

use faucet_core::{
    to_display_units, Address, FaucetChainClient, FaucetSigner, TokenContract, H256, U256,
};

use crate::{
    draft::{build_draft, GasPrice, Transfer},
    request::RequestOutcome,
    ChainContext, DispatchError, DripRequest, RequestId,
};

use super::state::Recalibration;

/// Sent back to the scheduler task by the work it spawned
#[derive(Debug)]
pub(crate) enum Event {
    /// The draft of a request was signed
    Signed {
        id: RequestId,
        tx_hash: H256,
    },
    /// A request left processing
    Finished { id: RequestId, outcome: RequestOutcome },
    /// A resync finished
    Recalibrated(Recalibration),
}

/// Builds, signs and submits the transaction of one request. Runs outside
/// the scheduler task so slow signers and nodes do not block it.
#[derive(Debug, Clone)]
pub(crate) struct Issuer {
    pub ctx: Arc<ChainContext>,
    pub client: Arc<dyn FaucetChainClient>,
    pub signer: Arc<dyn FaucetSigner>,
}

impl Issuer {
    /// Issue the transaction of `request` and report its outcome. Signing and
    /// submission run in a task of their own, a panic there resolves the
    /// request as a submission error.
    #[instrument(skip_all, fields(chain = %self.ctx.id, request = %request.id, nonce = %nonce))]
    pub async fn issue(
        self,
        request: DripRequest,
        nonce: U256,
        transfer: Transfer,
        events: mpsc::UnboundedSender<Event>,
    ) {
        let id = request.id;
        let work = {
            let events = events.clone();
            tokio::spawn(
                async move {
                    self.sign_and_submit(&request, nonce, transfer, &events)
                        .await
                }
                .in_current_span(),
            )
        };
        let outcome = work.await.unwrap_or_else(|err| {
            error!(%err, "Issuing the transaction panicked");
            Err(DispatchError::SubmissionError(format!(
                "Issuing the transaction panicked: {err}"
            )))
        });
        if events.send(Event::Finished { id, outcome }).is_err() {
            warn!("Scheduler stopped before the request finished");
        }
    }

    /// Read nonce and balances of the faucet account in a task of its own.
    /// A panic there yields a resync without values.
    pub async fn recalibration(&self, assets: Vec<TrackedAsset>) -> Recalibration {
        let issuer = self.clone();
        let work = tokio::spawn(
            async move {
                fetch_recalibration(
                    &issuer.ctx,
                    issuer.client.as_ref(),
                    issuer.signer.address(),
                    assets,
                )
                .await
            }
            .in_current_span(),
        );
        work.await.unwrap_or_else(|err| {
            let err = DispatchError::RecalibrationError(err.to_string());
            error!(%err, "Recalibration panicked for chain {}", self.ctx.name);
            Recalibration::default()
        })
    }

    async fn sign_and_submit(
        &self,
        request: &DripRequest,
        nonce: U256,
        transfer: Transfer,
        events: &mpsc::UnboundedSender<Event>,
    ) -> RequestOutcome {
        let gas_price = self.gas_price().await?;
        let draft = build_draft(
            self.signer.address(),
            nonce,
            self.ctx.chain_id,
            gas_price,
            transfer,
        );

        let signed = self
            .signer
            .sign(&draft)
            .await
            .map_err(|e| DispatchError::SigningError(e.to_string()))?;
        info!(?request, ?nonce, tx_hash = ?signed.tx_hash, "Request has been signed");
        let _ = events.send(Event::Signed {
            id: request.id,
            tx_hash: signed.tx_hash,
        });

        match tokio::time::timeout(
            self.ctx.submission_timeout,
            self.client.submit_signed_transaction(signed.raw),
        )
        .await
        {
            Ok(Ok(tx_hash)) => Ok(tx_hash),
            Ok(Err(err)) => Err(DispatchError::SubmissionError(err.to_string())),
            Err(_) => Err(DispatchError::SubmissionTimeout(signed.tx_hash)),
        }
    }

    async fn gas_price(&self) -> Result<GasPrice, DispatchError> {
        if !self.ctx.legacy {
            return Ok(GasPrice::Eip1559 {
                max_fee: self.ctx.max_fee,
                max_priority_fee: self.ctx.max_priority_fee,
            });
        }
        let quoted = self
            .client
            .get_gas_price()
            .await
            .map_err(|e| DispatchError::SubmissionError(e.to_string()))?;
        let gas_price = GasPrice::legacy(quoted, self.ctx.max_fee);
        debug!(?quoted, ?gas_price, "Using legacy gas price");
        Ok(gas_price)
    }
}

/// A token whose balance a resync reads
#[derive(Debug, Clone)]
pub(crate) struct TrackedAsset {
    pub id: String,
    pub decimals: u32,
    pub contract: Arc<dyn TokenContract>,
}

/// Read nonce and balances of the faucet account, one query at a time.
#[instrument(skip_all, fields(chain = %ctx.id))]
async fn fetch_recalibration(
    ctx: &ChainContext,
    client: &dyn FaucetChainClient,
    faucet_address: Address,
    assets: Vec<TrackedAsset>,
) -> Recalibration {
    let mut recalibration = Recalibration {
        nonce: log_failure(ctx, "nonce", client.get_nonce(faucet_address).await),
        native_balance: log_failure(
            ctx,
            "native balance",
            client.get_native_balance(faucet_address).await,
        ),
        asset_balances: Vec::with_capacity(assets.len()),
    };
    if let Some(balance) = recalibration.native_balance {
        info!(
            native_balance = to_display_units(balance, ctx.decimals),
            "Recalibration success for chain {} native token", ctx.name
        );
    }

    for TrackedAsset {
        id,
        decimals,
        contract,
    } in assets
    {
        let balance = log_failure(
            ctx,
            &format!("token {id} ({:?})", contract.address()),
            contract.balance_of(faucet_address).await,
        );
        if let Some(balance) = balance {
            info!(
                erc20_balance = to_display_units(balance, decimals),
                "Recalibration success for chain {} token {id}", ctx.name
            );
        }
        recalibration.asset_balances.push((id, balance));
    }
    recalibration
}

fn log_failure<T, E: std::fmt::Display>(
    ctx: &ChainContext,
    what: &str,
    result: Result<T, E>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            let err = DispatchError::RecalibrationError(err.to_string());
            error!(%err, "Recalibration failed for chain {} {what}", ctx.name);
            None
        }
    }
}
