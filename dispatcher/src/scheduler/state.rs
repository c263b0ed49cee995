use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use faucet_core::{Address, H256, U256};

use crate::{
    request::RequestOutcome, ChainContext, DispatchError, DripRequest, PendingDrip, RequestId,
    RequestStatus, TokenRegistry,
};

/// Working state of one admitted request
#[derive(Debug)]
pub(crate) struct RequestRecord {
    pub request: DripRequest,
    pub status: RequestStatus,
    respond_to: oneshot::Sender<RequestOutcome>,
}

/// Fresh values read from the chain. `None` where the query failed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Recalibration {
    pub nonce: Option<U256>,
    pub native_balance: Option<U256>,
    pub asset_balances: Vec<(String, Option<U256>)>,
}

/// Everything a scheduler owns. Only the scheduler task touches it.
#[derive(Debug)]
pub(crate) struct SchedulerState {
    pub next_nonce: U256,
    pub native_balance: U256,
    pub registry: TokenRegistry,
    pub is_recalibrating: bool,
    pub last_recalibration: Option<Instant>,
    next_request_id: u64,
    records: BTreeMap<RequestId, RequestRecord>,
}

impl SchedulerState {
    pub fn new(registry: TokenRegistry) -> Self {
        Self {
            next_nonce: U256::zero(),
            native_balance: U256::zero(),
            registry,
            is_recalibrating: false,
            last_recalibration: None,
            next_request_id: 0,
            records: BTreeMap::new(),
        }
    }

    /// Number of requests waiting or in flight
    pub fn non_terminal(&self) -> usize {
        self.records.len()
    }

    pub fn is_idle(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: RequestId) -> Option<&RequestRecord> {
        self.records.get(&id)
    }

    /// Admit a request for `asset`, the native asset if `None`.
    pub fn admit(
        &mut self,
        ctx: &ChainContext,
        receiver: Address,
        asset: Option<&str>,
    ) -> Result<PendingDrip, DispatchError> {
        if self.non_terminal() >= ctx.admission_limit {
            return Err(DispatchError::AdmissionLimitExceeded);
        }
        let amount = match asset {
            None => ctx.drip_amount,
            Some(id) => {
                self.registry
                    .get(id)
                    .ok_or_else(|| DispatchError::UnknownAsset(id.to_owned()))?
                    .drip_amount
            }
        };

        self.next_request_id = self.next_request_id.saturating_add(1);
        let id = RequestId(self.next_request_id);
        let (respond_to, outcome) = oneshot::channel();
        self.records.insert(
            id,
            RequestRecord {
                request: DripRequest::new(id, receiver, asset.map(str::to_owned), amount),
                status: RequestStatus::Admitted,
                respond_to,
            },
        );
        Ok(PendingDrip::new(id, ctx.id.clone(), outcome))
    }

    /// Take the oldest admitted request out of the queue
    pub fn dequeue(&mut self) -> Option<DripRequest> {
        let record = self
            .records
            .values_mut()
            .find(|r| r.status == RequestStatus::Admitted)?;
        record.status = RequestStatus::Queued;
        Some(record.request.clone())
    }

    /// Put a dequeued request back, it keeps its place in line
    pub fn defer(&mut self, id: RequestId) {
        if let Some(record) = self.records.get_mut(&id) {
            record.status = RequestStatus::Admitted;
        }
    }

    /// Cached balance of `asset`, the native balance for `None` or unknown ids
    pub fn balance(&self, asset: Option<&str>) -> U256 {
        asset
            .and_then(|id| self.registry.get(id))
            .map(|asset| asset.balance)
            .unwrap_or(self.native_balance)
    }

    fn balance_mut(&mut self, asset: Option<&str>) -> Option<&mut U256> {
        match asset {
            None => Some(&mut self.native_balance),
            Some(id) => self.registry.get_mut(id).map(|asset| &mut asset.balance),
        }
    }

    /// Deduct the drip from the cached balance. False if the balance does not
    /// cover it.
    pub fn reserve(&mut self, request: &DripRequest) -> bool {
        match self.balance_mut(request.asset.as_deref()) {
            Some(balance) if *balance >= request.amount => {
                *balance -= request.amount;
                true
            }
            _ => false,
        }
    }

    /// Give back a reservation of a drip that was never broadcast
    pub fn refund(&mut self, request: &DripRequest) {
        if let Some(balance) = self.balance_mut(request.asset.as_deref()) {
            *balance = balance.saturating_add(request.amount);
        }
    }

    /// Hand out the next nonce to a dequeued request. Nonces are never
    /// handed out twice until the next recalibration resyncs the counter.
    pub fn assign_nonce(&mut self, id: RequestId) -> Option<U256> {
        let record = self.records.get_mut(&id)?;
        let nonce = self.next_nonce;
        self.next_nonce = nonce.saturating_add(U256::one());
        record.status = RequestStatus::InFlight {
            nonce,
            tx_hash: None,
        };
        Some(nonce)
    }

    pub fn set_tx_hash(&mut self, id: RequestId, hash: H256) {
        if let Some(RequestRecord {
            status: RequestStatus::InFlight { tx_hash, .. },
            ..
        }) = self.records.get_mut(&id)
        {
            *tx_hash = Some(hash);
        }
    }

    /// Remove a request and deliver its outcome to the waiting caller.
    pub fn resolve(
        &mut self,
        id: RequestId,
        outcome: RequestOutcome,
    ) -> Option<(DripRequest, RequestStatus)> {
        let record = self.records.remove(&id)?;
        // the caller may have stopped waiting, the request still counts
        let _ = record.respond_to.send(outcome);
        Some((record.request, record.status))
    }

    /// Whether a resync should start now
    pub fn needs_recalibration(&self, now: Instant, interval: Duration) -> bool {
        !self.is_recalibrating
            && self.is_idle()
            && self
                .last_recalibration
                .map_or(true, |last| now.saturating_duration_since(last) > interval)
    }

    /// Make the next idle tick resync
    pub fn force_recalibration(&mut self) {
        self.last_recalibration = None;
    }

    /// Replace cached values with the ones read from the chain and clear the
    /// guard
    pub fn apply_recalibration(&mut self, recalibration: Recalibration) {
        if let Some(nonce) = recalibration.nonce {
            self.next_nonce = nonce;
        }
        if let Some(balance) = recalibration.native_balance {
            self.native_balance = balance;
        }
        for (id, balance) in recalibration.asset_balances {
            if let (Some(asset), Some(balance)) = (self.registry.get_mut(&id), balance) {
                asset.balance = balance;
            }
        }
        self.is_recalibrating = false;
    }
}
