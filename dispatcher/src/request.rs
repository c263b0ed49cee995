use std::fmt::{Display, Formatter};

use derive_new::new;
use serde::Serialize;
use tokio::sync::oneshot;

use faucet_core::{Address, H256, U256};

use crate::DispatchError;

/// Identifies a request within one scheduler. Strictly increasing in
/// admission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One admitted drip
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct DripRequest {
    /// Scheduler-local id
    pub id: RequestId,
    /// Account receiving the drip
    pub receiver: Address,
    /// Registered asset id, `None` for the native asset
    pub asset: Option<String>,
    /// Amount in base units
    pub amount: U256,
}

/// Where an admitted request is in its lifecycle. Requests leave the
/// scheduler once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Waiting for a dequeue tick
    Admitted,
    /// Dequeued, nonce not assigned yet
    Queued,
    /// Nonce assigned and being signed or submitted
    InFlight {
        /// Nonce of the transaction
        nonce: U256,
        /// Known once the draft is signed
        tx_hash: Option<H256>,
    },
}

/// Result of a drip: the transaction hash once the node accepted it
pub type RequestOutcome = Result<H256, DispatchError>;

/// An admitted request. Await [`PendingDrip::outcome`] for its resolution.
/// Dropping it does not withdraw the request.
#[derive(Debug)]
pub struct PendingDrip {
    id: RequestId,
    chain: String,
    outcome: oneshot::Receiver<RequestOutcome>,
}

impl PendingDrip {
    pub(crate) fn new(
        id: RequestId,
        chain: String,
        outcome: oneshot::Receiver<RequestOutcome>,
    ) -> Self {
        Self { id, chain, outcome }
    }

    /// Id the scheduler assigned to the request
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wait until the request is resolved
    pub async fn outcome(self) -> RequestOutcome {
        self.outcome
            .await
            .unwrap_or_else(|_| Err(DispatchError::SchedulerStopped(self.chain)))
    }
}

/// What the faucet answers to a drip request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendTokenResponse {
    /// HTTP status, 200 only when the transaction was submitted
    #[serde(skip)]
    pub status: u16,
    /// Human readable result
    pub message: String,
    /// Hash of the submitted transaction
    #[serde(rename = "txHash", skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<H256>,
}

impl SendTokenResponse {
    /// Map the outcome of a drip on the chain called `chain_name` to a
    /// response
    pub fn from_outcome(chain_name: &str, outcome: RequestOutcome) -> Self {
        match outcome {
            Ok(tx_hash) => Self {
                status: 200,
                message: format!("Transaction sent on {chain_name}!"),
                tx_hash: Some(tx_hash),
            },
            Err(err) if err.is_rejection() => Self::failure(err.to_string()),
            Err(err) => Self::failure(format!("Transaction failed: {err}")),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            status: 400,
            message,
            tx_hash: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response() {
        let tx_hash = H256::repeat_byte(0xab);
        let response = SendTokenResponse::from_outcome("Fuji", Ok(tx_hash));
        assert_eq!(response.status, 200);
        assert_eq!(response.message, "Transaction sent on Fuji!");

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["message"], "Transaction sent on Fuji!");
        assert_eq!(body["txHash"], format!("{tx_hash:?}"));
        assert!(body.get("status").is_none());
    }

    #[test]
    fn rejections_keep_their_message() {
        let response = SendTokenResponse::from_outcome(
            "Fuji",
            Err(DispatchError::InvalidAddress("0x123".into())),
        );
        assert_eq!(response.status, 400);
        assert_eq!(response.message, "Invalid address 0x123");

        let response =
            SendTokenResponse::from_outcome("Fuji", Err(DispatchError::AdmissionLimitExceeded));
        assert_eq!(response.message, "High faucet usage! Please try after sometime");
        assert!(response.tx_hash.is_none());
    }

    #[test]
    fn processing_failures_are_prefixed() {
        let response =
            SendTokenResponse::from_outcome("Fuji", Err(DispatchError::InsufficientBalance));
        assert_eq!(response.status, 400);
        assert_eq!(
            response.message,
            "Transaction failed: Faucet balance is too low! Please try later."
        );

        let response = SendTokenResponse::from_outcome(
            "Fuji",
            Err(DispatchError::SubmissionError("nonce too low".into())),
        );
        assert_eq!(response.message, "Transaction failed: nonce too low");

        let body = serde_json::to_value(&response).unwrap();
        assert!(body.get("txHash").is_none());
    }
}
