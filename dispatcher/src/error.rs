use faucet_core::H256;

/// Everything that can go wrong with a drip. Callers only ever see the
/// message, see [`crate::SendTokenResponse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The receiver is not a well formed address on the chain
    #[error("Invalid address {0}")]
    InvalidAddress(String),
    /// Too many requests are already waiting or in flight
    #[error("High faucet usage! Please try after sometime")]
    AdmissionLimitExceeded,
    /// No asset with this id is registered on the chain
    #[error("Unknown asset {0}")]
    UnknownAsset(String),
    /// The cached balance does not cover the drip amount
    #[error("Faucet balance is too low! Please try later.")]
    InsufficientBalance,
    /// The signing backend failed, nothing was broadcast
    #[error("{0}")]
    SigningError(String),
    /// The node did not answer the submission in time. The transaction may
    /// still land.
    #[error("Timeout reached for transaction {0:?}")]
    SubmissionTimeout(H256),
    /// The node rejected the submission or could not be reached
    #[error("{0}")]
    SubmissionError(String),
    /// Resyncing nonce or balances failed. Logged, never returned to callers.
    #[error("Recalibration failed: {0}")]
    RecalibrationError(String),
    /// The scheduler task of the chain is gone
    #[error("Faucet for chain {0} is not running")]
    SchedulerStopped(String),
}

impl DispatchError {
    /// Whether the request was turned away before it was admitted
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DispatchError::InvalidAddress(_)
                | DispatchError::AdmissionLimitExceeded
                | DispatchError::UnknownAsset(_)
        )
    }

    /// Label used by the processed requests counter
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            DispatchError::InvalidAddress(_) => "invalid_address",
            DispatchError::AdmissionLimitExceeded => "admission_limit_exceeded",
            DispatchError::UnknownAsset(_) => "unknown_asset",
            DispatchError::InsufficientBalance => "insufficient_balance",
            DispatchError::SigningError(_) => "signing_error",
            DispatchError::SubmissionTimeout(_) => "submission_timeout",
            DispatchError::SubmissionError(_) => "submission_error",
            DispatchError::RecalibrationError(_) => "recalibration_error",
            DispatchError::SchedulerStopped(_) => "scheduler_stopped",
        }
    }
}
