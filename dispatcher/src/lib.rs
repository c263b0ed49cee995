//! Per-chain dispatch of faucet drips.
//!
//! Each chain gets one [`Scheduler`] task owning the faucet account's nonce
//! and cached balances. Callers talk to it through a [`SchedulerHandle`].

#![deny(clippy::unwrap_used, clippy::panic)]

pub use error::DispatchError;
pub use metrics::DispatcherMetrics;
pub use registry::{Asset, TokenRegistry};
pub use request::{
    DripRequest, PendingDrip, RequestId, RequestOutcome, RequestStatus, SendTokenResponse,
};
pub use scheduler::{ChainContext, Scheduler, SchedulerHandle};

mod draft;
mod error;
mod metrics;
mod registry;
mod request;
mod scheduler;
