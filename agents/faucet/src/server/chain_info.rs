//! Faucet address, balances and usage of a chain

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};

use faucet_dispatcher::SchedulerHandle;

use super::{
    utils::{ResponseErrorBody, ServerErrorResponse, ServerResult, ServerSuccessResponse},
    ServerState,
};

/// Selects a chain, and optionally one of its tokens
#[derive(Clone, Debug, Deserialize)]
pub struct QueryParams {
    /// Chain id
    #[serde(default)]
    pub chain: String,
    /// Token id
    #[serde(default)]
    pub erc20: Option<String>,
}

/// Faucet account of a chain
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AddressResponseBody {
    /// Checksummed address, absent for unknown chains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Cached balance
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BalanceResponseBody {
    /// Base units, as a decimal string
    pub balance: String,
}

/// Share of the admission limit in use
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UsageResponseBody {
    /// Percent
    pub usage: f64,
}

impl ServerState {
    fn known_handle(
        &self,
        chain: &str,
    ) -> Result<&SchedulerHandle, ServerErrorResponse<ResponseErrorBody>> {
        self.handle(chain).ok_or_else(|| {
            tracing::debug!(chain, "No chain found");
            ServerErrorResponse::bad_request(format!("No chain found {chain}!"))
        })
    }
}

fn stopped(err: impl std::fmt::Display) -> ServerErrorResponse<ResponseErrorBody> {
    ServerErrorResponse::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        ResponseErrorBody::new(err.to_string()),
    )
}

/// Address the chain's drips are sent from
pub async fn faucet_address_handler(
    State(state): State<ServerState>,
    Query(query_params): Query<QueryParams>,
) -> ServerSuccessResponse<AddressResponseBody> {
    let address = state
        .handle(&query_params.chain)
        .map(|handle| to_checksum(&handle.faucet_address(), None));
    ServerSuccessResponse::new(AddressResponseBody { address })
}

/// Cached balance of the native asset, or of `erc20` if it is a token of
/// the chain
pub async fn balance_handler(
    State(state): State<ServerState>,
    Query(query_params): Query<QueryParams>,
) -> ServerResult<BalanceResponseBody> {
    let QueryParams { chain, erc20 } = query_params;
    let handle = state.known_handle(&chain)?;
    let balance = handle.balance(erc20.as_deref()).await.map_err(stopped)?;
    Ok(ServerSuccessResponse::new(BalanceResponseBody {
        balance: balance.to_string(),
    }))
}

/// Percentage of the admission limit taken by pending requests
pub async fn usage_handler(
    State(state): State<ServerState>,
    Query(query_params): Query<QueryParams>,
) -> ServerResult<UsageResponseBody> {
    let handle = state.known_handle(&query_params.chain)?;
    let usage = handle.faucet_usage().await.map_err(stopped)?;
    Ok(ServerSuccessResponse::new(UsageResponseBody { usage }))
}
