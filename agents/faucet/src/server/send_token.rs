//! Drip requests

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::{utils::ServerErrorResponse, ServerState};

/// Body of a drip request
#[derive(Clone, Debug, Deserialize)]
pub struct RequestBody {
    /// Receiver of the drip
    #[serde(default)]
    pub address: String,
    /// Id of the chain to drip on
    #[serde(default)]
    pub chain: String,
    /// Id of the ERC20 token to drip, the native asset if absent
    #[serde(default)]
    pub erc20: Option<String>,
}

/// Drip to an address and answer once the transaction was submitted or the
/// request failed.
///
/// Example request
/// ```json
/// {
///     "address": "0x8db97C7cEcE249c2b98bDC0226Cc4C2A57BF52FC",
///     "chain": "C",
///     "erc20": "USDC"
/// }
/// ```
pub async fn handler(
    State(state): State<ServerState>,
    Json(payload): Json<RequestBody>,
) -> Response {
    let RequestBody {
        address,
        chain,
        erc20,
    } = payload;

    let Some(handle) = state.handle(&chain) else {
        tracing::debug!(chain, "Drip requested on unknown chain");
        return ServerErrorResponse::bad_request("Invalid parameters passed!").into_response();
    };

    // clients send the native token's id as erc20 too
    let erc20 = erc20.filter(|id| handle.has_asset(id));

    let response = handle.send_token(&address, erc20.as_deref()).await;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(response)).into_response()
}
