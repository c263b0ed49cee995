//! The faucet HTTP API, served next to `/metrics` by the base server.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use derive_new::new;

use faucet_base::settings::{ChainConf, TokenConf};
use faucet_dispatcher::SchedulerHandle;

pub mod chain_info;
pub mod configs;
pub mod send_token;
pub mod utils;

/// Scheduler handles by chain id, plus the configs served to clients
#[derive(Clone, Debug, new)]
pub struct ServerState {
    /// Scheduler of each chain, by chain id
    pub handles: Arc<BTreeMap<String, SchedulerHandle>>,
    /// Served by `/api/getChainConfigs`
    pub chains: Arc<Vec<ChainConf>>,
    /// Served by `/api/getTokenConfigs`
    pub tokens: Arc<Vec<TokenConf>>,
}

impl ServerState {
    /// Routes of the faucet API
    pub fn router(self) -> Router {
        let api = Router::new()
            .route("/sendToken", post(send_token::handler))
            .route("/getChainConfigs", get(configs::chains_handler))
            .route("/getTokenConfigs", get(configs::tokens_handler))
            .route("/faucetAddress", get(chain_info::faucet_address_handler))
            .route("/getBalance", get(chain_info::balance_handler))
            .route("/faucetUsage", get(chain_info::usage_handler));

        Router::new()
            .nest("/api", api)
            .route("/health", get(health_handler))
            .with_state(self)
    }

    fn handle(&self, chain: &str) -> Option<&SchedulerHandle> {
        self.handles.get(chain)
    }
}

async fn health_handler() -> &'static str {
    "Server healthy"
}
