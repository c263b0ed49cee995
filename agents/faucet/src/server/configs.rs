//! Chain and token configs for the web client

use axum::{extract::State, Json};

use faucet_base::settings::{ChainConf, TokenConf};

use super::ServerState;

/// Configs of every chain, without their rpc urls
pub async fn chains_handler(State(state): State<ServerState>) -> Json<Vec<ChainConf>> {
    Json(state.chains.as_ref().clone())
}

/// Configs of every token, with the fields inherited from the host chain
pub async fn tokens_handler(State(state): State<ServerState>) -> Json<Vec<TokenConf>> {
    Json(state.tokens.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::test_utils::{request::parse_body_to_json, setup_test_server};

    async fn get_json(app: Router, uri: &str) -> Value {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("Failed to build request"),
            )
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::OK);
        parse_body_to_json(response.into_body()).await
    }

    #[tokio::test]
    async fn chain_configs_hide_the_rpc() {
        let app = setup_test_server(vec!["C"]).await;

        let chains = get_json(app, "/api/getChainConfigs").await;
        assert_eq!(chains[0]["ID"], json!("C"));
        assert_eq!(chains[0]["CHAINID"], json!(43113));
        assert_eq!(chains[0]["DRIP_AMOUNT"], json!("1"));
        assert!(chains[0].get("RPC").is_none());
    }

    #[tokio::test]
    async fn token_configs_carry_inherited_fields() {
        let app = setup_test_server(vec!["C"]).await;

        let tokens = get_json(app, "/api/getTokenConfigs").await;
        assert_eq!(tokens[0]["ID"], json!("USDC"));
        assert_eq!(tokens[0]["HOSTID"], json!("C"));
        assert_eq!(tokens[0]["CHAINID"], json!(43113));
        assert_eq!(tokens[0]["MAX_FEE"], json!("100000000000"));
    }
}
