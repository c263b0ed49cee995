use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use prometheus::Registry;
use serde_json::json;

use faucet_base::settings::Settings;
use faucet_core::{
    mocks::{MockChainClient, MockSigner, MockTokenContract},
    Address, Bytes, SignedTransaction, H256, U256,
};
use faucet_dispatcher::{ChainContext, DispatcherMetrics, Scheduler, TokenRegistry};

use crate::server::ServerState;

pub mod request;

/// Native balance of every test faucet, 10 units
pub const FAUCET_BALANCE: &str = "10000000000000000000";

/// Hash the mock signer gives the transaction with this nonce
pub fn tx_hash_of_nonce(nonce: u64) -> H256 {
    H256::from_low_u64_be(nonce + 1)
}

pub fn test_settings() -> Settings {
    let mut settings: Settings = serde_json::from_value(json!({
        "evmchains": [{
            "ID": "C",
            "NAME": "Fuji (C-Chain)",
            "TOKEN": "AVAX",
            "RPC": "http://127.0.0.1:9650/ext/bc/C/rpc",
            "CHAINID": 43113,
            "EXPLORER": "https://testnet.snowtrace.io",
            "MAX_PRIORITY_FEE": "2000000000",
            "MAX_FEE": "100000000000",
            "DRIP_AMOUNT": "1"
        }],
        "erc20tokens": [{
            "ID": "USDC",
            "NAME": "USD Coin",
            "TOKEN": "USDC",
            "HOSTID": "C",
            "CONTRACTADDRESS": "0xcccccccccccccccccccccccccccccccccccccccc",
            "GASLIMIT": "100000",
            "DRIP_AMOUNT": "10",
            "DECIMALS": 6
        }]
    }))
    .expect("Invalid test settings");
    settings
        .finalize(|_| None)
        .expect("Failed to finalize test settings");
    settings
}

fn mock_client() -> MockChainClient {
    let balance = U256::from_dec_str(FAUCET_BALANCE).expect("Invalid balance");
    let mut client = MockChainClient::new();
    client
        .expect_is_address_valid()
        .returning(faucet_ethereum::is_valid_address);
    client.expect_get_nonce().returning(|_| Ok(U256::zero()));
    client
        .expect_get_native_balance()
        .returning(move |_| Ok(balance));
    client
        .expect_submit_signed_transaction()
        .returning(|raw| Ok(H256::from_slice(&raw)));
    client
}

fn mock_signer() -> MockSigner {
    let mut signer = MockSigner::new();
    signer
        .expect_address()
        .return_const(Address::repeat_byte(0xfa));
    signer.expect_sign().returning(|draft| {
        let nonce = draft.nonce().map(|n| n.as_u64()).unwrap_or_default();
        let tx_hash = tx_hash_of_nonce(nonce);
        Ok(SignedTransaction::new(
            tx_hash,
            Bytes::from(tx_hash.as_bytes().to_vec()),
        ))
    });
    signer
}

fn mock_token(address: Address) -> MockTokenContract {
    let mut contract = MockTokenContract::new();
    contract.expect_address().return_const(address);
    contract
        .expect_transfer_calldata()
        .returning(|_, _| Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]));
    contract
        .expect_balance_of()
        .returning(|_| Ok(U256::from(100_000_000u64)));
    contract
}

/// A router over started schedulers of the chains in `chain_ids`, backed by
/// mocks
pub async fn setup_test_server(chain_ids: Vec<&str>) -> Router {
    let settings = test_settings();
    let metrics = DispatcherMetrics::new(Registry::new()).expect("Failed to register metrics");

    let mut handles = BTreeMap::new();
    let chains = settings
        .evmchains
        .iter()
        .filter(|c| chain_ids.contains(&c.id.as_str()));
    for chain in chains {
        let mut registry = TokenRegistry::default();
        for token in settings.tokens_on(&chain.id) {
            registry
                .register_conf(token, |address| Arc::new(mock_token(address)))
                .expect("Failed to register token");
        }
        let ctx = ChainContext::from_conf(chain, false).expect("Invalid chain");
        let (scheduler, handle) = Scheduler::new(
            ctx,
            Arc::new(mock_client()),
            Arc::new(mock_signer()),
            registry,
            metrics.clone(),
        );
        let _ = scheduler.start(true).await;
        handles.insert(chain.id.clone(), handle);
    }

    ServerState::new(
        Arc::new(handles),
        Arc::new(settings.evmchains.clone()),
        Arc::new(settings.erc20tokens.clone()),
    )
    .router()
}
