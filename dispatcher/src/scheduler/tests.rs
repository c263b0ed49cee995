use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing_test::traced_test;

use faucet_core::mocks::MockTokenContract;
use faucet_core::{
    Address, Bytes, ChainCommunicationError, ChainResult, FaucetChainClient, FaucetSigner,
    FaucetSignerError, SignedTransaction, TokenContract, TypedTransaction, H256, U256,
};

use super::*;
use crate::SendTokenResponse;

const RECEIVER: &str = "0x1111111111111111111111111111111111111111";

fn units(amount: u64) -> U256 {
    U256::exp10(18) * U256::from(amount)
}

/// A node that accepts everything, optionally slowly
#[derive(Debug, Default)]
struct FakeChain {
    nonce: Mutex<U256>,
    native_balance: Mutex<U256>,
    gas_price: U256,
    balance_delay: Duration,
    submit_delay: Duration,
    submit_error: Option<String>,
    balance_queries: AtomicUsize,
    /// Number of upcoming nonce and balance queries that fail
    failing_queries: AtomicUsize,
    /// The next nonce query panics
    nonce_panics: AtomicBool,
}

impl FakeChain {
    fn funded(amount: u64) -> Self {
        Self {
            native_balance: Mutex::new(units(amount)),
            ..Default::default()
        }
    }

    fn set_balance(&self, amount: u64) {
        *self.native_balance.lock().unwrap() = units(amount);
    }

    fn fail_query(&self) -> ChainResult<()> {
        let failing = self
            .failing_queries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ChainCommunicationError::from_other_str("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl FaucetChainClient for FakeChain {
    fn is_address_valid(&self, address: &str) -> bool {
        address.starts_with("0x") && address.parse::<Address>().is_ok()
    }

    #[allow(clippy::panic)]
    async fn get_nonce(&self, _address: Address) -> ChainResult<U256> {
        if self.nonce_panics.swap(false, Ordering::SeqCst) {
            panic!("node client crashed");
        }
        self.fail_query()?;
        Ok(*self.nonce.lock().unwrap())
    }

    async fn get_native_balance(&self, _address: Address) -> ChainResult<U256> {
        tokio::time::sleep(self.balance_delay).await;
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        self.fail_query()?;
        Ok(*self.native_balance.lock().unwrap())
    }

    async fn get_base_fee(&self) -> ChainResult<Option<U256>> {
        Ok(None)
    }

    async fn get_gas_price(&self) -> ChainResult<U256> {
        Ok(self.gas_price)
    }

    async fn submit_signed_transaction(&self, raw: Bytes) -> ChainResult<H256> {
        tokio::time::sleep(self.submit_delay).await;
        if let Some(err) = &self.submit_error {
            return Err(ChainCommunicationError::from_other_str(err));
        }
        let mut nonce = self.nonce.lock().unwrap();
        *nonce += U256::one();
        Ok(H256::from_slice(&raw))
    }

    fn token_contract(&self, _address: Address) -> Arc<dyn TokenContract> {
        Arc::new(MockTokenContract::new())
    }
}

/// Records every draft. The hash of a signed draft is its nonce plus one.
#[derive(Debug, Default)]
struct FakeSigner {
    drafts: Mutex<Vec<TypedTransaction>>,
    fail: bool,
    panic: bool,
}

impl FakeSigner {
    fn drafts(&self) -> Vec<TypedTransaction> {
        self.drafts.lock().unwrap().clone()
    }

    fn nonces(&self) -> Vec<u64> {
        self.drafts()
            .iter()
            .map(|d| d.nonce().unwrap().as_u64())
            .collect()
    }
}

fn hash_of_nonce(nonce: u64) -> H256 {
    H256::from_low_u64_be(nonce + 1)
}

#[async_trait]
impl FaucetSigner for FakeSigner {
    fn address(&self) -> Address {
        Address::repeat_byte(0xfa)
    }

    #[allow(clippy::panic)]
    async fn sign(&self, draft: &TypedTransaction) -> Result<SignedTransaction, FaucetSignerError> {
        if self.panic {
            panic!("signer crashed");
        }
        if self.fail {
            return Err(FaucetSignerError::from_other(std::io::Error::new(
                std::io::ErrorKind::Other,
                "kms unavailable",
            )));
        }
        self.drafts.lock().unwrap().push(draft.clone());
        let tx_hash = hash_of_nonce(draft.nonce().unwrap().as_u64());
        Ok(SignedTransaction::new(
            tx_hash,
            Bytes::from(tx_hash.as_bytes().to_vec()),
        ))
    }
}

struct Harness {
    handle: SchedulerHandle,
    chain: Arc<FakeChain>,
    signer: Arc<FakeSigner>,
    metrics: DispatcherMetrics,
    task: JoinHandle<()>,
}

async fn start_with(
    ctx: ChainContext,
    chain: FakeChain,
    signer: FakeSigner,
    registry: TokenRegistry,
    wait_for_initial_recalibration: bool,
) -> Harness {
    let chain = Arc::new(chain);
    let signer = Arc::new(signer);
    let metrics = DispatcherMetrics::dummy_instance();
    let (scheduler, handle) = Scheduler::new(
        ctx,
        chain.clone(),
        signer.clone(),
        registry,
        metrics.clone(),
    );
    let task = scheduler.start(wait_for_initial_recalibration).await;
    Harness {
        handle,
        chain,
        signer,
        metrics,
        task,
    }
}

async fn start(chain: FakeChain) -> Harness {
    start_with(
        test_context(),
        chain,
        FakeSigner::default(),
        TokenRegistry::default(),
        true,
    )
    .await
}

fn usdc_registry() -> TokenRegistry {
    let mut contract = MockTokenContract::new();
    contract
        .expect_address()
        .return_const(Address::repeat_byte(0xcc));
    contract
        .expect_transfer_calldata()
        .returning(|_, _| Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]));
    contract
        .expect_balance_of()
        .returning(|_| Ok(U256::from(100_000_000u64)));
    let mut registry = TokenRegistry::default();
    registry
        .register("USDC", "USD Coin", Arc::new(contract), 6, "10", 100_000.into())
        .unwrap();
    registry
}

#[tokio::test(start_paused = true)]
async fn drips_up_to_the_admission_limit() {
    let h = start(FakeChain::funded(10)).await;

    let first = h.handle.submit(RECEIVER, None).await.unwrap();
    let second = h.handle.submit(RECEIVER, None).await.unwrap();
    assert_eq!(h.handle.faucet_usage().await.unwrap(), 100.0);

    let third = h.handle.send_token(RECEIVER, None).await;
    assert_eq!(
        third,
        SendTokenResponse {
            status: 400,
            message: "High faucet usage! Please try after sometime".into(),
            tx_hash: None,
        }
    );

    assert_eq!(first.outcome().await, Ok(hash_of_nonce(0)));
    assert_eq!(second.outcome().await, Ok(hash_of_nonce(1)));

    let fourth = h.handle.send_token(RECEIVER, None).await;
    assert_eq!(fourth.status, 200);
    assert_eq!(fourth.message, "Transaction sent on Fuji (C-Chain)!");
    assert_eq!(fourth.tx_hash, Some(hash_of_nonce(2)));

    assert_eq!(h.signer.nonces(), vec![0, 1, 2]);
    assert_eq!(
        h.metrics
            .requests_processed
            .with_label_values(&["C", "sent"])
            .get(),
        3
    );
    assert_eq!(h.handle.faucet_usage().await.unwrap(), 0.0);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn insufficient_balance_consumes_no_nonce() {
    let h = start(FakeChain::funded(0)).await;

    let response = h.handle.send_token(RECEIVER, None).await;
    assert_eq!(response.status, 400);
    assert_eq!(
        response.message,
        "Transaction failed: Faucet balance is too low! Please try later."
    );
    assert!(h.signer.drafts().is_empty());
    assert_eq!(h.metrics.next_nonce.with_label_values(&["C"]).get(), 0);
    assert_eq!(
        h.metrics
            .requests_processed
            .with_label_values(&["C", "error"])
            .get(),
        1
    );
    assert!(logs_contain("Faucet balance is too low!"));
}

#[tokio::test(start_paused = true)]
async fn nonces_follow_admission_order() {
    let mut ctx = test_context();
    ctx.admission_limit = 5;
    let chain = FakeChain::funded(10);
    *chain.nonce.lock().unwrap() = U256::from(3);
    let h = start_with(ctx, chain, FakeSigner::default(), TokenRegistry::default(), true).await;

    let mut pending = Vec::new();
    for _ in 0..5 {
        pending.push(h.handle.submit(RECEIVER, None).await.unwrap());
    }
    for (i, drip) in pending.into_iter().enumerate() {
        assert_eq!(drip.outcome().await, Ok(hash_of_nonce(3 + i as u64)));
    }
    assert_eq!(h.signer.nonces(), vec![3, 4, 5, 6, 7]);
}

#[tokio::test(start_paused = true)]
async fn recalibrates_only_when_idle() {
    let mut ctx = test_context();
    ctx.recalibrate_interval = Duration::from_secs(1);
    let chain = FakeChain {
        submit_delay: Duration::from_secs(20),
        ..FakeChain::funded(10)
    };
    let h = start_with(ctx, chain, FakeSigner::default(), TokenRegistry::default(), true).await;
    assert_eq!(h.chain.balance_queries.load(Ordering::SeqCst), 1);

    let first = h.handle.submit(RECEIVER, None).await.unwrap();
    let second = h.handle.submit(RECEIVER, None).await.unwrap();
    h.chain.set_balance(3);

    tokio::time::sleep(Duration::from_secs(10)).await;
    // both drips reserved, the chain's new balance is not picked up
    assert_eq!(h.handle.balance(None).await.unwrap(), units(8));
    assert_eq!(h.chain.balance_queries.load(Ordering::SeqCst), 1);

    assert!(first.outcome().await.is_ok());
    assert!(second.outcome().await.is_ok());
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(h.handle.balance(None).await.unwrap(), units(3));
    assert!(h.chain.balance_queries.load(Ordering::SeqCst) >= 2);
}

#[tokio::test(start_paused = true)]
async fn defers_requests_while_recalibrating() {
    let chain = FakeChain {
        balance_delay: Duration::from_secs(3),
        ..FakeChain::funded(10)
    };
    *chain.nonce.lock().unwrap() = U256::from(9);
    let h = start_with(
        test_context(),
        chain,
        FakeSigner::default(),
        TokenRegistry::default(),
        false,
    )
    .await;

    // the first tick starts a recalibration that takes 3s
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let started = tokio::time::Instant::now();
    let pending = h.handle.submit(RECEIVER, None).await.unwrap();

    assert_eq!(pending.outcome().await, Ok(hash_of_nonce(9)));
    assert!(started.elapsed() >= Duration::from_millis(2500));
    assert_eq!(h.signer.nonces(), vec![9]);
}

#[tokio::test(start_paused = true)]
async fn legacy_chain_uses_bumped_gas_price() {
    let mut ctx = test_context();
    ctx.legacy = true;
    ctx.max_fee = U256::from(100);
    let chain = FakeChain {
        gas_price: U256::from(40),
        ..FakeChain::funded(10)
    };
    let h = start_with(ctx, chain, FakeSigner::default(), TokenRegistry::default(), true).await;

    assert_eq!(h.handle.send_token(RECEIVER, None).await.status, 200);
    let drafts = h.signer.drafts();
    assert!(matches!(
        &drafts[0],
        TypedTransaction::Legacy(tx) if tx.gas_price == Some(U256::from(50))
    ));
    assert_eq!(drafts[0].to_addr(), Some(&RECEIVER.parse::<Address>().unwrap()));
    assert_eq!(drafts[0].value(), Some(&units(1)));
    assert_eq!(drafts[0].gas(), Some(&U256::from(21_000)));
}

#[tokio::test(start_paused = true)]
async fn legacy_gas_price_is_capped() {
    let mut ctx = test_context();
    ctx.legacy = true;
    ctx.max_fee = U256::from(100);
    let chain = FakeChain {
        gas_price: U256::from(90),
        ..FakeChain::funded(10)
    };
    let h = start_with(ctx, chain, FakeSigner::default(), TokenRegistry::default(), true).await;

    assert_eq!(h.handle.send_token(RECEIVER, None).await.status, 200);
    assert!(matches!(
        &h.signer.drafts()[0],
        TypedTransaction::Legacy(tx) if tx.gas_price == Some(U256::from(100))
    ));
}

#[tokio::test(start_paused = true)]
async fn fee_market_chain_uses_configured_fees() {
    let h = start(FakeChain::funded(10)).await;

    assert_eq!(h.handle.send_token(RECEIVER, None).await.status, 200);
    let ctx = test_context();
    assert!(matches!(
        &h.signer.drafts()[0],
        TypedTransaction::Eip1559(tx)
            if tx.max_fee_per_gas == Some(ctx.max_fee)
                && tx.max_priority_fee_per_gas == Some(ctx.max_priority_fee)
    ));
}

#[tokio::test(start_paused = true)]
async fn token_drip_calls_the_contract() {
    let h = start_with(
        test_context(),
        FakeChain::funded(10),
        FakeSigner::default(),
        usdc_registry(),
        true,
    )
    .await;
    assert!(h.handle.has_asset("USDC"));
    assert_eq!(
        h.handle.balance(Some("USDC")).await.unwrap(),
        U256::from(100_000_000u64)
    );
    // unknown ids report the native balance
    assert_eq!(h.handle.balance(Some("DAI")).await.unwrap(), units(10));

    assert_eq!(h.handle.send_token(RECEIVER, Some("USDC")).await.status, 200);
    let draft = &h.signer.drafts()[0];
    assert_eq!(draft.to_addr(), Some(&Address::repeat_byte(0xcc)));
    assert_eq!(draft.value(), Some(&U256::zero()));
    assert_eq!(draft.gas(), Some(&U256::from(100_000)));
    assert_eq!(
        draft.data(),
        Some(&Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]))
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_asset_is_rejected() {
    let h = start(FakeChain::funded(10)).await;
    assert_eq!(
        h.handle.submit(RECEIVER, Some("DAI")).await.unwrap_err(),
        DispatchError::UnknownAsset("DAI".into())
    );
    assert_eq!(h.handle.faucet_usage().await.unwrap(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn invalid_address_has_no_side_effects() {
    let h = start(FakeChain::funded(10)).await;

    let response = h.handle.send_token("not-an-address", None).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.message, "Invalid address not-an-address");
    assert_eq!(h.handle.balance(None).await.unwrap(), units(10));
    assert_eq!(h.handle.faucet_usage().await.unwrap(), 0.0);

    assert_eq!(h.handle.send_token(RECEIVER, None).await.status, 200);
    assert_eq!(h.signer.nonces(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn submission_timeout_keeps_the_reservation() {
    let mut ctx = test_context();
    // between two ticks
    ctx.submission_timeout = Duration::from_millis(40_500);
    let chain = FakeChain {
        submit_delay: Duration::from_secs(60),
        ..FakeChain::funded(10)
    };
    let h = start_with(ctx, chain, FakeSigner::default(), TokenRegistry::default(), true).await;
    h.chain.set_balance(7);

    let response = h.handle.send_token(RECEIVER, None).await;
    assert_eq!(response.status, 400);
    assert_eq!(
        response.message,
        format!(
            "Transaction failed: Timeout reached for transaction {:?}",
            hash_of_nonce(0)
        )
    );
    assert_eq!(h.handle.balance(None).await.unwrap(), units(9));

    // the failure forces a resync at the next idle tick
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.handle.balance(None).await.unwrap(), units(7));
}

#[tokio::test(start_paused = true)]
async fn signing_error_refunds_the_reservation() {
    let h = start_with(
        test_context(),
        FakeChain::funded(10),
        FakeSigner {
            fail: true,
            ..Default::default()
        },
        TokenRegistry::default(),
        true,
    )
    .await;
    h.chain.set_balance(7);

    let response = h.handle.send_token(RECEIVER, None).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.message, "Transaction failed: kms unavailable");
    assert_eq!(h.handle.balance(None).await.unwrap(), units(10));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.handle.balance(None).await.unwrap(), units(7));
}

#[tokio::test(start_paused = true)]
async fn panicking_signer_resolves_the_request() {
    let h = start_with(
        test_context(),
        FakeChain::funded(10),
        FakeSigner {
            panic: true,
            ..Default::default()
        },
        TokenRegistry::default(),
        true,
    )
    .await;

    let pending = h.handle.submit(RECEIVER, None).await.unwrap();
    assert_eq!(h.handle.faucet_usage().await.unwrap(), 50.0);
    assert!(matches!(
        pending.outcome().await,
        Err(DispatchError::SubmissionError(reason))
            if reason.starts_with("Issuing the transaction panicked")
    ));
    assert_eq!(h.handle.faucet_usage().await.unwrap(), 0.0);
    assert_eq!(
        h.metrics
            .requests_processed
            .with_label_values(&["C", "error"])
            .get(),
        1
    );

    // the scheduler is idle again and resyncs
    h.chain.set_balance(7);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.handle.balance(None).await.unwrap(), units(7));
}

#[tokio::test(start_paused = true)]
async fn panicking_recalibration_clears_the_guard() {
    let mut ctx = test_context();
    ctx.recalibrate_interval = Duration::from_secs(1);
    let h = start_with(ctx, FakeChain::funded(10), FakeSigner::default(), TokenRegistry::default(), true).await;
    h.chain.nonce_panics.store(true, Ordering::SeqCst);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!h.chain.nonce_panics.load(Ordering::SeqCst));
    assert_eq!(h.handle.balance(None).await.unwrap(), units(10));

    let response = h.handle.send_token(RECEIVER, None).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.tx_hash, Some(hash_of_nonce(0)));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn failed_recalibration_keeps_serving() {
    let mut ctx = test_context();
    ctx.recalibrate_interval = Duration::from_secs(1);
    let h = start_with(ctx, FakeChain::funded(10), FakeSigner::default(), TokenRegistry::default(), true).await;
    // nonce and balance of the next resync fail
    h.chain.failing_queries.store(2, Ordering::SeqCst);
    h.chain.set_balance(3);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(h.chain.failing_queries.load(Ordering::SeqCst), 0);
    assert!(logs_contain("Recalibration failed"));
    // nothing was loaded, the cached values stay
    assert_eq!(h.handle.balance(None).await.unwrap(), units(10));

    let response = h.handle.send_token(RECEIVER, None).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.tx_hash, Some(hash_of_nonce(0)));
    assert_eq!(h.signer.nonces(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn submission_error_is_reported() {
    let chain = FakeChain {
        submit_error: Some("nonce too low".into()),
        ..FakeChain::funded(10)
    };
    let h = start(chain).await;

    let response = h.handle.send_token(RECEIVER, None).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.message, "Transaction failed: nonce too low");
    assert_eq!(
        h.metrics
            .requests_processed
            .with_label_values(&["C", "error"])
            .get(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn stops_after_handles_are_dropped() {
    let Harness { handle, task, .. } = start(FakeChain::funded(10)).await;

    let pending = handle.submit(RECEIVER, None).await.unwrap();
    drop(handle);

    assert!(pending.outcome().await.is_ok());
    task.await.unwrap();
}

#[tokio::test]
async fn stopped_scheduler_is_reported() {
    let (scheduler, handle) = Scheduler::new(
        test_context(),
        Arc::new(FakeChain::funded(1)),
        Arc::new(FakeSigner::default()),
        TokenRegistry::default(),
        DispatcherMetrics::dummy_instance(),
    );
    drop(scheduler);

    assert_eq!(
        handle.submit(RECEIVER, None).await.unwrap_err(),
        DispatchError::SchedulerStopped("C".into())
    );
    assert_eq!(handle.faucet_address(), Address::repeat_byte(0xfa));
}
