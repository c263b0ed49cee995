//! Sends one drip of a chain's native asset from a KMS key, e.g. to move
//! funds off a retired faucet key.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::iter;

use clap::Parser;
use eyre::{bail, eyre, Result};
use tracing::info;

use faucet_agent::build_scheduler;
use faucet_base::settings::{LoadableFromSettings, Settings, SignerConf, TokenConf};
use faucet_dispatcher::DispatcherMetrics;

/// Chain parameters are read from the faucet config file in `CONFIG_FILE`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RPC url of the chain, replaces the configured one
    #[arg(long, env = "RPC_URL")]
    rpc_url: String,
    /// Region of the KMS key
    #[arg(long, env = "AWS_REGION")]
    aws_region: String,
    /// Id of the KMS key holding the funds
    #[arg(long, env = "KMS_KEY_ID")]
    kms_key_id: String,
    /// `ID` of the chain in the config file
    #[arg(long, env = "CHAIN_ID")]
    chain_id: String,
    /// Receiver of the funds
    #[arg(long, env = "RECIPIENT")]
    recipient: String,
    /// Whole native units to send
    #[arg(long, default_value = "1")]
    amount: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(feature = "color-eyre")]
    color_eyre::install()?;

    let args = Args::parse();
    let settings = Settings::load()?;
    settings.log.start_tracing()?;

    let mut chain = settings
        .chain(&args.chain_id)
        .cloned()
        .ok_or_else(|| eyre!("Unknown chain {}", args.chain_id))?;
    chain.rpc = args.rpc_url;
    chain.drip_amount = args.amount.clone();

    let signer_conf = SignerConf::Aws {
        id: args.kms_key_id,
        region: args.aws_region,
    };
    let metrics = settings.metrics("fund-wallet")?;
    let dispatcher_metrics = DispatcherMetrics::new(metrics.registry())?;

    let (scheduler, handle) =
        build_scheduler(&chain, iter::empty::<&TokenConf>(), &signer_conf, dispatcher_metrics)
            .await?;
    let task = scheduler.start(true).await;

    let response = handle.send_token(&args.recipient, None).await;
    drop(handle);
    if response.status != 200 {
        bail!("Failed to send tokens: {}", response.message);
    }
    info!(
        "Successfully transferred {} {} to {}: {}/tx/{:?}",
        args.amount,
        chain.token,
        args.recipient,
        chain.explorer,
        response.tx_hash.unwrap_or_default()
    );

    task.await?;
    Ok(())
}
