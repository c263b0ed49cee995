//! Serves the faucet HTTP API for every configured chain.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use eyre::Result;

use faucet_agent::Faucet;
use faucet_base::agent_main;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    // Logging is not initialised at this point, so, using `println!`
    println!("Faucet starting up...");

    agent_main::<Faucet>().await
}
