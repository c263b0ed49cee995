//! Settings and configuration for the faucet
//!
//! ### Configuration
//!
//! Settings are read from a single JSON file and then from the environment.
//!
//! 1. The JSON file at the path in `CONFIG_FILE`, `./config.json` by default.
//!    It lists the `evmchains` to serve and the `erc20tokens` hosted on them.
//! 2. Environment variables prefixed with `FAUCET_`, using `_` to descend
//!    into nested keys. E.g. `FAUCET_LOG_LEVEL=debug`.
//! 3. `PORT`, `LOG_LEVEL`, `LOG_FORMAT` and `WAIT_FOR_INITIAL_RECALIBRATION`
//!    override their keys. `EVM_CHAINS_{ID}_RPC` overrides the rpc url of
//!    the chain with that id.
//!
//! Signing keys never live in the config file, see [`SignerConf::from_env`].

pub use base::*;
pub use chains::*;
pub use signers::*;
pub use trace::*;

/// AWS Credentials provider.
pub(crate) mod aws_credentials;
mod base;
/// Chain and token configuration
mod chains;
pub mod loader;
/// Signer configuration
mod signers;
/// Tracing subscriber management
mod trace;

use once_cell::sync::OnceCell;
use rusoto_kms::KmsClient;

static KMS_CLIENT: OnceCell<KmsClient> = OnceCell::new();
