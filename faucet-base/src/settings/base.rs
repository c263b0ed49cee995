use std::{collections::HashSet, env, sync::Arc};

use eyre::{bail, Result};
use serde::Deserialize;
use tracing::debug;

use crate::{
    settings::{
        chains::{ChainConf, TokenConf},
        loader::{config_file_path, load_settings},
        trace::TracingConfig,
    },
    CoreMetrics,
};

/// Port the HTTP server listens on when `PORT` is unset
pub const DEFAULT_PORT: u16 = 8000;

/// Settings. Usually this should be treated as a base config and used as
/// follows:
///
/// ```
/// use faucet_base::settings::Settings;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// pub struct MySettings {
///     #[serde(flatten)]
///     base: Settings,
///     #[serde(default)]
///     verbose: bool,
/// }
///
/// impl AsRef<Settings> for MySettings {
///     fn as_ref(&self) -> &Settings {
///         &self.base
///     }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// EVM chains served by the faucet
    #[serde(default, alias = "EVMCHAINS")]
    pub evmchains: Vec<ChainConf>,
    /// ERC20 tokens, each hosted on one of `evmchains`
    #[serde(default, alias = "ERC20TOKENS")]
    pub erc20tokens: Vec<TokenConf>,
    /// Port of the HTTP server, which also serves `/metrics`
    #[serde(default = "default_port")]
    pub port: u16,
    /// The tracing configuration
    #[serde(default)]
    pub log: TracingConfig,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Settings of an agent defined from configuration
pub trait LoadableFromSettings: AsRef<Settings> + Sized {
    /// Create a new instance of these settings by reading the configs and env
    /// vars.
    fn load() -> Result<Self>;
}

impl LoadableFromSettings for Settings {
    fn load() -> Result<Self> {
        let mut settings: Settings = load_settings(config_file_path())?;
        settings.finalize(|name| env::var(name).ok())?;
        Ok(settings)
    }
}

impl AsRef<Settings> for Settings {
    fn as_ref(&self) -> &Settings {
        self
    }
}

impl Settings {
    /// Apply the `EVM_CHAINS_{ID}_RPC` overrides, check that ids are unique
    /// and that every token has a host chain, then let tokens inherit their
    /// unset fields from it.
    pub fn finalize(&mut self, lookup_env: impl Fn(&str) -> Option<String>) -> Result<()> {
        let mut chain_ids = HashSet::new();
        for chain in self.evmchains.iter_mut() {
            if !chain_ids.insert(chain.id.clone()) {
                bail!("Duplicate chain ID {}", chain.id);
            }
            if let Some(rpc) = lookup_env(&format!("EVM_CHAINS_{}_RPC", chain.id)) {
                debug!(chain = chain.id, "Overriding rpc url from environment");
                chain.rpc = rpc;
            }
        }

        let mut token_ids = HashSet::new();
        for token in self.erc20tokens.iter_mut() {
            if !token_ids.insert(token.id.clone()) {
                bail!("Duplicate token ID {}", token.id);
            }
            let Some(host) = self.evmchains.iter().find(|c| c.id == token.host_id) else {
                bail!(
                    "Token {} is hosted on unknown chain {}",
                    token.id,
                    token.host_id
                );
            };
            token.inherit_from(host);
        }
        Ok(())
    }

    /// Configuration of the chain with this id
    pub fn chain(&self, id: &str) -> Option<&ChainConf> {
        self.evmchains.iter().find(|c| c.id == id)
    }

    /// Tokens hosted on the chain with this id
    pub fn tokens_on<'a>(&'a self, chain_id: &'a str) -> impl Iterator<Item = &'a TokenConf> {
        self.erc20tokens
            .iter()
            .filter(move |t| t.host_id == chain_id)
    }

    /// Create the core metrics from the settings given the name of the agent.
    pub fn metrics(&self, name: &str) -> Result<Arc<CoreMetrics>> {
        Ok(Arc::new(CoreMetrics::new(
            name,
            self.port,
            prometheus::Registry::new(),
        )?))
    }
}
