//! Faucet configuration.

use std::env;

use derive_more::{AsRef, Deref};
use eyre::Result;
use serde::Deserialize;

use faucet_base::settings::{
    loader::{config_file_path, load_settings},
    LoadableFromSettings, Settings,
};

/// Settings for `Faucet`
#[derive(Debug, Deserialize, AsRef, Deref)]
pub struct FaucetSettings {
    #[serde(flatten)]
    #[as_ref]
    #[deref]
    base: Settings,

    /// Load nonce and balances of every chain before serving requests
    #[serde(default, alias = "WAIT_FOR_INITIAL_RECALIBRATION")]
    pub wait_for_initial_recalibration: bool,
}

impl FaucetSettings {
    /// Wrap already finalized base settings
    pub fn new(base: Settings, wait_for_initial_recalibration: bool) -> Self {
        Self {
            base,
            wait_for_initial_recalibration,
        }
    }
}

impl LoadableFromSettings for FaucetSettings {
    fn load() -> Result<Self> {
        let mut settings: FaucetSettings = load_settings(config_file_path())?;
        settings.base.finalize(|name| env::var(name).ok())?;
        Ok(settings)
    }
}
