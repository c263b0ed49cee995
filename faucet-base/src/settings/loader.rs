//! Load a settings object from the config file and the environment.

use std::{env, error::Error, fmt::Debug, path::PathBuf};

use config::{Config, Environment, File, FileFormat};
use eyre::{eyre, Context, Result};
use serde::de::DeserializeOwned;

/// Config file read when `CONFIG_FILE` is unset
pub const DEFAULT_CONFIG_FILE: &str = "./config.json";

/// Environment prefix of settings overrides, e.g. `FAUCET_LOG_LEVEL`
pub const ENV_PREFIX: &str = "FAUCET";

/// Path of the config file to load
pub fn config_file_path() -> PathBuf {
    env::var("CONFIG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Deserialize a settings object from the config file at `path` and the
/// process environment.
pub fn load_settings<T>(path: PathBuf) -> Result<T>
where
    T: DeserializeOwned + Debug,
{
    if !path.is_file() {
        return Err(eyre!("Config file {path:?} does not exist or is not a file"));
    }

    let config_deserializer = Config::builder()
        .add_source(File::from(path.clone()).format(FileFormat::Json))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("_")
                .try_parsing(true),
        )
        .set_override_option("port", env_var_parsed::<i64>("PORT")?)?
        .set_override_option("log.level", env::var("LOG_LEVEL").ok())?
        .set_override_option("log.fmt", env::var("LOG_FORMAT").ok())?
        .set_override_option(
            "wait_for_initial_recalibration",
            env_var_parsed::<bool>("WAIT_FOR_INITIAL_RECALIBRATION")?,
        )?
        .build()
        .with_context(|| format!("Failed to load config sources from {path:?}"))?;

    Config::try_deserialize::<T>(config_deserializer).or_else(|err| {
        let source = err.source().map(|e| format!("Config error source: {e}"));
        let report = eyre::Report::new(err);
        Err(match source {
            Some(source) => report.wrap_err(source),
            None => report,
        })
    })
}

fn env_var_parsed<V>(name: &str) -> Result<Option<V>>
where
    V: std::str::FromStr,
    V::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<V>()
            .map(Some)
            .with_context(|| format!("Invalid value {raw:?} for {name}")),
        Err(_) => Ok(None),
    }
}
