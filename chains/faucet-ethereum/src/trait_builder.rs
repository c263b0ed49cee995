use std::time::Duration;

use ethers::prelude::{Http, Provider};
use reqwest::{Client, Url};
use thiserror::Error;

use faucet_core::{ChainCommunicationError, ChainResult};

const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// An error when connecting to an ethereum provider.
#[derive(Error, Debug)]
pub enum EthereumProviderConnectionError {
    /// Underlying reqwest lib threw an error
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    /// A URL string could not be parsed
    #[error("Failed to parse url {1:?}: {0}")]
    InvalidUrl(url::ParseError, String),
}

impl From<EthereumProviderConnectionError> for ChainCommunicationError {
    fn from(e: EthereumProviderConnectionError) -> Self {
        ChainCommunicationError::from_other(e)
    }
}

/// Build an HTTP provider for `url` with a bounded request timeout.
pub fn build_http_provider(url: &str) -> ChainResult<Provider<Http>> {
    let http_client = Client::builder()
        .timeout(HTTP_CLIENT_TIMEOUT)
        .build()
        .map_err(EthereumProviderConnectionError::from)?;
    let parsed_url = url
        .parse::<Url>()
        .map_err(|e| EthereumProviderConnectionError::InvalidUrl(e, url.to_owned()))?;
    Ok(Provider::new(Http::new_with_client(parsed_url, http_client)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_urls() {
        let err = build_http_provider("not a url").unwrap_err();
        assert!(err.to_string().contains("Failed to parse url"));
    }

    #[test]
    fn builds_for_http_urls() {
        assert!(build_http_provider("http://127.0.0.1:8545").is_ok());
    }
}
