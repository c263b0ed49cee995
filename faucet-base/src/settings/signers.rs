use async_trait::async_trait;
use ethers::prelude::AwsSigner;
use eyre::{bail, eyre, Context, Report};
use rusoto_core::HttpClient;
use rusoto_kms::KmsClient;
use tracing::instrument;

use crate::settings::{aws_credentials::AwsChainCredentialsProvider, KMS_CLIENT};

/// Ethereum signer types
#[derive(Clone, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SignerConf {
    /// A local hex key
    HexKey {
        /// Hex string of private key, with or without 0x prefix
        key: String,
    },
    /// An AWS signer. Note that AWS credentials must be inserted into the env
    /// separately.
    Aws {
        /// The UUID identifying the AWS KMS Key
        id: String,
        /// The AWS region
        region: String,
    },
}

impl std::fmt::Debug for SignerConf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HexKey { .. } => f.write_str("HexKey { key: <redacted> }"),
            Self::Aws { id, region } => f
                .debug_struct("Aws")
                .field("id", id)
                .field("region", region)
                .finish(),
        }
    }
}

impl SignerConf {
    /// Pick the signer of a chain from the environment.
    ///
    /// A private key in `{chain_id}` or else `PK` selects a local key.
    /// Otherwise the KMS key in `AWS_KMS_KEY_{chain_id}` is used, in the
    /// region given by `AWS_REGION`.
    pub fn from_env(chain_id: &str) -> eyre::Result<Self> {
        Self::from_lookup(chain_id, |name| std::env::var(name).ok())
    }

    /// [`SignerConf::from_env`] with an explicit variable lookup
    pub fn from_lookup(
        chain_id: &str,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> eyre::Result<Self> {
        let non_empty = |name: &str| lookup_env(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(chain_id).or_else(|| non_empty("PK")) {
            return Ok(Self::HexKey { key });
        }
        let kms_var = format!("AWS_KMS_KEY_{chain_id}");
        match (non_empty(&kms_var), non_empty("AWS_REGION")) {
            (Some(id), Some(region)) => Ok(Self::Aws { id, region }),
            (Some(_), None) => bail!("{kms_var} is set but AWS_REGION is missing"),
            _ => bail!("No signer configured for chain {chain_id}: set {chain_id}, PK or {kms_var}"),
        }
    }

    /// Try to convert the signer configuration into a signer
    #[instrument(err)]
    pub async fn build<S: BuildableWithSignerConf>(&self) -> Result<S, Report> {
        S::build(self).await
    }
}

/// Builder trait for signers
#[async_trait]
pub trait BuildableWithSignerConf: Sized {
    /// Build a signer from a conf
    async fn build(conf: &SignerConf) -> Result<Self, Report>;
}

#[async_trait]
impl BuildableWithSignerConf for faucet_ethereum::Signers {
    async fn build(conf: &SignerConf) -> Result<Self, Report> {
        Ok(match conf {
            SignerConf::HexKey { key } => faucet_ethereum::Signers::Local(
                key.trim()
                    .trim_start_matches("0x")
                    .parse()
                    .context("Invalid private key")?,
            ),
            SignerConf::Aws { id, region } => {
                let client = KMS_CLIENT.get_or_try_init(|| -> Result<KmsClient, Report> {
                    Ok(KmsClient::new_with_client(
                        rusoto_core::Client::new_with(
                            AwsChainCredentialsProvider::new()?,
                            HttpClient::new()?,
                        ),
                        region
                            .parse()
                            .map_err(|e| eyre!("Invalid AWS region {region}: {e}"))?,
                    ))
                })?;

                let signer = AwsSigner::new(client.clone(), id, 0)
                    .await
                    .context("Failed to load KMS signer")?;
                faucet_ethereum::Signers::Aws(signer)
            }
        })
    }
}
