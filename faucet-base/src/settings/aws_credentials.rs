use async_trait::async_trait;
use rusoto_core::credential::{
    AutoRefreshingProvider, AwsCredentials, CredentialsError, EnvironmentProvider,
    InstanceMetadataProvider, ProvideAwsCredentials,
};
use rusoto_sts::WebIdentityProvider;

/// Provides AWS credentials for the KMS signer, trying in order:
/// 1) `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` from the environment.
/// 2) `WebIdentityProvider`, configured from `AWS_WEB_IDENTITY_TOKEN_FILE`,
///    `AWS_ROLE_ARN` and `AWS_ROLE_SESSION_NAME`, for pods using IRSA.
/// 3) `InstanceMetadataProvider`, for EC2 hosts with an instance profile.
pub(crate) struct AwsChainCredentialsProvider {
    environment_provider: EnvironmentProvider,
    web_identity_provider: AutoRefreshingProvider<WebIdentityProvider>,
    instance_metadata_provider: AutoRefreshingProvider<InstanceMetadataProvider>,
}

impl AwsChainCredentialsProvider {
    pub fn new() -> Result<Self, CredentialsError> {
        // cache credentials until they expire instead of fetching on every call
        Ok(AwsChainCredentialsProvider {
            environment_provider: EnvironmentProvider::default(),
            web_identity_provider: AutoRefreshingProvider::new(
                WebIdentityProvider::from_k8s_env(),
            )?,
            instance_metadata_provider: AutoRefreshingProvider::new(
                InstanceMetadataProvider::new(),
            )?,
        })
    }
}

#[async_trait]
impl ProvideAwsCredentials for AwsChainCredentialsProvider {
    async fn credentials(&self) -> Result<AwsCredentials, CredentialsError> {
        if let Ok(creds) = self.environment_provider.credentials().await {
            return Ok(creds);
        }

        match self.web_identity_provider.credentials().await {
            Ok(creds) => {
                tracing::debug!("Using AWS credentials from web identity provider");
                return Ok(creds);
            }
            Err(e) => tracing::debug!(error = ?e, "Web identity provider failed"),
        }

        self.instance_metadata_provider
            .credentials()
            .await
            .map(|creds| {
                tracing::info!("Using AWS credentials from EC2 instance metadata");
                creds
            })
            .map_err(|e| {
                tracing::error!(error = ?e, "All AWS credential providers failed");
                e
            })
    }
}
