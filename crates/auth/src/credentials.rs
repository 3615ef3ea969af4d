use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};

use crate::AuthError;

#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Source of AWS credentials for token signing. Resolved on every connection
/// attempt so rotated role credentials are always picked up.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> Result<AwsCredentials, AuthError>;

    /// Region to sign for when the database config names none.
    fn default_region(&self) -> Option<String> {
        None
    }
}

/// The AWS SDK default chain: environment, shared profiles, SSO, web
/// identity, ECS container credentials and EC2 instance metadata.
#[derive(Debug, Clone)]
pub struct DefaultChainCredentials {
    provider: Option<SharedCredentialsProvider>,
    region: Option<String>,
}

impl DefaultChainCredentials {
    pub async fn load() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::from_sdk_config(&config)
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self {
            provider: config.credentials_provider(),
            region: config.region().map(|region| region.to_string()),
        }
    }
}

#[async_trait]
impl CredentialProvider for DefaultChainCredentials {
    async fn credentials(&self) -> Result<AwsCredentials, AuthError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            AuthError::Credentials("no AWS credentials provider is configured".to_string())
        })?;

        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| AuthError::Credentials(e.to_string()))?;

        Ok(AwsCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().map(str::to_string),
        })
    }

    fn default_region(&self) -> Option<String> {
        self.region.clone()
    }
}

/// Fixed credentials, mostly useful for tests and local tooling.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub AwsCredentials);

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self) -> Result<AwsCredentials, AuthError> {
        Ok(self.0.clone())
    }
}
