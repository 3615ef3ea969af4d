use chrono::Utc;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

pub mod config;
pub mod credentials;
pub mod sigv4;

pub use config::*;
pub use credentials::*;
pub use sigv4::*;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Credential resolution failed: {0}")]
    Credentials(String),

    #[error("Database connection failed: {0}")]
    Connect(#[from] sqlx::Error),
}

/// Resolves credentials and opens PostgreSQL connections.
///
/// Nothing is cached: every call to [`connect`](Self::connect) resolves AWS
/// credentials, signs a fresh IAM token and opens a new TLS connection.
pub struct ConnectionAuthenticator {
    config: DatabaseConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl ConnectionAuthenticator {
    pub fn new(config: DatabaseConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { config, credentials }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub async fn connect(&self) -> Result<PgConnection, AuthError> {
        self.connect_with(|options| async move { PgConnection::connect_with(&options).await })
            .await
    }

    /// Runs the authentication sequence with a caller-supplied connector.
    pub async fn connect_with<C, F, Fut>(&self, open: F) -> Result<C, AuthError>
    where
        F: Fn(PgConnectOptions) -> Fut,
        Fut: Future<Output = Result<C, sqlx::Error>>,
    {
        let target = self.config.target()?;

        match self.config.auth_mode {
            AuthMode::Password => {
                let password = self.config.password().ok_or_else(|| {
                    AuthError::Configuration(
                        "auth_mode is 'password' but no password is configured".to_string(),
                    )
                })?;
                Ok(open(self.connect_options(&target, password)).await?)
            }
            AuthMode::Iam => {
                let attempt = match self.token(&target).await {
                    Ok(token) => open(self.connect_options(&target, &token))
                        .await
                        .map_err(AuthError::from),
                    Err(e) => Err(e),
                };

                match attempt {
                    Ok(connection) => Ok(connection),
                    Err(e) if !self.config.password_fallback => Err(e),
                    Err(e) => {
                        let password = self.config.password().ok_or_else(|| {
                            AuthError::Configuration(format!(
                                "IAM authentication failed ({}) and no fallback password is configured",
                                e
                            ))
                        })?;

                        tracing::warn!(
                            host = %target.host,
                            username = %target.username,
                            error = %e,
                            "IAM authentication failed, falling back to static password"
                        );

                        Ok(open(self.connect_options(&target, password)).await?)
                    }
                }
            }
        }
    }

    /// Region comes from the database config, then the credential source.
    pub async fn token(&self, target: &ConnectionTarget) -> Result<String, AuthError> {
        let region = self
            .config
            .region
            .clone()
            .filter(|r| !r.is_empty())
            .or_else(|| self.credentials.default_region())
            .ok_or_else(|| {
                AuthError::Configuration("region is required for IAM authentication".to_string())
            })?;
        let credentials = self.credentials.credentials().await?;

        Ok(RdsTokenGenerator::new(region).generate(
            &credentials,
            &target.host,
            target.port,
            &target.username,
            Utc::now(),
        ))
    }

    pub fn connect_options(&self, target: &ConnectionTarget, password: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .database(&target.database)
            .username(&target.username)
            .password(password)
            .ssl_mode(self.config.ssl_mode.into())
    }
}
