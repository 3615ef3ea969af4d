use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf};
use storefront_auth::{AuthMode, DatabaseConfig, SslMode, DEFAULT_PORT};
use storefront_catalog::{StoreConfig, DEFAULT_SQLITE_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub https_port: Option<u16>,
    #[serde(default)]
    pub redirect_http_to_https: bool,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            tls: None,
            store: StoreConfig::default(),
        }
    }
}

impl ServerConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.bind_address, self.port).parse()?;
        Ok(addr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Sqlite,
    Postgres,
}

/// Store selection shared by the server and the CLI. Database variables
/// follow the names the deployment already exports.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Storage backend; defaults to postgres when DB_HOST is set, sqlite otherwise
    #[arg(long, env = "STOREFRONT_BACKEND", value_enum)]
    pub backend: Option<Backend>,

    #[arg(long, env = "STOREFRONT_DATABASE_URL", default_value = DEFAULT_SQLITE_URL)]
    pub database_url: String,

    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    #[arg(long, env = "DB_PORT", default_value_t = DEFAULT_PORT)]
    pub db_port: u16,

    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    #[arg(long, env = "DB_USERNAME")]
    pub db_username: Option<String>,

    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    /// iam or password
    #[arg(long, env = "DB_AUTH_MODE", default_value = "iam")]
    pub db_auth_mode: AuthMode,

    /// Use DB_PASSWORD when IAM authentication fails
    #[arg(long, env = "DB_PASSWORD_FALLBACK")]
    pub db_password_fallback: bool,

    /// require, prefer or disable
    #[arg(long, env = "DB_SSLMODE", default_value = "require")]
    pub db_sslmode: SslMode,
}

impl StoreArgs {
    pub fn into_store_config(self) -> StoreConfig {
        let backend = self.backend.unwrap_or(if self.db_host.is_some() {
            Backend::Postgres
        } else {
            Backend::Sqlite
        });

        match backend {
            Backend::Sqlite => StoreConfig::Sqlite {
                database_url: self.database_url,
            },
            Backend::Postgres => StoreConfig::Postgres(DatabaseConfig {
                host: self.db_host,
                port: self.db_port,
                database: self.db_name,
                username: self.db_username,
                password: self.db_password,
                region: self.aws_region,
                auth_mode: self.db_auth_mode,
                password_fallback: self.db_password_fallback,
                ssl_mode: self.db_sslmode,
            }),
        }
    }
}
