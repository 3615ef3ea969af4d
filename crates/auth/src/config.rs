use serde::{Deserialize, Serialize};
use sqlx::postgres::PgSslMode;

use crate::AuthError;

pub const DEFAULT_PORT: u16 = 5432;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Short-lived RDS IAM token.
    #[default]
    Iam,
    /// Static password only.
    Password,
}

impl std::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iam" => Ok(AuthMode::Iam),
            "password" => Ok(AuthMode::Password),
            other => Err(format!("unknown auth mode '{}', expected 'iam' or 'password'", other)),
        }
    }
}

/// TLS requirement for PostgreSQL connections. RDS IAM authentication only
/// works over TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    #[default]
    Require,
    Prefer,
    Disable,
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "require" => Ok(SslMode::Require),
            "prefer" => Ok(SslMode::Prefer),
            "disable" => Ok(SslMode::Disable),
            other => Err(format!(
                "unknown ssl mode '{}', expected 'require', 'prefer' or 'disable'",
                other
            )),
        }
    }
}

impl From<SslMode> for PgSslMode {
    fn from(mode: SslMode) -> Self {
        match mode {
            SslMode::Require => PgSslMode::Require,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Disable => PgSslMode::Disable,
        }
    }
}

/// PostgreSQL connection parameters. Every field a deployment may forget is
/// optional here; missing values surface as configuration errors when a
/// connection is attempted.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub auth_mode: AuthMode,
    /// Allow falling back to `password` when IAM authentication fails.
    #[serde(default)]
    pub password_fallback: bool,
    #[serde(default)]
    pub ssl_mode: SslMode,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            database: None,
            username: None,
            password: None,
            region: None,
            auth_mode: AuthMode::Iam,
            password_fallback: false,
            ssl_mode: SslMode::Require,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .field("auth_mode", &self.auth_mode)
            .field("password_fallback", &self.password_fallback)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Connection target with all required parameters present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
}

impl DatabaseConfig {
    pub fn target(&self) -> Result<ConnectionTarget, AuthError> {
        let mut missing = Vec::new();
        let host = required(&self.host, "host", &mut missing);
        let database = required(&self.database, "database", &mut missing);
        let username = required(&self.username, "username", &mut missing);

        match (host, database, username) {
            (Some(host), Some(database), Some(username)) => Ok(ConnectionTarget {
                host: strip_port(host).to_string(),
                port: self.port,
                database: database.to_string(),
                username: username.to_string(),
            }),
            _ => Err(AuthError::Configuration(format!(
                "incomplete database configuration, missing: {}",
                missing.join(", ")
            ))),
        }
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> Option<&'a str> {
    let value = value.as_deref().map(str::trim).filter(|v| !v.is_empty());
    if value.is_none() {
        missing.push(name);
    }
    value
}

/// RDS endpoints are often copied with their port attached; the port is
/// configured separately.
pub fn strip_port(host: &str) -> &str {
    match host.split_once(':') {
        Some((host, _)) => host,
        None => host,
    }
}
