use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_auth::{ConnectionAuthenticator, DatabaseConfig, DefaultChainCredentials};

pub mod error;
pub mod models;
pub mod repository;
pub mod schema;
pub mod service;
pub mod validation;

pub use error::*;
pub use models::*;
pub use repository::*;
pub use service::*;

pub const DEFAULT_SQLITE_URL: &str = "sqlite:./storefront.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Sqlite { database_url: String },
    Postgres(DatabaseConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            database_url: DEFAULT_SQLITE_URL.to_string(),
        }
    }
}

pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ProductStore>, CatalogError> {
    match config {
        StoreConfig::Sqlite { database_url } => {
            let store = SqliteProductStore::connect(database_url).await?;
            Ok(Arc::new(store))
        }
        StoreConfig::Postgres(database) => {
            let credentials = DefaultChainCredentials::load().await;
            let authenticator = ConnectionAuthenticator::new(database.clone(), Arc::new(credentials));
            Ok(Arc::new(PostgresProductStore::new(authenticator)))
        }
    }
}
