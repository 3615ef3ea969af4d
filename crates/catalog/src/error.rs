use storefront_auth::AuthError;
use thiserror::Error;

use crate::validation::NAME_MAX_CHARS;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("non-positive price: {0}")]
    NonPositivePrice(String),

    #[error("price out of range: {0}")]
    PriceOutOfRange(String),

    #[error("name too long: {0} characters (max {max})", max = NAME_MAX_CHARS)]
    NameTooLong(usize),

    #[error("missing id")]
    MissingId,

    #[error("invalid id: {0}")]
    InvalidId(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Product {0} not found")]
    NotFound(i64),

    #[error("Product \"{name}\" is no longer available")]
    AlreadyUnavailable { id: i64, name: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl CatalogError {
    /// Stable tag used in error payloads and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Validation(_) => "ValidationError",
            CatalogError::NotFound(_) => "NotFoundError",
            CatalogError::AlreadyUnavailable { .. } => "AlreadyUnavailableError",
            CatalogError::Configuration(_) => "ConfigurationError",
            CatalogError::Store(_) => "StoreError",
        }
    }

    /// Whether the caller caused the failure (bad input or a rejected transition).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CatalogError::Validation(_)
                | CatalogError::NotFound(_)
                | CatalogError::AlreadyUnavailable { .. }
        )
    }
}

impl From<AuthError> for CatalogError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Configuration(message) | AuthError::Credentials(message) => {
                CatalogError::Configuration(message)
            }
            AuthError::Connect(e) => CatalogError::Store(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_taxonomy() {
        assert_eq!(
            CatalogError::from(ValidationError::MissingId).code(),
            "ValidationError"
        );
        assert_eq!(CatalogError::NotFound(7).code(), "NotFoundError");
        assert_eq!(
            CatalogError::AlreadyUnavailable { id: 1, name: "Widget".into() }.code(),
            "AlreadyUnavailableError"
        );
        assert_eq!(
            CatalogError::Configuration("x".into()).code(),
            "ConfigurationError"
        );
        assert_eq!(CatalogError::Store(sqlx::Error::RowNotFound).code(), "StoreError");
    }

    #[test]
    fn auth_errors_split_into_configuration_and_store() {
        let config = CatalogError::from(AuthError::Credentials("AWS_ACCESS_KEY_ID is not set".into()));
        assert!(matches!(config, CatalogError::Configuration(_)));

        let store = CatalogError::from(AuthError::Connect(sqlx::Error::PoolTimedOut));
        assert!(matches!(store, CatalogError::Store(_)));
        assert!(!store.is_client_error());
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = CatalogError::from(ValidationError::MissingField("price"));
        assert_eq!(err.to_string(), "missing field: price");
    }
}
