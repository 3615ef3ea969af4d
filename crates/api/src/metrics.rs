use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use storefront_catalog::CatalogError;

use crate::error::ApiError;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    operations: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let operations = IntCounterVec::new(
            Opts::new(
                "storefront_operations_total",
                "Catalog operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations.clone()))?;

        Ok(Self {
            registry,
            operations,
        })
    }

    /// Outcome label is `success` or the error's taxonomy code.
    pub fn record<T>(&self, operation: &str, result: &Result<T, CatalogError>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(e) => e.code(),
        };
        self.record_outcome(operation, outcome);
    }

    /// Request rejected before reaching the catalog, e.g. a malformed body.
    pub fn record_rejection(&self, operation: &str, error: &ApiError) {
        self.record_outcome(operation, error.code());
    }

    fn record_outcome(&self, operation: &str, outcome: &str) {
        self.operations
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn count(&self, operation: &str, outcome: &str) -> u64 {
        self.operations
            .with_label_values(&[operation, outcome])
            .get()
    }

    pub fn render(&self) -> Result<String, ApiError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ApiError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_success_and_error_codes() {
        let metrics = Metrics::new().unwrap();

        metrics.record("purchase", &Ok::<_, CatalogError>(()));
        metrics.record::<()>("purchase", &Err(CatalogError::NotFound(3)));
        metrics.record::<()>("purchase", &Err(CatalogError::NotFound(4)));

        assert_eq!(metrics.count("purchase", "success"), 1);
        assert_eq!(metrics.count("purchase", "NotFoundError"), 2);

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("storefront_operations_total"));
        assert!(rendered.contains("outcome=\"NotFoundError\""));
    }

    #[test]
    fn rejections_use_the_api_error_code() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection("create", &ApiError::BadRequest("EOF".into()));

        assert_eq!(metrics.count("create", "ValidationError"), 1);
        assert_eq!(metrics.count("create", "success"), 0);
    }
}
