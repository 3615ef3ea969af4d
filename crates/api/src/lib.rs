use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use storefront_catalog::ProductService;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod responses;

pub use error::*;
pub use handlers::*;
pub use metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProductService>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(service: Arc<ProductService>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            service,
            metrics: Metrics::new()?,
        })
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/purchase", post(handlers::purchase_product))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                // `Access-Control-Allow-Origin: *` on every response, errors included.
                .layer(CorsLayer::permissive()),
        )
}
