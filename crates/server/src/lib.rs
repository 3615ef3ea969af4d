use anyhow::Result;
use axum::{
    extract::{Host, Request},
    http::{header, HeaderName, HeaderValue, Uri},
    middleware::{self, Next},
    response::{Redirect, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::{net::SocketAddr, sync::Arc};
use storefront_api::{create_router, AppState};
use storefront_catalog::{open_store, ProductService};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;

pub use config::*;

pub struct StorefrontServer {
    config: ServerConfig,
}

impl StorefrontServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        self.setup_tracing()?;

        tracing::info!("Starting storefront server...");
        tracing::info!("Configuration: {:?}", self.config);

        let store = open_store(&self.config.store).await?;
        let service = Arc::new(ProductService::new(store));

        // Retried by the first request on failure.
        if let Err(e) = service.initialize().await {
            tracing::warn!("Catalog schema setup failed, retrying on first request: {}", e);
        }

        let app = build_app(AppState::new(service)?);

        match self.config.tls.clone() {
            Some(tls_config) => self.run_with_tls(app, tls_config).await,
            None => self.run_http_only(app).await,
        }
    }

    async fn run_http_only(self, app: Router) -> Result<()> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Storefront listening on http://{}", addr);
        tracing::info!("Health check available at: http://{}/health", addr);
        tracing::warn!("TLS is disabled. Consider enabling HTTPS in production!");

        axum::serve(listener, app).await?;
        Ok(())
    }

    async fn run_with_tls(self, app: Router, tls_config: TlsConfig) -> Result<()> {
        let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path).await?;

        let https_port = tls_config.https_port.unwrap_or(443);
        let https_addr: SocketAddr = format!("{}:{}", self.config.bind_address, https_port).parse()?;

        tracing::info!("Storefront listening on https://{}", https_addr);
        tracing::info!("Health check available at: https://{}/health", https_addr);

        if tls_config.redirect_http_to_https {
            let redirect_app = redirect_router(https_port);

            let http_addr = self.config.socket_addr()?;
            let http_listener = TcpListener::bind(http_addr).await?;

            tracing::info!("HTTP redirect server listening on http://{}", http_addr);

            tokio::spawn(async move {
                if let Err(e) = axum::serve(http_listener, redirect_app).await {
                    tracing::error!("HTTP redirect server error: {}", e);
                }
            });
        }

        axum_server::bind_rustls(https_addr, rustls_config)
            .serve(app.into_make_service())
            .await?;

        Ok(())
    }

    fn setup_tracing(&self) -> Result<()> {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.config.log_level));

        let registry = tracing_subscriber::registry().with(filter);
        match self.config.log_format {
            LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
            LogFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?,
        }

        Ok(())
    }
}

pub fn build_app(state: AppState) -> Router {
    create_router()
        .with_state(state)
        .layer(middleware::from_fn(security_headers_middleware))
}

const SECURITY_HEADERS: [(HeaderName, &str); 4] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'none'; frame-ancestors 'none'",
    ),
];

async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}

/// Plain HTTP app that sends every request to the same path on HTTPS.
pub fn redirect_router(https_port: u16) -> Router {
    Router::new()
        .fallback(move |Host(host): Host, uri: Uri| async move {
            Redirect::permanent(&https_location(&host, &uri, https_port))
        })
        .layer(middleware::from_fn(security_headers_middleware))
}

fn https_location(host: &str, uri: &Uri, https_port: u16) -> String {
    let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    let hostname = if host.starts_with('[') {
        host.find(']').map(|end| &host[..=end]).unwrap_or(host)
    } else {
        host.split(':').next().unwrap_or(host)
    };

    if https_port == 443 {
        format!("https://{}{}", hostname, path_and_query)
    } else {
        format!("https://{}:{}{}", hostname, https_port, path_and_query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, StatusCode},
    };
    use storefront_catalog::SqliteProductStore;
    use tower::ServiceExt;

    async fn app() -> Router {
        let store = SqliteProductStore::connect("sqlite::memory:").await.unwrap();
        let service = Arc::new(ProductService::new(Arc::new(store)));
        build_app(AppState::new(service).unwrap())
    }

    #[tokio::test]
    async fn responses_carry_security_headers() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn error_responses_carry_security_headers() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/purchase")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"product_id": 99}"#))
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    }

    async fn redirect_location(https_port: u16, host: &str, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .uri(uri)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap();
        let response = redirect_router(https_port).oneshot(request).await.unwrap();

        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        (response.status(), location)
    }

    #[tokio::test]
    async fn redirect_uses_host_header_and_drops_http_port() {
        let (status, location) = redirect_location(443, "shop.example.com:8080", "/products?x=1").await;

        assert_eq!(status, StatusCode::PERMANENT_REDIRECT);
        assert_eq!(location, "https://shop.example.com/products?x=1");
    }

    #[tokio::test]
    async fn redirect_targets_non_default_https_port() {
        let (_, location) = redirect_location(8443, "shop.example.com", "/purchase").await;
        assert_eq!(location, "https://shop.example.com:8443/purchase");

        let (_, location) = redirect_location(8443, "[::1]:3000", "/").await;
        assert_eq!(location, "https://[::1]:8443/");
    }
}
