use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use storefront_catalog::{CreateProductRequest, Product, PurchaseRequest};

use crate::{
    error::{ApiError, ApiResult},
    extractors::JsonBody,
    responses::*,
    AppState,
};

pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    let result = state.service.list().await;
    state.metrics.record("list", &result);

    Ok(Json(result?))
}

pub async fn create_product(
    State(state): State<AppState>,
    body: Result<JsonBody<CreateProductRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<CreateProductResponse>)> {
    let JsonBody(request) = body.inspect_err(|e| state.metrics.record_rejection("create", e))?;
    let result = state.service.create(request).await;
    state.metrics.record("create", &result);

    Ok((StatusCode::CREATED, Json(result?.into())))
}

pub async fn purchase_product(
    State(state): State<AppState>,
    body: Result<JsonBody<PurchaseRequest>, ApiError>,
) -> ApiResult<Json<PurchaseResponse>> {
    let JsonBody(request) = body.inspect_err(|e| state.metrics.record_rejection("purchase", e))?;
    let result = state.service.purchase(request).await;
    state.metrics.record("purchase", &result);

    Ok(Json(result?.into()))
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "storefront".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.service.backend().to_string(),
        schema_ready: state.service.schema_ready(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
