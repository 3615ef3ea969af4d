//! PostgreSQL store tests. They need a scratch database reachable with a
//! password and are ignored by default:
//!
//! ```text
//! DB_HOST=localhost DB_NAME=storefront DB_USERNAME=postgres DB_PASSWORD=postgres \
//!     cargo test -p storefront-catalog --test postgres_store -- --ignored
//! ```
//!
//! `DB_SSLMODE` defaults to `prefer` here so a local server without TLS works.

use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::OnceCell;

use storefront_auth::{
    AuthMode, AwsCredentials, ConnectionAuthenticator, DatabaseConfig, SslMode, StaticCredentials,
    DEFAULT_PORT,
};
use storefront_catalog::*;

static SCHEMA: OnceCell<()> = OnceCell::const_new();

fn database_config() -> DatabaseConfig {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

    DatabaseConfig {
        host: Some(var("DB_HOST").expect("DB_HOST must point at a scratch PostgreSQL database")),
        port: var("DB_PORT")
            .map(|p| p.parse().expect("DB_PORT must be a port number"))
            .unwrap_or(DEFAULT_PORT),
        database: var("DB_NAME"),
        username: var("DB_USERNAME"),
        password: var("DB_PASSWORD"),
        auth_mode: AuthMode::Password,
        ssl_mode: var("DB_SSLMODE")
            .map(|m| m.parse().expect("DB_SSLMODE must be require, prefer or disable"))
            .unwrap_or(SslMode::Prefer),
        ..Default::default()
    }
}

async fn postgres_service() -> Arc<ProductService> {
    let credentials = StaticCredentials(AwsCredentials {
        access_key_id: "unused".to_string(),
        secret_access_key: "unused".to_string(),
        session_token: None,
    });
    let authenticator = ConnectionAuthenticator::new(database_config(), Arc::new(credentials));
    let store = Arc::new(PostgresProductStore::new(authenticator));

    SCHEMA
        .get_or_init(|| async {
            store.ensure_schema().await.expect("schema setup");
            // Running it twice must be harmless.
            store.ensure_schema().await.expect("repeated schema setup");
        })
        .await;

    Arc::new(ProductService::new(store))
}

/// Tests share the table, so every product name carries a unique suffix.
fn unique(label: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}-{}", label, nanos)
}

fn create_request(name: &str, price: serde_json::Value) -> CreateProductRequest {
    CreateProductRequest {
        name: Some(name.to_string()),
        price: Some(price),
        description: None,
    }
}

fn purchase_request(id: i32) -> PurchaseRequest {
    PurchaseRequest {
        product_id: Some(json!(id)),
    }
}

#[tokio::test]
#[ignore = "needs PostgreSQL; set DB_HOST, DB_NAME, DB_USERNAME, DB_PASSWORD"]
async fn insert_list_and_purchase_round_trip() {
    let service = postgres_service().await;

    let names = [unique("pg-first"), unique("pg-second"), unique("pg-third")];
    let mut created = Vec::new();
    for name in &names {
        created.push(service.create(create_request(name, json!("12.30"))).await.unwrap());
    }

    let second = &created[1];
    assert_eq!(second.price, Decimal::new(1230, 2));
    assert_eq!(second.description, "");
    assert!(second.available);

    let listed: Vec<Product> = service
        .list()
        .await
        .unwrap()
        .into_iter()
        .filter(|p| names.contains(&p.name))
        .collect();
    let listed_names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        listed_names,
        vec![names[2].as_str(), names[1].as_str(), names[0].as_str()]
    );
    assert_eq!(listed[1], *second);

    let purchased = service.purchase(purchase_request(second.id)).await.unwrap();
    assert_eq!(purchased.name, second.name);

    match service.purchase(purchase_request(second.id)).await {
        Err(CatalogError::AlreadyUnavailable { name, .. }) => assert_eq!(name, second.name),
        other => panic!("expected AlreadyUnavailable, got {:?}", other),
    }

    assert!(matches!(
        service.purchase(purchase_request(i32::MAX)).await,
        Err(CatalogError::NotFound(_))
    ));

    let after = service.list().await.unwrap();
    let sold = after.iter().find(|p| p.id == second.id).unwrap();
    assert!(!sold.available);
    assert!(after.iter().find(|p| p.id == created[0].id).unwrap().available);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs PostgreSQL; set DB_HOST, DB_NAME, DB_USERNAME, DB_PASSWORD"]
async fn concurrent_purchases_sell_exactly_once() {
    let service = postgres_service().await;
    let product = service
        .create(create_request(&unique("pg-rare"), json!(100)))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        let id = product.id;
        handles.push(tokio::spawn(async move { service.purchase(purchase_request(id)).await }));
    }

    let mut sold = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(CatalogError::AlreadyUnavailable { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(sold, 1);
    assert_eq!(rejected, 7);
}
