use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Connection, Row, SqlitePool};
use std::str::FromStr;
use storefront_auth::ConnectionAuthenticator;

use crate::error::CatalogError;
use crate::models::*;
use crate::schema;

/// Result of the atomic "mark as sold" transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Purchased(PurchasedProduct),
    NotFound,
    AlreadyUnavailable { name: String },
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn ensure_schema(&self) -> Result<(), CatalogError>;

    /// All products, newest first.
    async fn list(&self) -> Result<Vec<Product>, CatalogError>;

    async fn insert(&self, product: &NewProduct) -> Result<Product, CatalogError>;

    /// Flips `available` to false only if it is currently true.
    async fn mark_purchased(&self, id: i32) -> Result<PurchaseOutcome, CatalogError>;
}

const MARK_PURCHASED_SQLITE: &str =
    "UPDATE products SET available = FALSE WHERE id = ? AND available = TRUE RETURNING id, name";

const MARK_PURCHASED_POSTGRES: &str =
    "UPDATE products SET available = FALSE WHERE id = $1 AND available = TRUE RETURNING id, name";

pub struct SqliteProductStore {
    pool: SqlitePool,
}

impl SqliteProductStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, CatalogError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` is its own database, so in-memory
        // stores are pinned to a single connection that never expires.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ProductStore for SqliteProductStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_schema(&self) -> Result<(), CatalogError> {
        schema::ensure_sqlite_schema(&self.pool).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, price, description, available, created_at
            FROM products
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            products.push(product_from_sqlite_row(&row)?);
        }

        Ok(products)
    }

    async fn insert(&self, product: &NewProduct) -> Result<Product, CatalogError> {
        let created_at = Utc::now().trunc_subsecs(6);

        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price, description, available, created_at)
            VALUES (?, ?, ?, TRUE, ?)
            RETURNING id
            "#,
        )
        .bind(&product.name)
        .bind(product.price.to_string())
        .bind(&product.description)
        .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .fetch_one(&self.pool)
        .await?;

        Ok(Product {
            id: row.try_get("id")?,
            name: product.name.clone(),
            price: product.price,
            description: product.description.clone(),
            available: true,
            created_at,
        })
    }

    async fn mark_purchased(&self, id: i32) -> Result<PurchaseOutcome, CatalogError> {
        let updated = sqlx::query(MARK_PURCHASED_SQLITE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = updated {
            return Ok(PurchaseOutcome::Purchased(PurchasedProduct {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            }));
        }

        let existing: Option<String> = sqlx::query_scalar("SELECT name FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match existing {
            Some(name) => PurchaseOutcome::AlreadyUnavailable { name },
            None => PurchaseOutcome::NotFound,
        })
    }
}

fn product_from_sqlite_row(row: &SqliteRow) -> Result<Product, CatalogError> {
    let price: String = row.try_get("price")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: Decimal::from_str(&price).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        description: row.try_get("description")?,
        available: row.try_get("available")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc),
    })
}

/// PostgreSQL backend. Holds no connection: each operation authenticates,
/// connects, runs its statements and closes the connection again.
pub struct PostgresProductStore {
    authenticator: ConnectionAuthenticator,
}

impl PostgresProductStore {
    pub fn new(authenticator: ConnectionAuthenticator) -> Self {
        Self { authenticator }
    }

    pub fn authenticator(&self) -> &ConnectionAuthenticator {
        &self.authenticator
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ensure_schema(&self) -> Result<(), CatalogError> {
        let mut conn = self.authenticator.connect().await?;
        schema::ensure_postgres_schema(&mut conn).await?;
        conn.close().await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.authenticator.connect().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, name, price, description, available, created_at
            FROM products
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&mut conn)
        .await?;

        conn.close().await?;

        rows.iter().map(product_from_pg_row).collect()
    }

    async fn insert(&self, product: &NewProduct) -> Result<Product, CatalogError> {
        let mut conn = self.authenticator.connect().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price, description, available)
            VALUES ($1, $2, $3, TRUE)
            RETURNING id, name, price, description, available, created_at
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .fetch_one(&mut conn)
        .await?;

        conn.close().await?;

        product_from_pg_row(&row)
    }

    async fn mark_purchased(&self, id: i32) -> Result<PurchaseOutcome, CatalogError> {
        let mut conn = self.authenticator.connect().await?;

        let updated = sqlx::query(MARK_PURCHASED_POSTGRES)
            .bind(id)
            .fetch_optional(&mut conn)
            .await?;

        let outcome = match updated {
            Some(row) => PurchaseOutcome::Purchased(PurchasedProduct {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            }),
            None => {
                let existing: Option<String> =
                    sqlx::query_scalar("SELECT name FROM products WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&mut conn)
                        .await?;

                match existing {
                    Some(name) => PurchaseOutcome::AlreadyUnavailable { name },
                    None => PurchaseOutcome::NotFound,
                }
            }
        };

        conn.close().await?;
        Ok(outcome)
    }
}

fn product_from_pg_row(row: &PgRow) -> Result<Product, CatalogError> {
    let created_at: NaiveDateTime = row.try_get("created_at")?;

    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        description: row
            .try_get::<Option<String>, _>("description")?
            .unwrap_or_default(),
        available: row.try_get("available")?,
        created_at: created_at.and_utc(),
    })
}
