use sqlx::{PgConnection, SqlitePool};

pub const POSTGRES_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    price DECIMAL(10,2) NOT NULL CHECK (price > 0),
    description TEXT NOT NULL DEFAULT '',
    available BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMP NOT NULL DEFAULT (NOW() AT TIME ZONE 'UTC')
)
"#;

// AUTOINCREMENT keeps ids from being reused after the highest row is gone.
pub const SQLITE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(name) <= 100),
    price TEXT NOT NULL CHECK (CAST(price AS REAL) > 0),
    description TEXT NOT NULL DEFAULT '',
    available BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TEXT NOT NULL
)
"#;

pub async fn ensure_postgres_schema(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(POSTGRES_PRODUCTS_TABLE).execute(&mut *conn).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_created_at ON products (created_at DESC)")
        .execute(&mut *conn)
        .await?;

    tracing::debug!("PostgreSQL products table ensured");
    Ok(())
}

pub async fn ensure_sqlite_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SQLITE_PRODUCTS_TABLE).execute(pool).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_created_at ON products (created_at DESC)")
        .execute(pool)
        .await?;

    tracing::debug!("SQLite products table ensured");
    Ok(())
}
