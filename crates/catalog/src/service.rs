use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::CatalogError;
use crate::models::*;
use crate::repository::{ProductStore, PurchaseOutcome};
use crate::validation::{parse_product_id, validate_new_product};

/// The list/create/purchase operations.
///
/// Operations share nothing but the store handle and the schema flag; the
/// schema is created at most once per process, on the first operation (or
/// an explicit [`initialize`](Self::initialize)) that succeeds in doing so.
pub struct ProductService {
    store: Arc<dyn ProductStore>,
    schema_ready: OnceCell<()>,
}

impl ProductService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self {
            store,
            schema_ready: OnceCell::new(),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn schema_ready(&self) -> bool {
        self.schema_ready.initialized()
    }

    pub async fn initialize(&self) -> Result<(), CatalogError> {
        self.schema_ready
            .get_or_try_init(|| async {
                self.store.ensure_schema().await?;
                tracing::info!(backend = self.store.backend(), "Catalog schema ready");
                Ok::<_, CatalogError>(())
            })
            .await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        self.initialize().await?;
        let products = self.store.list().await?;
        tracing::debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Not idempotent: identical requests create distinct rows.
    pub async fn create(&self, request: CreateProductRequest) -> Result<Product, CatalogError> {
        let new_product = validate_new_product(request)?;

        self.initialize().await?;
        let product = self.store.insert(&new_product).await?;

        tracing::info!(
            id = product.id,
            name = %product.name,
            price = %product.price,
            "Product created"
        );
        Ok(product)
    }

    pub async fn purchase(&self, request: PurchaseRequest) -> Result<PurchasedProduct, CatalogError> {
        let requested = parse_product_id(request.product_id.as_ref())?;

        // No row can hold an id outside the column's range.
        let Ok(id) = i32::try_from(requested) else {
            return Err(CatalogError::NotFound(requested));
        };

        self.initialize().await?;

        match self.store.mark_purchased(id).await? {
            PurchaseOutcome::Purchased(product) => {
                tracing::info!(id = product.id, name = %product.name, "Product purchased");
                Ok(product)
            }
            PurchaseOutcome::NotFound => Err(CatalogError::NotFound(requested)),
            PurchaseOutcome::AlreadyUnavailable { name } => {
                tracing::info!(id, name = %name, "Purchase rejected, product already sold");
                Err(CatalogError::AlreadyUnavailable { id: requested, name })
            }
        }
    }
}
