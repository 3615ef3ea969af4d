use serde::{Deserialize, Serialize};
use storefront_catalog::{Product, PurchasedProduct};

pub const PRODUCT_CREATED_MESSAGE: &str = "Producto añadido exitosamente";

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProductResponse {
    pub message: String,
    pub product: Product,
}

impl From<Product> for CreateProductResponse {
    fn from(product: Product) -> Self {
        Self {
            message: PRODUCT_CREATED_MESSAGE.to_string(),
            product,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub message: String,
    pub product_id: i32,
    pub product_name: String,
}

impl From<PurchasedProduct> for PurchaseResponse {
    fn from(product: PurchasedProduct) -> Self {
        Self {
            message: format!("Producto \"{}\" comprado exitosamente", product.name),
            product_id: product.id,
            product_name: product.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub store: String,
    pub schema_ready: bool,
}
