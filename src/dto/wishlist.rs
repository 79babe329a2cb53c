use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct WishlistProduct {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub image_url: Option<String>,
    pub emoji: String,
    pub color: String,
    pub rating: f64,
    pub review_count: i32,
    pub badge: Option<String>,
    pub stock: i32,
    pub category_name: Option<String>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistProductList {
    pub items: Vec<WishlistProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToggleResult {
    pub added: bool,
}
