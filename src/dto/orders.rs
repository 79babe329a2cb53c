use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::{Order, OrderItem};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemInput {
    /// Absent for free-form lines; inventory is only touched when set.
    pub product_id: Option<i64>,
    pub product_name: String,
    pub emoji: Option<String>,
    pub price: i64,
    pub qty: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub note: Option<String>,
    /// Label only, defaults to "cod"; there is no payment processing.
    pub payment_method: Option<String>,
    pub items: Vec<OrderItemInput>,
    /// Optional: guest checkout leaves this unset.
    pub user_id: Option<i64>,
}

/// A sold/stock update that failed after the order was committed. The
/// order itself stands; these are surfaced so callers can see the
/// best-effort part did not fully apply.
#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryWarning {
    pub product_id: i64,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPlaced {
    pub order_id: i64,
    pub total_price: i64,
    pub shipping_fee: i64,
    pub payment_method: String,
    pub status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[schema(value_type = Vec<InventoryWarning>)]
    pub inventory_warnings: Vec<InventoryWarning>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct OrderSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub order: Order,
    pub item_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// One row of a user's order history: the order plus its lines collapsed
/// into `|||`-separated columns, the shape the storefront's order page
/// consumes.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct OrderHistoryRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub order: Order,
    pub product_names: Option<String>,
    pub product_qtys: Option<String>,
    pub product_emojis: Option<String>,
    pub product_images: Option<String>,
    pub product_ids: Option<String>,
    pub total_qty: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}
