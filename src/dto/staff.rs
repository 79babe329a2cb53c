use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::{Order, OrderItem};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    /// Revenue over non-cancelled orders.
    pub total_revenue: i64,
    pub total_products: i64,
    pub total_customers: i64,
    pub recent_orders: Vec<Order>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct StaffOrderSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub order: Order,
    pub item_count: i64,
    pub products_summary: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StaffOrderList {
    pub items: Vec<StaffOrderSummary>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct OrderItemWithImage {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub item: OrderItem,
    /// Live product image, when the product still exists.
    pub product_image_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StaffOrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemWithImage>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct CustomerSummary {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub order_count: i64,
    pub total_spent: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerList {
    pub items: Vec<CustomerSummary>,
}
