use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};

use crate::{
    db::DbPool,
    dto::orders::{
        InventoryWarning, OrderHistoryRow, OrderItemInput, OrderList, OrderPlaced, OrderSummary,
        OrderWithItems, PlaceOrderRequest, UpdateOrderStatusRequest,
    },
    entity::{order_items::ActiveModel as OrderItemActive, orders::ActiveModel as OrderActive},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    rules,
    state::AppState,
};

const DEFAULT_ITEM_EMOJI: &str = "🛍️";

/// Create an order. The Order row and its OrderItems commit or roll back
/// as one transaction; the per-product sold/stock updates run after the
/// commit and are allowed to fail item by item without voiding the order.
pub async fn place_order(
    state: &AppState,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderPlaced>> {
    validate_order(&payload)?;

    let payment_method = payload
        .payment_method
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or("cod")
        .to_string();

    let (_, shipping_fee, grand_total) =
        rules::order_totals(payload.items.iter().map(|i| (i.price, i.qty)));

    let txn = state.orm.begin().await?;

    let order = OrderActive {
        id: NotSet,
        user_id: Set(payload.user_id),
        customer_name: Set(payload.customer_name.trim().to_string()),
        customer_phone: Set(payload.customer_phone.trim().to_string()),
        customer_address: Set(payload.customer_address.trim().to_string()),
        note: Set(payload.note.clone().filter(|n| !n.trim().is_empty())),
        payment_method: Set(payment_method.clone()),
        total_price: Set(grand_total),
        shipping_fee: Set(shipping_fee),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for item in &payload.items {
        OrderItemActive {
            id: NotSet,
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            product_name: Set(item.product_name.clone()),
            emoji: Set(item
                .emoji
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_ITEM_EMOJI.to_string())),
            price: Set(item.price),
            qty: Set(item.qty),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    let inventory_warnings = apply_inventory_updates(&state.pool, &payload.items).await;

    Ok(ApiResponse::success(
        "Order placed",
        OrderPlaced {
            order_id: order.id,
            total_price: grand_total,
            shipping_fee,
            payment_method,
            status: OrderStatus::Pending.as_str().to_string(),
            inventory_warnings,
        },
        Some(Meta::empty()),
    ))
}

fn validate_order(payload: &PlaceOrderRequest) -> Result<(), AppError> {
    if payload.customer_name.trim().is_empty()
        || payload.customer_phone.trim().is_empty()
        || payload.customer_address.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Recipient name, phone and address are required".into(),
        ));
    }
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }
    for item in &payload.items {
        if item.product_name.trim().is_empty() {
            return Err(AppError::BadRequest("Every item needs a name".into()));
        }
        if item.qty <= 0 {
            return Err(AppError::BadRequest(
                "Item quantity must be positive".into(),
            ));
        }
        if item.price < 0 {
            return Err(AppError::BadRequest(
                "Item price cannot be negative".into(),
            ));
        }
    }
    Ok(())
}

/// Increment sold and decrement finite stock for every line that points at
/// a real product. The conditional `WHERE stock > 0` keeps the -1
/// unlimited sentinel untouched and makes concurrent decrements clamp at
/// 0 without explicit locking.
async fn apply_inventory_updates(pool: &DbPool, items: &[OrderItemInput]) -> Vec<InventoryWarning> {
    let mut warnings = Vec::new();

    for item in items {
        let Some(product_id) = item.product_id else {
            continue;
        };

        if let Err(err) = sqlx::query("UPDATE products SET sold = sold + $1 WHERE id = $2")
            .bind(item.qty)
            .bind(product_id)
            .execute(pool)
            .await
        {
            tracing::warn!(product_id, error = %err, "sold counter update failed");
            warnings.push(InventoryWarning {
                product_id,
                message: "could not update sold counter".into(),
            });
        }

        if let Err(err) = sqlx::query(
            "UPDATE products SET stock = GREATEST(stock - $1, 0) WHERE id = $2 AND stock > 0",
        )
        .bind(item.qty)
        .bind(product_id)
        .execute(pool)
        .await
        {
            tracing::warn!(product_id, error = %err, "stock decrement failed");
            warnings.push(InventoryWarning {
                product_id,
                message: "could not decrement stock".into(),
            });
        }
    }

    warnings
}

/// Orders visible to the caller: admins see everything, everyone else only
/// their own rows, whatever filters the request carries.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let status = query.status.as_ref().filter(|s| !s.is_empty()).cloned();

    let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
        "SELECT o.*, COUNT(oi.id) AS item_count \
         FROM orders o LEFT JOIN order_items oi ON oi.order_id = o.id WHERE TRUE",
    );
    if user.role != "admin" {
        builder.push(" AND o.user_id = ").push_bind(user.user_id);
    }
    if let Some(status) = status.clone() {
        builder.push(" AND o.status = ").push_bind(status);
    }
    builder
        .push(" GROUP BY o.id ORDER BY o.created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let items = builder
        .build_query_as::<OrderSummary>()
        .fetch_all(&state.pool)
        .await?;

    let mut count_builder =
        sqlx::QueryBuilder::<sqlx::Postgres>::new("SELECT COUNT(*) FROM orders o WHERE TRUE");
    if user.role != "admin" {
        count_builder.push(" AND o.user_id = ").push_bind(user.user_id);
    }
    if let Some(status) = status {
        count_builder.push(" AND o.status = ").push_bind(status);
    }
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(meta),
    ))
}

/// Order detail is owner-or-admin. Existence is not hidden: a foreign
/// order answers 403, not 404.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound("Order not found".into())),
    };

    if user.role != "admin" && order.user_id != Some(user.user_id) {
        return Err(AppError::Forbidden(
            "You are not allowed to view this order".into(),
        ));
    }

    let items =
        sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
            .bind(id)
            .fetch_all(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let status = set_status_value(&state.pool, id, &payload.status).await?;
    Ok(ApiResponse::success(
        format!("Order status updated to {}", status.as_str()),
        serde_json::json!({ "order_id": id, "status": status.as_str() }),
        Some(Meta::empty()),
    ))
}

/// Value-gated status write shared by the customer-facing and staff
/// routes. Only the status column (and updated_at) changes; there is no
/// inventory adjustment on cancellation.
pub(crate) async fn set_status_value(
    pool: &DbPool,
    id: i64,
    status: &str,
) -> AppResult<OrderStatus> {
    let status = OrderStatus::parse(status)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid order status: {status}")))?;

    let result = sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Order not found".into()));
    }
    Ok(status)
}

/// Order history for one user, items collapsed per order for the
/// storefront's history page. Self-or-admin.
pub async fn list_user_orders(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
) -> AppResult<ApiResponse<Vec<OrderHistoryRow>>> {
    if user.role != "admin" && user.user_id != user_id {
        return Err(AppError::Forbidden(
            "You are not allowed to view these orders".into(),
        ));
    }

    let rows = sqlx::query_as::<_, OrderHistoryRow>(
        r#"
        SELECT o.*,
               string_agg(oi.product_name, '|||' ORDER BY oi.id) AS product_names,
               string_agg(oi.qty::text, '|||' ORDER BY oi.id) AS product_qtys,
               string_agg(oi.emoji, '|||' ORDER BY oi.id) AS product_emojis,
               string_agg(COALESCE(p.image_url, ''), '|||' ORDER BY oi.id) AS product_images,
               string_agg(COALESCE(oi.product_id, 0)::text, '|||' ORDER BY oi.id) AS product_ids,
               SUM(oi.qty) AS total_qty
        FROM orders o
        LEFT JOIN order_items oi ON oi.order_id = o.id
        LEFT JOIN products p ON p.id = oi.product_id
        WHERE o.user_id = $1
        GROUP BY o.id
        ORDER BY o.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success("OK", rows, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, price: i64, qty: i32) -> OrderItemInput {
        OrderItemInput {
            product_id: None,
            product_name: name.to_string(),
            emoji: None,
            price,
            qty,
        }
    }

    fn request(items: Vec<OrderItemInput>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            customer_name: "Pu".into(),
            customer_phone: "0900000000".into(),
            customer_address: "12 Snack Street".into(),
            note: None,
            payment_method: None,
            items,
            user_id: None,
        }
    }

    #[test]
    fn rejects_blank_recipient_fields() {
        let mut payload = request(vec![item("Chips", 10_000, 1)]);
        payload.customer_phone = "   ".into();
        assert!(matches!(
            validate_order(&payload),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn rejects_empty_and_invalid_items() {
        assert!(validate_order(&request(vec![])).is_err());
        assert!(validate_order(&request(vec![item("Chips", 10_000, 0)])).is_err());
        assert!(validate_order(&request(vec![item("Chips", -5, 1)])).is_err());
        assert!(validate_order(&request(vec![item("Chips", 10_000, 2)])).is_ok());
    }
}
