use crate::{
    dto::orders::UpdateOrderStatusRequest,
    dto::products::{ProductList, ProductWithCategory},
    dto::staff::{
        CustomerList, CustomerSummary, DashboardStats, OrderItemWithImage, StaffOrderDetail,
        StaffOrderList, StaffOrderSummary,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Category, Order},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub async fn dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_staff(user)?;

    let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    let pending_orders: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = 'pending'")
            .fetch_one(&state.pool)
            .await?;
    let total_revenue: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(total_price), 0)::BIGINT FROM orders WHERE status != 'cancelled'",
    )
    .fetch_one(&state.pool)
    .await?;
    let total_products: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = TRUE")
            .fetch_one(&state.pool)
            .await?;
    let total_customers: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'customer'")
            .fetch_one(&state.pool)
            .await?;
    let recent_orders =
        sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC LIMIT 10")
            .fetch_all(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "Dashboard",
        DashboardStats {
            total_orders,
            pending_orders,
            total_revenue,
            total_products,
            total_customers,
            recent_orders,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<StaffOrderList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let status = query.status.as_ref().filter(|s| !s.is_empty()).cloned();

    let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
        "SELECT o.*, COUNT(oi.id) AS item_count, \
                string_agg(oi.product_name, ', ' ORDER BY oi.id) AS products_summary \
         FROM orders o LEFT JOIN order_items oi ON oi.order_id = o.id WHERE TRUE",
    );
    if let Some(status) = status.clone() {
        builder.push(" AND o.status = ").push_bind(status);
    }
    builder
        .push(" GROUP BY o.id ORDER BY o.created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let items = builder
        .build_query_as::<StaffOrderSummary>()
        .fetch_all(&state.pool)
        .await?;

    let mut count_builder =
        sqlx::QueryBuilder::<sqlx::Postgres>::new("SELECT COUNT(*) FROM orders WHERE TRUE");
    if let Some(status) = status {
        count_builder.push(" AND status = ").push_bind(status);
    }
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        StaffOrderList { items },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<StaffOrderDetail>> {
    ensure_staff(user)?;

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound("Order not found".into())),
    };

    let items = sqlx::query_as::<_, OrderItemWithImage>(
        "SELECT oi.*, p.image_url AS product_image_url \
         FROM order_items oi LEFT JOIN products p ON p.id = oi.product_id \
         WHERE oi.order_id = $1 ORDER BY oi.id",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Order",
        StaffOrderDetail { order, items },
        Some(Meta::empty()),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let status = order_service::set_status_value(&state.pool, id, &payload.status).await?;
    Ok(ApiResponse::success(
        format!("Order status updated to {}", status.as_str()),
        serde_json::json!({ "order_id": id, "status": status.as_str() }),
        Some(Meta::empty()),
    ))
}

/// All products, inactive included, for the back-office table.
pub async fn list_products(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ProductList>> {
    ensure_staff(user)?;

    let items = sqlx::query_as::<_, ProductWithCategory>(
        "SELECT p.*, c.name AS category_name, c.emoji AS category_emoji \
         FROM products p LEFT JOIN categories c ON c.id = p.category_id \
         ORDER BY p.id DESC",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

/// Customers ranked by lifetime spend over non-cancelled orders.
pub async fn list_customers(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CustomerList>> {
    ensure_staff(user)?;

    let items = sqlx::query_as::<_, CustomerSummary>(
        r#"
        SELECT u.id, u.email, u.full_name, u.phone, u.created_at,
               COUNT(o.id) AS order_count,
               COALESCE(SUM(o.total_price), 0)::BIGINT AS total_spent
        FROM users u
        LEFT JOIN orders o ON o.user_id = u.id AND o.status != 'cancelled'
        WHERE u.role = 'customer'
        GROUP BY u.id
        ORDER BY total_spent DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_categories(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<Category>>> {
    ensure_staff(user)?;

    let items =
        sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&state.pool)
            .await?;

    Ok(ApiResponse::success("Categories", items, Some(Meta::empty())))
}
