use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};

use crate::{
    dto::orders::UpdateOrderStatusRequest,
    dto::products::ProductList,
    dto::staff::{CustomerList, DashboardStats, StaffOrderDetail, StaffOrderList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Category,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::staff_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/products", get(list_products))
        .route("/customers", get(list_customers))
        .route("/categories", get(list_categories))
}

#[utoipa::path(
    get,
    path = "/api/staff/dashboard",
    responses(
        (status = 200, description = "Back-office dashboard stats", body = ApiResponse<DashboardStats>),
        (status = 403, description = "Staff or admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let resp = staff_service::dashboard(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    operation_id = "staff_list_orders",
    path = "/api/staff/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
    ),
    responses(
        (status = 200, description = "All orders with item summaries", body = ApiResponse<StaffOrderList>),
        (status = 403, description = "Staff or admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<StaffOrderList>>> {
    let resp = staff_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    operation_id = "staff_get_order",
    path = "/api/staff/orders/{id}",
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<StaffOrderDetail>),
        (status = 403, description = "Staff or admin only"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<StaffOrderDetail>>> {
    let resp = staff_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    operation_id = "staff_update_order_status",
    path = "/api/staff/orders/{id}/status",
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid status value"),
        (status = 403, description = "Staff or admin only"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = staff_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    operation_id = "staff_list_products",
    path = "/api/staff/products",
    responses(
        (status = 200, description = "All products, inactive included", body = ApiResponse<ProductList>),
        (status = 403, description = "Staff or admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = staff_service::list_products(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/staff/customers",
    responses(
        (status = 200, description = "Customers ranked by spend", body = ApiResponse<CustomerList>),
        (status = 403, description = "Staff or admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let resp = staff_service::list_customers(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    operation_id = "staff_list_categories",
    path = "/api/staff/categories",
    responses(
        (status = 200, description = "Categories for the product form", body = ApiResponse<Vec<Category>>),
        (status = 403, description = "Staff or admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let resp = staff_service::list_categories(&state, &user).await?;
    Ok(Json(resp))
}
