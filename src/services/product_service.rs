use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::{
    dto::products::{CreateProductRequest, ProductList, ProductWithCategory, UpdateProductRequest},
    entity::{
        Categories,
        categories::Model as CategoryModel,
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSort},
    rules,
    state::AppState,
};

const DEFAULT_COLOR: &str = "#FF9B85";

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(Column::IsActive.eq(true));

    if let Some(cat) = query
        .cat
        .as_ref()
        .filter(|c| !c.is_empty() && c.as_str() != "all")
    {
        condition = condition.add(Column::CategoryId.eq(cat.clone()));
    }

    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(price_min) = query.price_min {
        condition = condition.add(Column::Price.gte(price_min));
    }

    if let Some(price_max) = query.price_max {
        condition = condition.add(Column::Price.lte(price_max));
    }

    if query.has_discount.unwrap_or(false) {
        condition = condition
            .add(Column::OriginalPrice.is_not_null())
            .add(Expr::col(Column::OriginalPrice).gt(Expr::col(Column::Price)));
    }

    let base = Products::find().filter(condition);
    let total = base.clone().count(&state.orm).await? as i64;

    // Best sellers first unless the client asked otherwise.
    let sort = query.sort.unwrap_or(ProductSort::Sold);
    let sorted = match sort {
        ProductSort::PriceAsc => base.order_by_asc(Column::Price),
        ProductSort::PriceDesc => base.order_by_desc(Column::Price),
        ProductSort::Rating => base.order_by_desc(Column::Rating),
        ProductSort::Sold => base.order_by_desc(Column::Sold),
        ProductSort::Newest => base.order_by_desc(Column::CreatedAt),
    };

    let rows = sorted
        .limit(limit as u64)
        .offset(offset as u64)
        .find_also_related(Categories)
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|(product, category)| with_category(product, category))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

/// Customer-facing read: an inactive product is absent.
pub async fn get_product(state: &AppState, id: i64) -> AppResult<ApiResponse<ProductWithCategory>> {
    let result = Products::find_by_id(id)
        .filter(Column::IsActive.eq(true))
        .find_also_related(Categories)
        .one(&state.orm)
        .await?;

    let (product, category) = match result {
        Some(found) => found,
        None => return Err(AppError::NotFound("Product not found".into())),
    };

    Ok(ApiResponse::success(
        "Product",
        with_category(product, category),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;

    if payload.name.trim().is_empty()
        || payload.category_id.trim().is_empty()
        || payload.description.trim().is_empty()
        || payload.emoji.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Name, category, price, description and emoji are required".into(),
        ));
    }
    if payload.price <= 0 {
        return Err(AppError::BadRequest("Price must be positive".into()));
    }
    let stock = payload.stock.unwrap_or(rules::UNLIMITED_STOCK);
    validate_stock(stock)?;

    let active = ActiveModel {
        id: NotSet,
        name: Set(payload.name.trim().to_string()),
        category_id: Set(Some(payload.category_id)),
        price: Set(payload.price),
        original_price: Set(payload.original_price),
        rating: Set(0.0),
        review_count: Set(0),
        sold: Set(0),
        badge: Set(payload.badge),
        description: Set(payload.description),
        emoji: Set(payload.emoji),
        color: Set(payload.color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
        image_url: Set(payload.image_url),
        stock: Set(stock),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Staff partial update; absent fields stay untouched, the double-Option
/// fields may carry an explicit null to clear the column. Rating and
/// review_count are owned by the review aggregator and cannot be set
/// here.
pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product not found".into())),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(Some(category_id));
    }
    if let Some(price) = payload.price {
        if price <= 0 {
            return Err(AppError::BadRequest("Price must be positive".into()));
        }
        active.price = Set(price);
    }
    if let Some(original_price) = payload.original_price {
        active.original_price = Set(original_price);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(emoji) = payload.emoji {
        active.emoji = Set(emoji);
    }
    if let Some(color) = payload.color {
        active.color = Set(color);
    }
    if let Some(badge) = payload.badge {
        active.badge = Set(badge);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(image_url);
    }
    if let Some(stock) = payload.stock {
        validate_stock(stock)?;
        active.stock = Set(stock);
    }
    if let Some(sold) = payload.sold {
        active.sold = Set(sold);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Some(Utc::now().into()));

    let product = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Product updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Soft delete: the row stays for order and review history.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;

    let result = Products::update_many()
        .col_expr(Column::IsActive, Expr::value(false))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product not found".into()));
    }

    Ok(ApiResponse::success(
        "Product hidden",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn validate_stock(stock: i32) -> Result<(), AppError> {
    if stock < rules::UNLIMITED_STOCK {
        return Err(AppError::BadRequest(
            "Stock must be -1 (unlimited) or non-negative".into(),
        ));
    }
    Ok(())
}

fn with_category(product: ProductModel, category: Option<CategoryModel>) -> ProductWithCategory {
    let (category_name, category_emoji) = match category {
        Some(c) => (Some(c.name), Some(c.emoji)),
        None => (None, None),
    };
    ProductWithCategory {
        product: product_from_entity(product),
        category_name,
        category_emoji,
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        category_id: model.category_id,
        price: model.price,
        original_price: model.original_price,
        rating: model.rating,
        review_count: model.review_count,
        sold: model.sold,
        badge: model.badge,
        description: model.description,
        emoji: model.emoji,
        color: model.color,
        image_url: model.image_url,
        stock: model.stock,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.map(|dt| dt.with_timezone(&Utc)),
    }
}
