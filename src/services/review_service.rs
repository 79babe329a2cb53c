use crate::{
    db::DbPool,
    dto::reviews::{CreateReviewRequest, ReviewList},
    error::{AppError, AppResult, conflict_on_unique},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::ReviewListQuery,
    state::AppState,
};

pub async fn list_reviews(
    pool: &DbPool,
    query: ReviewListQuery,
) -> AppResult<ApiResponse<ReviewList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let items = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE product_id = $1 \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(query.product_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE product_id = $1")
        .bind(query.product_id)
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(meta),
    ))
}

/// One review per user per product, lifetime. After the insert the
/// product's rating and review_count are recomputed from the review rows
/// themselves; nothing is incrementally averaged.
pub async fn submit_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let comment = payload.comment.trim();
    if comment.is_empty() {
        return Err(AppError::BadRequest("A comment is required".into()));
    }
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".into(),
        ));
    }

    let product: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active = TRUE")
            .bind(payload.product_id)
            .fetch_optional(&state.pool)
            .await?;
    if product.is_none() {
        return Err(AppError::NotFound("Product not found".into()));
    }

    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM reviews WHERE product_id = $1 AND user_id = $2")
            .bind(payload.product_id)
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "You have already reviewed this product".into(),
        ));
    }

    if state.review_requires_purchase {
        ensure_purchased(&state.pool, user.user_id, payload.product_id).await?;
    }

    let user_name = if user.full_name.trim().is_empty() {
        "Guest"
    } else {
        user.full_name.trim()
    };

    // The unique index backs up the pre-check under concurrent submits.
    sqlx::query(
        "INSERT INTO reviews (product_id, user_id, user_name, rating, comment) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(payload.product_id)
    .bind(user.user_id)
    .bind(user_name)
    .bind(payload.rating)
    .bind(comment)
    .execute(&state.pool)
    .await
    .map_err(|e| conflict_on_unique(e, "You have already reviewed this product"))?;

    recompute_product_rating(&state.pool, payload.product_id).await?;

    Ok(ApiResponse::success(
        "Thanks for your review!",
        serde_json::json!({ "product_id": payload.product_id }),
        Some(Meta::empty()),
    ))
}

async fn ensure_purchased(pool: &DbPool, user_id: i64, product_id: i64) -> AppResult<()> {
    let purchased: Option<(i64,)> = sqlx::query_as(
        "SELECT o.id FROM orders o \
         JOIN order_items oi ON oi.order_id = o.id \
         WHERE o.user_id = $1 AND oi.product_id = $2 AND o.status = 'done' \
         LIMIT 1",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    if purchased.is_none() {
        return Err(AppError::Forbidden(
            "Only customers who bought this product can review it".into(),
        ));
    }
    Ok(())
}

/// Fresh scan over the review rows, so concurrent submissions cannot
/// drift a running average.
async fn recompute_product_rating(pool: &DbPool, product_id: i64) -> AppResult<()> {
    sqlx::query(
        "UPDATE products SET \
            rating = COALESCE( \
                (SELECT ROUND(AVG(rating)::numeric, 1)::float8 FROM reviews WHERE product_id = $1), 0), \
            review_count = (SELECT COUNT(*) FROM reviews WHERE product_id = $1)::int \
         WHERE id = $1",
    )
    .bind(product_id)
    .execute(pool)
    .await?;
    Ok(())
}
