use crate::{
    db::DbPool,
    dto::wishlist::{ToggleResult, WishlistProduct, WishlistProductList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
};

pub async fn list_wishlist(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<WishlistProductList>> {
    let items = sqlx::query_as::<_, WishlistProduct>(
        r#"
        SELECT p.id, p.name, p.price, p.original_price, p.image_url, p.emoji, p.color,
               p.rating, p.review_count, p.badge, p.stock,
               c.name AS category_name, w.created_at AS saved_at
        FROM wishlist w
        JOIN products p ON p.id = w.product_id
        LEFT JOIN categories c ON c.id = p.category_id
        WHERE w.user_id = $1 AND p.is_active = TRUE
        ORDER BY w.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(
        "Wishlist",
        WishlistProductList { items },
        Some(Meta::empty()),
    ))
}

/// Bare id list for the storefront's heart toggles.
pub async fn list_wishlist_ids(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<Vec<i64>>> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT product_id FROM wishlist WHERE user_id = $1 ORDER BY id")
            .bind(user.user_id)
            .fetch_all(pool)
            .await?;

    Ok(ApiResponse::success("OK", ids, Some(Meta::empty())))
}

/// Toggle semantics: present removes, absent adds.
pub async fn toggle_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    product_id: i64,
) -> AppResult<ApiResponse<ToggleResult>> {
    let product: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active = TRUE")
            .bind(product_id)
            .fetch_optional(pool)
            .await?;
    if product.is_none() {
        return Err(AppError::NotFound("Product not found".into()));
    }

    let removed = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND product_id = $2")
        .bind(user.user_id)
        .bind(product_id)
        .execute(pool)
        .await?;

    if removed.rows_affected() > 0 {
        return Ok(ApiResponse::success(
            "Removed from wishlist",
            ToggleResult { added: false },
            Some(Meta::empty()),
        ));
    }

    // A concurrent duplicate add collapses into the existing row.
    sqlx::query(
        "INSERT INTO wishlist (user_id, product_id) VALUES ($1, $2) \
         ON CONFLICT (user_id, product_id) DO NOTHING",
    )
    .bind(user.user_id)
    .bind(product_id)
    .execute(pool)
    .await?;

    Ok(ApiResponse::success(
        "Added to wishlist",
        ToggleResult { added: true },
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    product_id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND product_id = $2")
        .bind(user.user_id)
        .bind(product_id)
        .execute(pool)
        .await?;

    Ok(ApiResponse::success(
        "Removed from wishlist",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
