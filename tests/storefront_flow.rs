use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};

use snackshop_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::orders::{OrderItemInput, PlaceOrderRequest, UpdateOrderStatusRequest},
    dto::reviews::CreateReviewRequest,
    entity::{products::ActiveModel as ProductActive, users::ActiveModel as UserActive},
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::OrderListQuery,
    services::{order_service, review_service, staff_service},
    state::AppState,
};

// Integration flow: guest and customer checkouts with inventory
// side effects, status lifecycle gating, role-scoped reads, and the
// review aggregator. Runs sequentially in one test because it owns the
// whole database.
#[tokio::test]
async fn orders_reviews_and_staff_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(());
            }
        };

    let state = setup_state(&database_url).await?;

    // Seed users
    let customer_id = create_user(&state, "customer", "pu@example.com", "Pu Nguyen").await?;
    let other_id = create_user(&state, "customer", "other@example.com", "Someone Else").await?;
    let staff_id = create_user(&state, "staff", "staff@example.com", "Shop Staff").await?;
    let admin_id = create_user(&state, "admin", "admin@example.com", "Shop Admin").await?;

    let customer = auth_user(customer_id, "customer", "pu@example.com", "Pu Nguyen");
    let other = auth_user(other_id, "customer", "other@example.com", "Someone Else");
    let staff = auth_user(staff_id, "staff", "staff@example.com", "Shop Staff");
    let admin = auth_user(admin_id, "admin", "admin@example.com", "Shop Admin");

    // Seed products: finite, low and unlimited stock
    let chips = create_product(&state, "Test Chips", 35_000, 10).await?;
    let candy = create_product(&state, "Test Candy", 22_000, 3).await?;
    let crackers = create_product(&state, "Test Crackers", 18_000, -1).await?;

    // ---- Order placement: totals and shipping fee ------------------------

    let placed = order_service::place_order(
        &state,
        order_request(
            Some(customer_id),
            vec![line(Some(chips), "Test Chips", 35_000, 3)],
        ),
    )
    .await?;
    let placed = placed.data.unwrap();
    assert_eq!(placed.shipping_fee, 30_000);
    assert_eq!(placed.total_price, 3 * 35_000 + 30_000);
    assert_eq!(placed.status, "pending");
    assert!(placed.inventory_warnings.is_empty());
    let first_order_id = placed.order_id;

    // Stored grand total matches the line items plus the fee
    let (stored_total, stored_fee): (i64, i64) =
        sqlx::query_as("SELECT total_price, shipping_fee FROM orders WHERE id = $1")
            .bind(first_order_id)
            .fetch_one(&state.pool)
            .await?;
    let items_sum: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(price * qty), 0)::BIGINT FROM order_items WHERE order_id = $1",
    )
    .bind(first_order_id)
    .fetch_one(&state.pool)
    .await?;
    assert_eq!(stored_total, items_sum + stored_fee);

    // Inventory side effects applied
    let (stock, sold): (i32, i32) =
        sqlx::query_as("SELECT stock, sold FROM products WHERE id = $1")
            .bind(chips)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(stock, 7);
    assert_eq!(sold, 3);

    // The frozen total survives later price changes
    sqlx::query("UPDATE products SET price = 99000 WHERE id = $1")
        .bind(chips)
        .execute(&state.pool)
        .await?;
    let after_price_change: i64 =
        sqlx::query_scalar("SELECT total_price FROM orders WHERE id = $1")
            .bind(first_order_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(after_price_change, stored_total);

    // ---- Free shipping at the threshold ----------------------------------

    let big = order_service::place_order(
        &state,
        order_request(None, vec![line(None, "Gift Box", 200_000, 1)]),
    )
    .await?;
    let big = big.data.unwrap();
    assert_eq!(big.shipping_fee, 0);
    assert_eq!(big.total_price, 200_000);

    // ---- Stock clamps at zero, unlimited stays untouched -----------------

    let over = order_service::place_order(
        &state,
        order_request(None, vec![line(Some(candy), "Test Candy", 22_000, 5)]),
    )
    .await?;
    assert!(over.data.unwrap().inventory_warnings.is_empty());
    let (stock, sold): (i32, i32) =
        sqlx::query_as("SELECT stock, sold FROM products WHERE id = $1")
            .bind(candy)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(stock, 0, "oversell clamps at zero");
    assert_eq!(sold, 5);

    order_service::place_order(
        &state,
        order_request(None, vec![line(Some(crackers), "Test Crackers", 18_000, 4)]),
    )
    .await?;
    let (stock, sold): (i32, i32) =
        sqlx::query_as("SELECT stock, sold FROM products WHERE id = $1")
            .bind(crackers)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(stock, -1, "unlimited sentinel never decrements");
    assert_eq!(sold, 4);

    // ---- Validation rejects before any write -----------------------------

    let invalid = order_service::place_order(
        &state,
        order_request(None, vec![line(None, "Anything", 10_000, 0)]),
    )
    .await;
    assert!(matches!(invalid, Err(AppError::BadRequest(_))));

    // ---- Atomicity: a failing second item rolls back the whole order -----

    let orders_before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    let items_before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
        .fetch_one(&state.pool)
        .await?;

    // product_name is VARCHAR(200); the second line cannot be inserted
    let failing = order_service::place_order(
        &state,
        order_request(
            Some(customer_id),
            vec![
                line(Some(chips), "Test Chips", 35_000, 1),
                line(None, &"x".repeat(300), 10_000, 1),
            ],
        ),
    )
    .await;
    assert!(failing.is_err());

    let orders_after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    let items_after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(orders_before, orders_after, "no partial order row survives");
    assert_eq!(items_before, items_after, "no partial line items survive");

    // ---- Role-scoped listing ---------------------------------------------

    let mine = order_service::list_orders(&state, &customer, default_query()).await?;
    let mine = mine.data.unwrap();
    assert!(!mine.items.is_empty());
    assert!(
        mine.items
            .iter()
            .all(|o| o.order.user_id == Some(customer_id)),
        "non-admin only ever sees their own orders"
    );

    let all = order_service::list_orders(&state, &admin, default_query()).await?;
    assert!(all.data.unwrap().items.len() > mine.items.len());

    // ---- Detail reads: owner-or-admin, 403 for everyone else -------------

    order_service::get_order(&state, &customer, first_order_id).await?;
    order_service::get_order(&state, &admin, first_order_id).await?;
    let denied = order_service::get_order(&state, &other, first_order_id).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let history = order_service::list_user_orders(&state, &customer, customer_id).await?;
    assert!(!history.data.unwrap().is_empty());
    let denied = order_service::list_user_orders(&state, &other, customer_id).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    // ---- Status lifecycle gating -----------------------------------------

    let bogus = order_service::update_status(
        &state,
        &admin,
        first_order_id,
        UpdateOrderStatusRequest {
            status: "bogus".into(),
        },
    )
    .await;
    assert!(matches!(bogus, Err(AppError::BadRequest(_))));
    let status: String = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
        .bind(first_order_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(status, "pending", "rejected transition leaves status alone");

    let denied = order_service::update_status(
        &state,
        &customer,
        first_order_id,
        UpdateOrderStatusRequest {
            status: "confirmed".into(),
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    order_service::update_status(
        &state,
        &admin,
        first_order_id,
        UpdateOrderStatusRequest {
            status: "confirmed".into(),
        },
    )
    .await?;

    // Staff route allows staff as well as admin
    staff_service::update_order_status(
        &state,
        &staff,
        first_order_id,
        UpdateOrderStatusRequest {
            status: "shipping".into(),
        },
    )
    .await?;
    let status: String = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
        .bind(first_order_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(status, "shipping");

    let missing = order_service::update_status(
        &state,
        &admin,
        9_999_999,
        UpdateOrderStatusRequest {
            status: "confirmed".into(),
        },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    // ---- Reviews: recompute from source, one per user --------------------

    let reviewers = [
        (&customer, 5),
        (&other, 4),
        (&staff, 3),
    ];
    for (user, rating) in reviewers {
        review_service::submit_review(
            &state,
            user,
            CreateReviewRequest {
                product_id: chips,
                rating,
                comment: format!("{} stars", rating),
            },
        )
        .await?;
    }
    let (rating, review_count): (f64, i32) =
        sqlx::query_as("SELECT rating, review_count FROM products WHERE id = $1")
            .bind(chips)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(rating, 4.0);
    assert_eq!(review_count, 3);

    // A fourth review recomputes from all rows, not from the stale average
    review_service::submit_review(
        &state,
        &admin,
        CreateReviewRequest {
            product_id: chips,
            rating: 2,
            comment: "went stale quickly".into(),
        },
    )
    .await?;
    let (rating, review_count): (f64, i32) =
        sqlx::query_as("SELECT rating, review_count FROM products WHERE id = $1")
            .bind(chips)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(rating, 3.5);
    assert_eq!(review_count, 4);

    // Duplicate review conflicts and leaves the aggregate untouched
    let duplicate = review_service::submit_review(
        &state,
        &customer,
        CreateReviewRequest {
            product_id: chips,
            rating: 1,
            comment: "changed my mind".into(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    let (rating, review_count): (f64, i32) =
        sqlx::query_as("SELECT rating, review_count FROM products WHERE id = $1")
            .bind(chips)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(rating, 3.5);
    assert_eq!(review_count, 4);

    let out_of_range = review_service::submit_review(
        &state,
        &customer,
        CreateReviewRequest {
            product_id: candy,
            rating: 6,
            comment: "too good".into(),
        },
    )
    .await;
    assert!(matches!(out_of_range, Err(AppError::BadRequest(_))));

    // ---- Purchase-gated review policy variant ----------------------------

    let gated = AppState {
        pool: state.pool.clone(),
        orm: state.orm.clone(),
        review_requires_purchase: true,
    };

    // `other` has no completed order containing the candy product
    let not_purchased = review_service::submit_review(
        &gated,
        &other,
        CreateReviewRequest {
            product_id: candy,
            rating: 4,
            comment: "crunchy".into(),
        },
    )
    .await;
    assert!(matches!(not_purchased, Err(AppError::Forbidden(_))));

    // After buying and receiving the product the review is accepted
    let candy_order = order_service::place_order(
        &gated,
        order_request(Some(other_id), vec![line(Some(candy), "Test Candy", 22_000, 1)]),
    )
    .await?;
    let candy_order_id = candy_order.data.unwrap().order_id;
    staff_service::update_order_status(
        &gated,
        &staff,
        candy_order_id,
        UpdateOrderStatusRequest {
            status: "done".into(),
        },
    )
    .await?;
    review_service::submit_review(
        &gated,
        &other,
        CreateReviewRequest {
            product_id: candy,
            rating: 4,
            comment: "crunchy".into(),
        },
    )
    .await?;

    // ---- Staff back-office -----------------------------------------------

    let dashboard = staff_service::dashboard(&state, &staff).await?;
    let dashboard = dashboard.data.unwrap();
    assert!(dashboard.total_orders >= 4);
    assert!(dashboard.total_revenue > 0);
    assert_eq!(dashboard.total_customers, 2);

    let denied = staff_service::dashboard(&state, &customer).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let staff_orders = staff_service::list_orders(&state, &staff, default_query()).await?;
    let staff_orders = staff_orders.data.unwrap();
    assert!(!staff_orders.items.is_empty());
    assert!(
        staff_orders
            .items
            .iter()
            .any(|o| o.products_summary.is_some())
    );

    let detail = staff_service::get_order(&state, &staff, first_order_id).await?;
    assert!(!detail.data.unwrap().items.is_empty());

    let customers = staff_service::list_customers(&state, &staff).await?;
    let customers = customers.data.unwrap();
    assert_eq!(customers.items.len(), 2);
    assert!(customers.items[0].total_spent >= customers.items[1].total_spent);

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url, 5).await?;
    let orm = create_orm_conn(database_url, 5).await?;
    run_migrations(&pool).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE order_items, orders, reviews, wishlist, products, categories, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    Ok(AppState {
        pool,
        orm,
        review_requires_purchase: false,
    })
}

async fn create_user(
    state: &AppState,
    role: &str,
    email: &str,
    full_name: &str,
) -> anyhow::Result<i64> {
    let user = UserActive {
        id: NotSet,
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        full_name: Set(full_name.to_string()),
        phone: Set(None),
        address: Set(None),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

async fn create_product(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<i64> {
    let product = ProductActive {
        id: NotSet,
        name: Set(name.to_string()),
        category_id: Set(None),
        price: Set(price),
        original_price: Set(None),
        rating: Set(0.0),
        review_count: Set(0),
        sold: Set(0),
        badge: Set(None),
        description: Set("A product for testing".into()),
        emoji: Set("🍬".into()),
        color: Set("#FF9B85".into()),
        image_url: Set(None),
        stock: Set(stock),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}

fn auth_user(user_id: i64, role: &str, email: &str, full_name: &str) -> AuthUser {
    AuthUser {
        user_id,
        email: email.to_string(),
        full_name: full_name.to_string(),
        role: role.to_string(),
    }
}

fn line(product_id: Option<i64>, name: &str, price: i64, qty: i32) -> OrderItemInput {
    OrderItemInput {
        product_id,
        product_name: name.to_string(),
        emoji: None,
        price,
        qty,
    }
}

fn order_request(user_id: Option<i64>, items: Vec<OrderItemInput>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        customer_name: "Pu Nguyen".into(),
        customer_phone: "0901234567".into(),
        customer_address: "12 Snack Street, District 1".into(),
        note: None,
        payment_method: None,
        items,
        user_id,
    }
}

fn default_query() -> OrderListQuery {
    OrderListQuery {
        page: None,
        limit: None,
        status: None,
    }
}
