use snackshop_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    services::auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    ensure_user(&pool, "admin@snackshop.test", "admin123", "Shop Admin", "admin").await?;
    ensure_user(&pool, "staff@snackshop.test", "staff123", "Shop Staff", "staff").await?;
    ensure_user(&pool, "customer@snackshop.test", "customer123", "Test Customer", "customer").await?;
    seed_categories(&pool).await?;
    seed_products(&pool).await?;

    println!("Seed completed");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    full_name: &str,
    role: &str,
) -> anyhow::Result<()> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, full_name, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(role)
    .execute(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(())
}

async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let categories = vec![
        ("keo-banh", "Candy & Cookies", "🍬"),
        ("do-uong", "Drinks", "🧃"),
        ("snack", "Snacks", "🍿"),
        ("trai-cay-say", "Dried Fruit", "🥭"),
    ];

    for (id, name, emoji) in categories {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, emoji)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(emoji)
        .execute(pool)
        .await?;
    }

    println!("Seeded categories");
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (name, category, price, original_price, description, emoji, stock)
    let products: Vec<(&str, &str, i64, Option<i64>, &str, &str, i32)> = vec![
        (
            "Salted Egg Potato Chips",
            "snack",
            35_000,
            Some(45_000),
            "Crispy chips with a rich salted egg coating",
            "🍟",
            120,
        ),
        (
            "Milk Tea Bottle",
            "do-uong",
            28_000,
            None,
            "Classic milk tea, brewed daily",
            "🧋",
            60,
        ),
        (
            "Chewy Mango Candy",
            "keo-banh",
            22_000,
            None,
            "Soft candy made from real mango pulp",
            "🥭",
            -1,
        ),
        (
            "Dried Jackfruit",
            "trai-cay-say",
            52_000,
            Some(60_000),
            "Vacuum-fried jackfruit, no added sugar",
            "🍈",
            35,
        ),
        (
            "Seaweed Rice Crackers",
            "snack",
            18_000,
            None,
            "Light rice crackers with toasted seaweed",
            "🍘",
            -1,
        ),
    ];

    for (name, category_id, price, original_price, description, emoji, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (name, category_id, price, original_price, description, emoji, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(category_id)
        .bind(price)
        .bind(original_price)
        .bind(description)
        .bind(emoji)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
