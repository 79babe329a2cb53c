use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sqlx::FromRow;

use crate::{
    db::DbPool,
    dto::auth::{
        AuthResponse, ChangePasswordRequest, Claims, LoginRequest, RegisterRequest,
        UpdateProfileRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
};

const PUBLIC_USER_COLUMNS: &str = "id, email, full_name, phone, address, role, created_at";

// The hash never crosses the service boundary; this row type stays
// private to the credential checks.
#[derive(FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

pub async fn register_user(
    pool: &DbPool,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let RegisterRequest {
        email,
        password,
        full_name,
        phone,
    } = payload;

    if email.trim().is_empty() || full_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Email, password and full name are required".into(),
        ));
    }
    if password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Email is already in use".into()));
    }

    let password_hash = hash_password(&password)?;

    let user: User = sqlx::query_as(&format!(
        "INSERT INTO users (email, password_hash, full_name, phone) \
         VALUES ($1, $2, $3, $4) RETURNING {PUBLIC_USER_COLUMNS}"
    ))
    .bind(email.trim())
    .bind(password_hash)
    .bind(full_name.trim())
    .bind(phone)
    .fetch_one(pool)
    .await?;

    let token = issue_token(&user)?;

    Ok(ApiResponse::success(
        "Registration successful",
        AuthResponse { token, user },
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    pool: &DbPool,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let LoginRequest { email, password } = payload;

    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".into()));
    }

    let row: Option<CredentialRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

    let row = match row {
        Some(r) => r,
        None => {
            return Err(AppError::Unauthorized("Invalid email or password".into()));
        }
    };

    verify_password(&password, &row.password_hash)
        .map_err(|_| AppError::Unauthorized("Invalid email or password".into()))?;

    let token = issue_token(&row.user)?;

    Ok(ApiResponse::success(
        "Login successful",
        AuthResponse {
            token,
            user: row.user,
        },
        Some(Meta::empty()),
    ))
}

pub async fn current_user(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let found: Option<User> = sqlx::query_as(&format!(
        "SELECT {PUBLIC_USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user.user_id)
    .fetch_optional(pool)
    .await?;

    match found {
        Some(u) => Ok(ApiResponse::success("OK", u, None)),
        None => Err(AppError::NotFound("User not found".into())),
    }
}

/// Absent fields keep their current value.
pub async fn update_profile(
    pool: &DbPool,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let updated: User = sqlx::query_as(&format!(
        "UPDATE users SET \
            full_name = COALESCE($1, full_name), \
            phone = COALESCE($2, phone), \
            address = COALESCE($3, address) \
         WHERE id = $4 RETURNING {PUBLIC_USER_COLUMNS}"
    ))
    .bind(payload.full_name)
    .bind(payload.phone)
    .bind(payload.address)
    .bind(user.user_id)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success(
        "Profile updated",
        updated,
        Some(Meta::empty()),
    ))
}

pub async fn change_password(
    pool: &DbPool,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let ChangePasswordRequest {
        current_password,
        new_password,
    } = payload;

    if current_password.is_empty() || new_password.is_empty() {
        return Err(AppError::BadRequest(
            "Current and new password are required".into(),
        ));
    }
    if new_password.len() < 6 {
        return Err(AppError::BadRequest(
            "New password must be at least 6 characters".into(),
        ));
    }

    let stored: Option<(String,)> =
        sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.user_id)
            .fetch_optional(pool)
            .await?;
    let stored = match stored {
        Some((hash,)) => hash,
        None => return Err(AppError::NotFound("User not found".into())),
    };

    verify_password(&current_password, &stored)
        .map_err(|_| AppError::Unauthorized("Current password is incorrect".into()))?;

    let new_hash = hash_password(&new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(new_hash)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    Ok(ApiResponse::success(
        "Password changed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), ()> {
    let parsed = PasswordHash::new(hash).map_err(|_| ())?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ())
}

fn issue_token(user: &User) -> AppResult<String> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::days(7))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}
