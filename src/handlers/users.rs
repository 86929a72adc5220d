use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{self, PublicUser, Role, UserCreateRequest, UserUpdateRequest};
use crate::session::{self, AdminUser};
use crate::state::AppState;

const PUBLIC_COLUMNS: &str = "id, name, email, role, created_at, updated_at";

async fn fetch_public_user(pool: &SqlitePool, id: &str) -> ApiResult<Option<PublicUser>> {
    let user = sqlx::query_as::<_, PublicUser>(&format!("SELECT {} FROM users WHERE id = ?", PUBLIC_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

async fn email_taken(pool: &SqlitePool, email: &str, except_id: Option<&str>) -> ApiResult<bool> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM users WHERE email = ? AND id != ?")
        .bind(email)
        .bind(except_id.unwrap_or(""))
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Inserts a user with an already-validated payload. Shared with first-run registration.
pub(crate) async fn insert_user(
    state: &AppState,
    name: &str,
    email: &str,
    password: String,
    role: Role,
) -> ApiResult<PublicUser> {
    let pool = &state.pool;
    if email_taken(pool, email, None).await? {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let hash = session::hash_password(password, state.config.bcrypt_cost).await?;
    let now = models::now();
    let user = PublicUser {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role: role.as_str().to_string(),
        created_at: now.clone(),
        updated_at: now,
    };

    let res = sqlx::query(
        "INSERT INTO users (id, name, email, password, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&hash)
    .bind(&user.role)
    .bind(&user.created_at)
    .bind(&user.updated_at)
    .execute(pool)
    .await;

    match res {
        Ok(_) => Ok(user),
        Err(e) => Err(match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict("User with this email already exists".to_string()),
            other => other,
        }),
    }
}

pub async fn list_users(_admin: AdminUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let users = sqlx::query_as::<_, PublicUser>(&format!("SELECT {} FROM users ORDER BY created_at", PUBLIC_COLUMNS))
        .fetch_all(&state.pool)
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

pub async fn get_user(
    _admin: AdminUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let user = fetch_public_user(&state.pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn create_user(
    admin: AdminUser,
    data: web::Json<UserCreateRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let req = data.into_inner();
    req.validate()?;

    let user = insert_user(&state, &req.name, &req.email, req.password, req.role).await?;
    tracing::info!(user_id = %user.id, role = %user.role, by = %admin.0.id, "user created");
    Ok(HttpResponse::Created().json(user))
}

pub async fn update_user(
    _admin: AdminUser,
    path: web::Path<String>,
    data: web::Json<UserUpdateRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let req = data.into_inner();
    req.validate()?;
    let pool = &state.pool;

    if fetch_public_user(pool, &id).await?.is_none() {
        return Err(ApiError::not_found("User"));
    }
    if email_taken(pool, &req.email, Some(&id)).await? {
        return Err(ApiError::BadRequest("User with this email already exists".to_string()));
    }

    let now = models::now();
    match models::non_blank(req.password) {
        Some(password) => {
            let hash = session::hash_password(password, state.config.bcrypt_cost).await?;
            sqlx::query("UPDATE users SET name = ?, email = ?, role = ?, password = ?, updated_at = ? WHERE id = ?")
                .bind(&req.name)
                .bind(&req.email)
                .bind(req.role.as_str())
                .bind(&hash)
                .bind(&now)
                .bind(&id)
                .execute(pool)
                .await?;
        }
        None => {
            sqlx::query("UPDATE users SET name = ?, email = ?, role = ?, updated_at = ? WHERE id = ?")
                .bind(&req.name)
                .bind(&req.email)
                .bind(req.role.as_str())
                .bind(&now)
                .bind(&id)
                .execute(pool)
                .await?;
        }
    }

    let user = fetch_public_user(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn delete_user(
    admin: AdminUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let deleted = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(&id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("User"));
    }

    tracing::info!(user_id = %id, by = %admin.0.id, "user deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}
