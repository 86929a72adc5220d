use actix_web::{web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::handlers::users::insert_user;
use crate::models::{LoginRequest, PublicUser, Role, User, UserCreateRequest};
use crate::session::{self, CurrentUser};
use crate::state::AppState;

pub async fn login(
    data: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let auth_req = data.into_inner();
    auth_req.validate()?;
    let pool = &state.pool;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? LIMIT 1")
        .bind(&auth_req.email)
        .fetch_optional(pool)
        .await?;

    let user = match user {
        Some(u) => u,
        None => {
            tracing::info!(email = %auth_req.email, "login for unknown email");
            return Err(ApiError::Unauthorized);
        }
    };

    if !session::verify_password(auth_req.password, user.password.clone()).await? {
        tracing::info!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::Unauthorized);
    }

    session::purge_expired_sessions(pool).await?;
    let ttl_days = state.config.session_ttl_days;
    let new_session = session::create_session(pool, &user.id, ttl_days).await?;
    let cookie = session::session_cookie(&new_session.token, ttl_days, state.config.cookie_secure);

    tracing::info!(user_id = %user.id, "login successful");
    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "message": "Login successful",
        "user": PublicUser::from(user),
        "token": new_session.token,
        "expiresAt": new_session.expires_at.to_rfc3339(),
    })))
}

pub async fn logout(current: CurrentUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    session::delete_session(&state.pool, &current.token).await?;
    Ok(HttpResponse::Ok()
        .cookie(session::removal_cookie())
        .json(json!({ "message": "Logged out" })))
}

pub async fn current_session(current: CurrentUser) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({ "user": PublicUser::from(current.user) })))
}

/// First-run registration. Open only while the users table is empty and the
/// account it creates is always an admin.
pub async fn register(
    data: web::Json<UserCreateRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let user_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM users")
        .fetch_one(&state.pool)
        .await?;
    if user_count > 0 {
        return Err(ApiError::Forbidden("Registration is disabled".to_string()));
    }

    let req = data.into_inner();
    req.validate()?;

    let user = insert_user(&state, &req.name, &req.email, req.password, Role::Admin).await?;
    tracing::info!(user_id = %user.id, "first admin registered");
    Ok(HttpResponse::Created().json(user))
}

pub async fn setup(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let created = db::ensure_admin(&state.pool, &state.config).await?;
    let message = if created {
        "Database setup completed successfully"
    } else {
        "Admin user already exists"
    };
    Ok(HttpResponse::Ok().json(json!({
        "message": message,
        "success": true,
        "created": created,
    })))
}
