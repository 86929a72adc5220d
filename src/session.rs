//! Session handling: password hashing, session rows and the request
//! extractors that gate write endpoints.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{DateTime, Utc};
use futures_util::future::LocalBoxFuture;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session_token";

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    let hash = web::block(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    // A malformed stored hash counts as a mismatch.
    let valid = web::block(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?;
    Ok(valid)
}

pub struct NewSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn create_session(pool: &SqlitePool, user_id: &str, ttl_days: i64) -> Result<NewSession, ApiError> {
    let token = Uuid::new_v4().to_string();
    let created_at = Utc::now();
    let expires_at = created_at + chrono::Duration::days(ttl_days);

    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(created_at.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(pool)
        .await?;

    Ok(NewSession { token, expires_at })
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Resolves a token to its user. Expired sessions are removed on sight.
pub async fn find_session_user(pool: &SqlitePool, token: &str) -> Result<Option<User>, ApiError> {
    let expires_at = sqlx::query_scalar::<_, String>("SELECT expires_at FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;

    let expires_at = match expires_at {
        Some(raw) => raw,
        None => return Ok(None),
    };

    let expired = DateTime::parse_from_rfc3339(&expires_at)
        .map(|dt| dt.with_timezone(&Utc) <= Utc::now())
        .unwrap_or(true);
    if expired {
        delete_session(pool, token).await?;
        return Ok(None);
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT u.id, u.name, u.email, u.password, u.role, u.created_at, u.updated_at \
         FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Deletes every expired session row. Returns how many were removed.
pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64, ApiError> {
    let rows = sqlx::query_as::<_, (String, String)>("SELECT token, expires_at FROM sessions")
        .fetch_all(pool)
        .await?;

    let now = Utc::now();
    let mut removed = 0;
    for (token, expires_at) in rows {
        let expired = DateTime::parse_from_rfc3339(&expires_at)
            .map(|dt| dt.with_timezone(&Utc) <= now)
            .unwrap_or(true);
        if expired {
            delete_session(pool, &token).await?;
            removed += 1;
        }
    }

    if removed > 0 {
        tracing::debug!(removed, "expired sessions purged");
    }
    Ok(removed)
}

/// Tokens presented by the request, cookie before `Authorization: Bearer`.
/// Both are kept so a stale cookie does not mask a valid header.
pub fn presented_tokens(req: &HttpRequest) -> Vec<String> {
    let mut tokens = Vec::with_capacity(2);

    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            tokens.push(value.to_string());
        }
    }

    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }

    tokens
}

pub fn session_cookie(token: &str, ttl_days: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(CookieDuration::days(ttl_days))
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Any signed-in user.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let tokens = presented_tokens(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| ApiError::Internal("application state missing".into()))?;
            for token in tokens {
                if let Some(user) = find_session_user(&state.pool, &token).await? {
                    return Ok(CurrentUser { user, token });
                }
            }
            Err(ApiError::Unauthorized)
        })
    }
}

/// A signed-in user with the `ADMIN` role. Everyone else gets 401.
pub struct AdminUser(pub User);

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let current = CurrentUser::from_request(req, payload);
        let path = req.path().to_string();

        Box::pin(async move {
            let CurrentUser { user, .. } = current.await?;
            if !user.is_admin() {
                tracing::warn!(user_id = %user.id, path = %path, "non-admin user refused");
                return Err(ApiError::Unauthorized);
            }
            Ok(AdminUser(user))
        })
    }
}
