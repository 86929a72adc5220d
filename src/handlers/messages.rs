use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::i18n::{self, Text};
use crate::models::{self, ContactMessage, MessageRequest};
use crate::session::AdminUser;
use crate::state::AppState;

pub async fn list_messages(_admin: AdminUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let messages = sqlx::query_as::<_, ContactMessage>("SELECT * FROM messages ORDER BY created_at DESC")
        .fetch_all(&state.pool)
        .await?;
    Ok(HttpResponse::Ok().json(messages))
}

pub async fn get_message(
    _admin: AdminUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let message = sqlx::query_as::<_, ContactMessage>("SELECT * FROM messages WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Message"))?;
    Ok(HttpResponse::Ok().json(message))
}

/// Public contact form.
pub async fn create_message(
    req: HttpRequest,
    data: web::Json<MessageRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let locale = i18n::detect_locale(&req);
    let body = data.into_inner();
    body.validate()?;

    sqlx::query("INSERT INTO messages (id, name, email, message, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(&body.name)
        .bind(&body.email)
        .bind(&body.message)
        .bind(models::now())
        .execute(&state.pool)
        .await?;

    Ok(HttpResponse::Created().json(json!({ "message": i18n::text(locale, Text::MessageSent) })))
}

pub async fn delete_message(
    _admin: AdminUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let deleted = sqlx::query("DELETE FROM messages WHERE id = ?")
        .bind(&id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Message"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Message deleted successfully" })))
}
