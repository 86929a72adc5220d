use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{self, Advertisement, AdvertisementRequest};
use crate::session::AdminUser;
use crate::state::AppState;

/// Missing or blank dates mean "now", on create and on update alike.
fn resolve_date(raw: Option<String>) -> ApiResult<String> {
    match models::non_blank(raw) {
        Some(raw) => models::parse_date(&raw).ok_or_else(|| ApiError::BadRequest("Invalid date".to_string())),
        None => Ok(models::now()),
    }
}

pub async fn list_advertisements(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let ads = sqlx::query_as::<_, Advertisement>("SELECT * FROM advertisements ORDER BY date DESC")
        .fetch_all(&state.pool)
        .await?;
    Ok(HttpResponse::Ok().json(ads))
}

pub async fn get_advertisement(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let ad = sqlx::query_as::<_, Advertisement>("SELECT * FROM advertisements WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Advertisement"))?;
    Ok(HttpResponse::Ok().json(ad))
}

pub async fn create_advertisement(
    _admin: AdminUser,
    data: web::Json<AdvertisementRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let req = data.into_inner();
    req.validate()?;

    let now = models::now();
    let ad = Advertisement {
        id: Uuid::new_v4().to_string(),
        content: req.content,
        date: resolve_date(req.date)?,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query("INSERT INTO advertisements (id, content, date, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&ad.id)
        .bind(&ad.content)
        .bind(&ad.date)
        .bind(&ad.created_at)
        .bind(&ad.updated_at)
        .execute(&state.pool)
        .await?;

    Ok(HttpResponse::Created().json(ad))
}

pub async fn update_advertisement(
    _admin: AdminUser,
    path: web::Path<String>,
    data: web::Json<AdvertisementRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let req = data.into_inner();
    req.validate()?;
    let date = resolve_date(req.date)?;

    let updated = sqlx::query("UPDATE advertisements SET content = ?, date = ?, updated_at = ? WHERE id = ?")
        .bind(&req.content)
        .bind(&date)
        .bind(models::now())
        .bind(&id)
        .execute(&state.pool)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Advertisement"));
    }

    let ad = sqlx::query_as::<_, Advertisement>("SELECT * FROM advertisements WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.pool)
        .await?;
    Ok(HttpResponse::Ok().json(ad))
}

pub async fn delete_advertisement(
    _admin: AdminUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let deleted = sqlx::query("DELETE FROM advertisements WHERE id = ?")
        .bind(&id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Advertisement"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Deleted successfully" })))
}
