use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::handlers::files::remove_stored_upload;
use crate::handlers::news::fetch_news;
use crate::models::{self, Image, ImageRequest, ImageWithNews, News};
use crate::session::AdminUser;
use crate::state::AppState;

async fn fetch_image(pool: &SqlitePool, id: &str) -> ApiResult<Option<Image>> {
    let image = sqlx::query_as::<_, Image>("SELECT * FROM images WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(image)
}

async fn ensure_news_exists(pool: &SqlitePool, news_id: &str) -> ApiResult<()> {
    match fetch_news(pool, news_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::BadRequest("News does not exist".to_string())),
    }
}

pub async fn list_images(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let pool = &state.pool;

    let images = sqlx::query_as::<_, Image>("SELECT * FROM images ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    let news: HashMap<String, News> = sqlx::query_as::<_, News>("SELECT * FROM news")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|n| (n.id.clone(), n))
        .collect();

    let items: Vec<ImageWithNews> = images
        .into_iter()
        .filter_map(|image| {
            let news = news.get(&image.news_id)?.clone();
            Some(ImageWithNews { image, news })
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_image(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let pool = &state.pool;

    let image = fetch_image(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Image"))?;
    let news = fetch_news(pool, &image.news_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Image"))?;

    Ok(HttpResponse::Ok().json(ImageWithNews { image, news }))
}

pub async fn create_image(
    _admin: AdminUser,
    data: web::Json<ImageRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let req = data.into_inner();
    req.validate()?;
    let pool = &state.pool;
    ensure_news_exists(pool, &req.news_id).await?;

    let image = Image {
        id: Uuid::new_v4().to_string(),
        url: req.url,
        news_id: req.news_id,
        created_at: models::now(),
    };

    sqlx::query("INSERT INTO images (id, url, news_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(&image.id)
        .bind(&image.url)
        .bind(&image.news_id)
        .bind(&image.created_at)
        .execute(pool)
        .await?;

    Ok(HttpResponse::Created().json(image))
}

pub async fn update_image(
    _admin: AdminUser,
    path: web::Path<String>,
    data: web::Json<ImageRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let req = data.into_inner();
    req.validate()?;
    let pool = &state.pool;

    if fetch_image(pool, &id).await?.is_none() {
        return Err(ApiError::not_found("Image"));
    }
    ensure_news_exists(pool, &req.news_id).await?;

    sqlx::query("UPDATE images SET url = ?, news_id = ? WHERE id = ?")
        .bind(&req.url)
        .bind(&req.news_id)
        .bind(&id)
        .execute(pool)
        .await?;

    let image = fetch_image(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Image"))?;
    Ok(HttpResponse::Ok().json(image))
}

pub async fn delete_image(
    _admin: AdminUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let pool = &state.pool;

    let image = fetch_image(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Image"))?;

    let deleted = sqlx::query("DELETE FROM images WHERE id = ?")
        .bind(&id)
        .execute(pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Image"));
    }

    remove_stored_upload(&state.config, &image.url).await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Image deleted successfully" })))
}
