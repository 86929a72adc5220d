use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::handlers::files::remove_stored_upload;
use crate::models::{self, Image, News, NewsRequest, NewsWithImages};
use crate::session::AdminUser;
use crate::state::AppState;

pub(crate) async fn fetch_news(pool: &SqlitePool, id: &str) -> ApiResult<Option<News>> {
    let news = sqlx::query_as::<_, News>("SELECT * FROM news WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(news)
}

fn resolve_date(raw: Option<String>) -> ApiResult<String> {
    match models::non_blank(raw) {
        Some(raw) => models::parse_date(&raw).ok_or_else(|| ApiError::BadRequest("Invalid date".to_string())),
        None => Ok(models::now()),
    }
}

pub async fn list_news(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let pool = &state.pool;

    let news = sqlx::query_as::<_, News>("SELECT * FROM news ORDER BY date DESC")
        .fetch_all(pool)
        .await?;
    let images = sqlx::query_as::<_, Image>("SELECT * FROM images ORDER BY created_at")
        .fetch_all(pool)
        .await?;

    let mut by_news: HashMap<String, Vec<Image>> = HashMap::new();
    for image in images {
        by_news.entry(image.news_id.clone()).or_default().push(image);
    }

    let items: Vec<NewsWithImages> = news
        .into_iter()
        .map(|news| {
            let images = by_news.remove(&news.id).unwrap_or_default();
            NewsWithImages { news, images }
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_news(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let pool = &state.pool;

    let news = fetch_news(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("News"))?;
    let images = sqlx::query_as::<_, Image>("SELECT * FROM images WHERE news_id = ? ORDER BY created_at")
        .bind(&id)
        .fetch_all(pool)
        .await?;

    Ok(HttpResponse::Ok().json(NewsWithImages { news, images }))
}

pub async fn create_news(
    _admin: AdminUser,
    data: web::Json<NewsRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let req = data.into_inner();
    req.validate()?;

    let now = models::now();
    let news = News {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        content: req.content,
        main_image: models::non_blank(req.main_image),
        date: resolve_date(req.date)?,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO news (id, title, content, main_image, date, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&news.id)
    .bind(&news.title)
    .bind(&news.content)
    .bind(&news.main_image)
    .bind(&news.date)
    .bind(&news.created_at)
    .bind(&news.updated_at)
    .execute(&state.pool)
    .await?;

    tracing::info!(news_id = %news.id, "news created");
    Ok(HttpResponse::Created().json(news))
}

pub async fn update_news(
    _admin: AdminUser,
    path: web::Path<String>,
    data: web::Json<NewsRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let req = data.into_inner();
    req.validate()?;
    let pool = &state.pool;

    let current = fetch_news(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("News"))?;
    // The publication date only moves when the client sends one.
    let date = match models::non_blank(req.date) {
        Some(raw) => resolve_date(Some(raw))?,
        None => current.date,
    };

    let updated = sqlx::query(
        "UPDATE news SET title = ?, content = ?, main_image = ?, date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&req.title)
    .bind(&req.content)
    .bind(models::non_blank(req.main_image))
    .bind(&date)
    .bind(models::now())
    .bind(&id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("News"));
    }

    let news = fetch_news(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("News"))?;
    Ok(HttpResponse::Ok().json(news))
}

pub async fn delete_news(
    _admin: AdminUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let pool = &state.pool;

    // Image rows go with the news row; their files have to be collected first.
    let image_urls = sqlx::query_scalar::<_, String>("SELECT url FROM images WHERE news_id = ?")
        .bind(&id)
        .fetch_all(pool)
        .await?;

    let deleted = sqlx::query("DELETE FROM news WHERE id = ?")
        .bind(&id)
        .execute(pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("News"));
    }

    for url in &image_urls {
        remove_stored_upload(&state.config, url).await;
    }

    tracing::info!(news_id = %id, images = image_urls.len(), "news deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "News deleted successfully" })))
}
