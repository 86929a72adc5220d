use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Image;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: String,
    pub title: String,
    pub content: String,
    pub main_image: Option<String>,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct NewsWithImages {
    #[serde(flatten)]
    pub news: News,
    pub images: Vec<Image>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewsRequest {
    #[serde(default)]
    #[validate(length(min = 5, message = "Title must be at least 5 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 10, message = "Content must be at least 10 characters"))]
    pub content: String,
    pub main_image: Option<String>,
    pub date: Option<String>,
}
