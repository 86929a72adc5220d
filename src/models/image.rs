use serde::{Deserialize, Serialize};
use validator::Validate;

use super::News;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    pub url: String,
    pub news_id: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ImageWithNews {
    #[serde(flatten)]
    pub image: Image,
    pub news: News,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Image URL is required"))]
    pub url: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "News id is required"))]
    pub news_id: String,
}
