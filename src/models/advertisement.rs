use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    pub id: String,
    pub content: String,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdvertisementRequest {
    #[serde(default)]
    #[validate(length(min = 5, message = "Advertisement content must be at least 5 characters"))]
    pub content: String,
    pub date: Option<String>,
}
