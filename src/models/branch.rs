use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Company;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub address: String,
    pub primary_phone: String,
    pub secondary_phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub company_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct BranchWithCompany {
    #[serde(flatten)]
    pub branch: Branch,
    pub company: Company,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BranchRequest {
    #[serde(default)]
    #[validate(length(min = 2, message = "Branch name must be at least 2 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 5, message = "Address must be at least 5 characters"))]
    pub address: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Primary phone must be at least 8 digits"))]
    pub primary_phone: String,
    pub secondary_phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Company is required"))]
    pub company_id: String,
}
