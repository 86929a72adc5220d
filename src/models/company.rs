use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Branch;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub speciality: String,
    pub address: String,
    pub logo_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct CompanyWithBranches {
    #[serde(flatten)]
    pub company: Company,
    pub branches: Vec<Branch>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRequest {
    #[serde(default)]
    #[validate(length(min = 2, message = "Company name must be at least 2 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 2, message = "Speciality must be at least 2 characters"))]
    pub speciality: String,
    #[serde(default)]
    #[validate(length(min = 5, message = "Address must be at least 5 characters"))]
    pub address: String,
    pub logo_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_null_coordinates_and_logo() {
        let req: CompanyRequest = serde_json::from_str(
            r#"{"name":"Hyundai","speciality":"Cars","address":"Tripoli, Libya","logoUrl":null,"latitude":null}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(req.logo_url.is_none());
    }

    #[test]
    fn missing_fields_fail_validation() {
        let req: CompanyRequest = serde_json::from_str(r#"{"name":"K"}"#).unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("speciality"));
        assert!(fields.contains_key("address"));
    }
}
