use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{self, Branch, Company, CompanyRequest, CompanyWithBranches};
use crate::session::AdminUser;
use crate::state::AppState;

pub(crate) async fn fetch_company(pool: &SqlitePool, id: &str) -> ApiResult<Option<Company>> {
    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(company)
}

pub async fn list_companies(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let pool = &state.pool;

    let companies = sqlx::query_as::<_, Company>("SELECT * FROM companies ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    let branches = sqlx::query_as::<_, Branch>("SELECT * FROM branches ORDER BY created_at")
        .fetch_all(pool)
        .await?;

    let mut by_company: HashMap<String, Vec<Branch>> = HashMap::new();
    for branch in branches {
        by_company.entry(branch.company_id.clone()).or_default().push(branch);
    }

    let items: Vec<CompanyWithBranches> = companies
        .into_iter()
        .map(|company| {
            let branches = by_company.remove(&company.id).unwrap_or_default();
            CompanyWithBranches { company, branches }
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_company(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let pool = &state.pool;

    let company = fetch_company(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company"))?;
    let branches = sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE company_id = ? ORDER BY created_at")
        .bind(&id)
        .fetch_all(pool)
        .await?;

    Ok(HttpResponse::Ok().json(CompanyWithBranches { company, branches }))
}

pub async fn create_company(
    admin: AdminUser,
    data: web::Json<CompanyRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let req = data.into_inner();
    req.validate()?;

    let now = models::now();
    let company = Company {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        speciality: req.speciality,
        address: req.address,
        logo_url: models::non_blank(req.logo_url),
        latitude: req.latitude,
        longitude: req.longitude,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO companies (id, name, speciality, address, logo_url, latitude, longitude, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&company.id)
    .bind(&company.name)
    .bind(&company.speciality)
    .bind(&company.address)
    .bind(&company.logo_url)
    .bind(company.latitude)
    .bind(company.longitude)
    .bind(&company.created_at)
    .bind(&company.updated_at)
    .execute(&state.pool)
    .await?;

    tracing::info!(company_id = %company.id, by = %admin.0.id, "company created");
    Ok(HttpResponse::Created().json(company))
}

pub async fn update_company(
    _admin: AdminUser,
    path: web::Path<String>,
    data: web::Json<CompanyRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let req = data.into_inner();
    req.validate()?;
    let pool = &state.pool;

    let updated = sqlx::query(
        "UPDATE companies SET name = ?, speciality = ?, address = ?, logo_url = ?, latitude = ?, longitude = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(&req.name)
    .bind(&req.speciality)
    .bind(&req.address)
    .bind(models::non_blank(req.logo_url))
    .bind(req.latitude)
    .bind(req.longitude)
    .bind(models::now())
    .bind(&id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Company"));
    }

    let company = fetch_company(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company"))?;
    Ok(HttpResponse::Ok().json(company))
}

pub async fn delete_company(
    admin: AdminUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let deleted = sqlx::query("DELETE FROM companies WHERE id = ?")
        .bind(&id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Company"));
    }

    tracing::info!(company_id = %id, by = %admin.0.id, "company deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Company deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    use crate::test_support::{self, bearer};

    fn company_body() -> Value {
        json!({
            "name": "Hyundai Libya",
            "speciality": "Korean cars",
            "address": "Airport Road, Tripoli",
            "logoUrl": null,
            "latitude": 32.88,
            "longitude": 13.19
        })
    }

    #[actix_web::test]
    async fn unauthenticated_create_is_rejected() {
        let state = test_support::state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/companies")
            .set_json(company_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn non_admin_create_is_rejected() {
        let state = test_support::state().await;
        let token = test_support::user_token(&state).await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/companies")
            .insert_header(bearer(&token))
            .set_json(company_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn create_read_update_delete() {
        let state = test_support::state().await;
        let token = test_support::admin_token(&state).await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/companies")
            .insert_header(bearer(&token))
            .set_json(company_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["speciality"], "Korean cars");
        assert_eq!(created["latitude"], 32.88);

        let req = test::TestRequest::get().uri(&format!("/api/companies/{}", id)).to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["name"], "Hyundai Libya");
        assert_eq!(fetched["branches"], json!([]));

        let mut body = company_body();
        body["name"] = json!("Hyundai Tripoli");
        let req = test::TestRequest::put()
            .uri(&format!("/api/companies/{}", id))
            .insert_header(bearer(&token))
            .set_json(body)
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["name"], "Hyundai Tripoli");

        let req = test::TestRequest::get().uri("/api/companies").to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/companies/{}", id))
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri(&format!("/api/companies/{}", id)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn invalid_body_reports_fields() {
        let state = test_support::state().await;
        let token = test_support::admin_token(&state).await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/companies")
            .insert_header(bearer(&token))
            .set_json(json!({ "name": "K", "address": "x" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Validation error");
        assert!(body["details"]["speciality"].is_array());
        assert!(body["details"]["address"].is_array());
    }

    #[actix_web::test]
    async fn update_missing_company_is_404() {
        let state = test_support::state().await;
        let token = test_support::admin_token(&state).await;
        let app = test_app!(state);

        let req = test::TestRequest::put()
            .uri("/api/companies/does-not-exist")
            .insert_header(bearer(&token))
            .set_json(company_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn malformed_json_is_400() {
        let state = test_support::state().await;
        let token = test_support::admin_token(&state).await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/companies")
            .insert_header(bearer(&token))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid JSON");
    }

    #[actix_web::test]
    async fn company_names_are_not_unique() {
        let state = test_support::state().await;
        let token = test_support::admin_token(&state).await;
        let app = test_app!(state);

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/api/companies")
                .insert_header(bearer(&token))
                .set_json(company_body())
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/api/companies").to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.as_array().unwrap().len(), 2);
        assert_ne!(list[0]["id"], list[1]["id"]);
    }
}
