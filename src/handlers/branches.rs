use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::handlers::companies::fetch_company;
use crate::models::{self, Branch, BranchRequest, BranchWithCompany, Company};
use crate::session::AdminUser;
use crate::state::AppState;

async fn fetch_branch(pool: &SqlitePool, id: &str) -> ApiResult<Option<Branch>> {
    let branch = sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(branch)
}

async fn ensure_company_exists(pool: &SqlitePool, company_id: &str) -> ApiResult<()> {
    match fetch_company(pool, company_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::BadRequest("Company does not exist".to_string())),
    }
}

pub async fn list_branches(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let pool = &state.pool;

    let branches = sqlx::query_as::<_, Branch>("SELECT * FROM branches ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    let companies: HashMap<String, Company> = sqlx::query_as::<_, Company>("SELECT * FROM companies")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|c| (c.id.clone(), c))
        .collect();

    // Foreign keys guarantee the owner exists; filter_map only guards against a concurrent delete.
    let items: Vec<BranchWithCompany> = branches
        .into_iter()
        .filter_map(|branch| {
            let company = companies.get(&branch.company_id)?.clone();
            Some(BranchWithCompany { branch, company })
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_branch(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let pool = &state.pool;

    let branch = fetch_branch(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Branch"))?;
    let company = fetch_company(pool, &branch.company_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Branch"))?;

    Ok(HttpResponse::Ok().json(BranchWithCompany { branch, company }))
}

pub async fn create_branch(
    _admin: AdminUser,
    data: web::Json<BranchRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let req = data.into_inner();
    req.validate()?;
    let pool = &state.pool;
    ensure_company_exists(pool, &req.company_id).await?;

    let now = models::now();
    let branch = Branch {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        address: req.address,
        primary_phone: req.primary_phone,
        secondary_phone: models::non_blank(req.secondary_phone),
        latitude: req.latitude,
        longitude: req.longitude,
        company_id: req.company_id,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO branches (id, name, address, primary_phone, secondary_phone, latitude, longitude, company_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&branch.id)
    .bind(&branch.name)
    .bind(&branch.address)
    .bind(&branch.primary_phone)
    .bind(&branch.secondary_phone)
    .bind(branch.latitude)
    .bind(branch.longitude)
    .bind(&branch.company_id)
    .bind(&branch.created_at)
    .bind(&branch.updated_at)
    .execute(pool)
    .await?;

    tracing::info!(branch_id = %branch.id, company_id = %branch.company_id, "branch created");
    Ok(HttpResponse::Created().json(branch))
}

pub async fn update_branch(
    _admin: AdminUser,
    path: web::Path<String>,
    data: web::Json<BranchRequest>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let req = data.into_inner();
    req.validate()?;
    let pool = &state.pool;

    if fetch_branch(pool, &id).await?.is_none() {
        return Err(ApiError::not_found("Branch"));
    }
    ensure_company_exists(pool, &req.company_id).await?;

    let updated = sqlx::query(
        "UPDATE branches SET name = ?, address = ?, primary_phone = ?, secondary_phone = ?, latitude = ?, longitude = ?, \
         company_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&req.name)
    .bind(&req.address)
    .bind(&req.primary_phone)
    .bind(models::non_blank(req.secondary_phone))
    .bind(req.latitude)
    .bind(req.longitude)
    .bind(&req.company_id)
    .bind(models::now())
    .bind(&id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Branch"));
    }

    let branch = fetch_branch(pool, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Branch"))?;
    Ok(HttpResponse::Ok().json(branch))
}

pub async fn delete_branch(
    _admin: AdminUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let deleted = sqlx::query("DELETE FROM branches WHERE id = ?")
        .bind(&id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Branch"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Branch deleted successfully" })))
}
