pub mod auth;
pub mod companies;
pub mod branches;
pub mod news;
pub mod images;
pub mod advertisements;
pub mod messages;
pub mod users;
pub mod upload;
pub mod files;

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

/// Liveness plus a one-query database probe. An unreachable database
/// answers 503.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => "up",
        Err(e) => {
            tracing::error!(error = %e, "health probe could not reach the database");
            "down"
        }
    };

    let mut resp = if database == "up" {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    resp.json(json!({
        "status": if database == "up" { "OK" } else { "DEGRADED" },
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
