//! Shared fixtures for handler tests: an in-memory database per test plus
//! helpers for sessions and parent rows.

use actix_web::http::header::{HeaderName, AUTHORIZATION};
use actix_web::web;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{self, Role};
use crate::state::AppState;
use crate::{db, session};

pub const ADMIN_EMAIL: &str = "admin@test.local";
pub const ADMIN_PASSWORD: &str = "admin-secret";

/// Builds the full application around `$state` the same way `main` does.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .configure(crate::routes::configure),
        )
        .await
    };
}

pub fn config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        bcrypt_cost: 4,
        admin_name: "Test Admin".to_string(),
        admin_email: ADMIN_EMAIL.to_string(),
        admin_password: ADMIN_PASSWORD.to_string(),
        ..Config::default()
    }
}

pub async fn state() -> web::Data<AppState> {
    state_with(config()).await
}

pub async fn state_with(config: Config) -> web::Data<AppState> {
    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("in-memory database");
    web::Data::new(AppState::new(pool, config))
}

async fn user_id_by_email(state: &AppState, email: &str) -> String {
    sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(&state.pool)
        .await
        .expect("user row")
}

pub async fn admin_token(state: &AppState) -> String {
    db::ensure_admin(&state.pool, &state.config)
        .await
        .expect("bootstrap admin");
    let id = user_id_by_email(state, ADMIN_EMAIL).await;
    session::create_session(&state.pool, &id, 1)
        .await
        .expect("admin session")
        .token
}

pub async fn user_token(state: &AppState) -> String {
    let email = format!("user-{}@test.local", Uuid::new_v4());
    let hash = session::hash_password("user-secret".to_string(), state.config.bcrypt_cost)
        .await
        .expect("hash");
    let now = models::now();
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO users (id, name, email, password, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind("Plain User")
    .bind(&email)
    .bind(&hash)
    .bind(Role::User.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&state.pool)
    .await
    .expect("insert user");

    session::create_session(&state.pool, &id, 1)
        .await
        .expect("user session")
        .token
}

pub fn bearer(token: &str) -> (HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {}", token))
}

pub async fn insert_company(state: &AppState, name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let now = models::now();
    sqlx::query(
        "INSERT INTO companies (id, name, speciality, address, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind("Passenger cars")
    .bind("Tripoli, Omar Al-Mukhtar St.")
    .bind(&now)
    .bind(&now)
    .execute(&state.pool)
    .await
    .expect("insert company");
    id
}

pub async fn insert_news(state: &AppState, title: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let now = models::now();
    sqlx::query(
        "INSERT INTO news (id, title, content, date, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(title)
    .bind("New models arrive at the showroom this month.")
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(&state.pool)
    .await
    .expect("insert news");
    id
}
