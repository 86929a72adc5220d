use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, SqlitePool};
use uuid::Uuid;

use crate::config::Config;
use crate::models::Role;

const MAX_ATTEMPTS: u32 = 3;

/// Delay before retry number `attempt` (1-based): 200ms, 400ms, ... capped at 2s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let millis = 100u64.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(millis.min(2000))
}

fn is_transient(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_)
    )
}

/// Runs `op` up to three times, sleeping with exponential backoff between
/// attempts that failed with a connection-level error.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    tracing::error!(error = %e, "database connection failed, giving up");
                    return Err(e);
                }
                tracing::warn!(error = %e, attempt, max = MAX_ATTEMPTS, "database connection error, retrying");
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = with_retry(|| {
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_opts.clone())
    })
    .await?;

    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'USER' CHECK(role IN ('USER', 'ADMIN')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS companies (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            speciality TEXT NOT NULL,
            address TEXT NOT NULL,
            logo_url TEXT,
            latitude REAL,
            longitude REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS branches (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            address TEXT NOT NULL,
            primary_phone TEXT NOT NULL,
            secondary_phone TEXT,
            latitude REAL,
            longitude REAL,
            company_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(company_id) REFERENCES companies(id) ON DELETE CASCADE
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_branches_company_id ON branches(company_id);")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS news (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            main_image TEXT,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            news_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(news_id) REFERENCES news(id) ON DELETE CASCADE
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_images_news_id ON images(news_id);")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS advertisements (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Creates the bootstrap admin unless a user with that email exists.
/// Returns `true` when a new row was inserted.
pub async fn ensure_admin(pool: &SqlitePool, config: &Config) -> Result<bool, crate::error::ApiError> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind(&config.admin_email)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(false);
    }

    let hash = crate::session::hash_password(config.admin_password.clone(), config.bcrypt_cost).await?;
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO users (id, name, email, password, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&config.admin_name)
    .bind(&config.admin_email)
    .bind(&hash)
    .bind(Role::Admin.as_str())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::info!(email = %config.admin_email, "bootstrap admin created");
    Ok(true)
}

pub async fn seed(pool: &SqlitePool, config: &Config) -> Result<(), crate::error::ApiError> {
    ensure_admin(pool, config).await?;

    let ads = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM advertisements")
        .fetch_one(pool)
        .await?;
    if ads == 0 {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO advertisements (id, content, date, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind("مرحباً بكم في سيول ليبيا للسيارات - الوكيل الحصري للسيارات الكورية")
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
        tracing::info!("sample advertisement created");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(400));
        assert_eq!(backoff_delay(4), Duration::from_millis(1600));
        assert_eq!(backoff_delay(5), Duration::from_millis(2000));
        assert_eq!(backoff_delay(40), Duration::from_millis(2000));
    }

    #[actix_web::test]
    async fn retry_gives_up_after_three_transient_failures() {
        let calls = AtomicU32::new(0);
        let res: Result<(), sqlx::Error> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(sqlx::Error::PoolTimedOut) }
        })
        .await;
        assert!(matches!(res, Err(sqlx::Error::PoolTimedOut)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[actix_web::test]
    async fn retry_does_not_repeat_permanent_errors() {
        let calls = AtomicU32::new(0);
        let res: Result<(), sqlx::Error> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(sqlx::Error::RowNotFound) }
        })
        .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn seeding_is_idempotent() {
        let config = Config { bcrypt_cost: 4, ..Config::default() };
        let pool = init_pool("sqlite::memory:", 1).await.unwrap();

        assert!(ensure_admin(&pool, &config).await.unwrap());
        seed(&pool, &config).await.unwrap();
        seed(&pool, &config).await.unwrap();

        let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        let ads = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM advertisements")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);
        assert_eq!(ads, 1);
    }
}
