use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Uploaded images are returned as `data:` URLs and never touch the disk.
    Inline,
    /// Uploaded images are written under `upload_dir` and served from `/uploads`.
    Disk,
}

impl FromStr for UploadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" | "base64" => Ok(UploadMode::Inline),
            "disk" | "file" => Ok(UploadMode::Disk),
            other => Err(format!("unknown upload mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub upload_mode: UploadMode,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub session_ttl_days: i64,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
    pub seed_on_startup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "sqlite://app.db".to_string(),
            db_max_connections: 5,
            upload_mode: UploadMode::Inline,
            upload_dir: PathBuf::from("public/uploads"),
            max_upload_bytes: 2 * 1024 * 1024,
            session_ttl_days: 30,
            cookie_secure: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin_name: "Admin".to_string(),
            admin_email: "admin@admin.com".to_string(),
            admin_password: "admin".to_string(),
            seed_on_startup: false,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Self {
            port: parse_or(&lookup, "PORT", defaults.port),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections),
            upload_mode: parse_or(&lookup, "UPLOAD_MODE", defaults.upload_mode),
            upload_dir: lookup("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            session_ttl_days: parse_or(&lookup, "SESSION_TTL_DAYS", defaults.session_ttl_days),
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", defaults.cookie_secure),
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", defaults.bcrypt_cost),
            admin_name: lookup("ADMIN_NAME").unwrap_or(defaults.admin_name),
            admin_email: lookup("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: lookup("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            seed_on_startup: parse_or(&lookup, "SEED_ON_STARTUP", defaults.seed_on_startup),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "invalid configuration value, using default");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.database_url, "sqlite://app.db");
        assert_eq!(cfg.upload_mode, UploadMode::Inline);
        assert_eq!(cfg.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(cfg.session_ttl_days, 30);
        assert!(!cfg.seed_on_startup);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config_from(&[
            ("PORT", "9000"),
            ("UPLOAD_MODE", "disk"),
            ("UPLOAD_DIR", "/tmp/uploads"),
            ("COOKIE_SECURE", "true"),
            ("ADMIN_EMAIL", "root@example.com"),
        ]);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.upload_mode, UploadMode::Disk);
        assert_eq!(cfg.upload_dir, PathBuf::from("/tmp/uploads"));
        assert!(cfg.cookie_secure);
        assert_eq!(cfg.admin_email, "root@example.com");
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = config_from(&[("PORT", "not-a-port"), ("UPLOAD_MODE", "s3")]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.upload_mode, UploadMode::Inline);
    }
}
