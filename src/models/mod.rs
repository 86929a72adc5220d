pub mod user;
pub mod company;
pub mod branch;
pub mod news;
pub mod image;
pub mod advertisement;
pub mod message;

pub use user::{LoginRequest, PublicUser, Role, User, UserCreateRequest, UserUpdateRequest};
pub use company::{Company, CompanyRequest, CompanyWithBranches};
pub use branch::{Branch, BranchRequest, BranchWithCompany};
pub use news::{News, NewsRequest, NewsWithImages};
pub use image::{Image, ImageRequest, ImageWithNews};
pub use advertisement::{Advertisement, AdvertisementRequest};
pub use message::{ContactMessage, MessageRequest};

use chrono::{DateTime, NaiveDate, Utc};

pub fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC) and
/// normalizes them to RFC 3339.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339())
}

/// Treats `Some("")` and whitespace-only strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_plain_dates() {
        assert_eq!(
            parse_date("2024-03-01T10:00:00+02:00").as_deref(),
            Some("2024-03-01T08:00:00+00:00")
        );
        assert_eq!(parse_date("2024-03-01").as_deref(), Some("2024-03-01T00:00:00+00:00"));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn blank_strings_are_dropped() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some("x".into())).as_deref(), Some("x"));
        assert_eq!(non_blank(None), None);
    }
}
