use actix_web::http::header::ACCEPT_LANGUAGE;
use actix_web::{web, HttpRequest};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Locale {
    En,
    Ar,
}

impl Locale {
    /// Matches on the primary subtag, so `ar-LY` and `en-GB` resolve too.
    fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split('-').next()?;
        if primary.eq_ignore_ascii_case("ar") {
            Some(Locale::Ar)
        } else if primary.eq_ignore_ascii_case("en") {
            Some(Locale::En)
        } else {
            None
        }
    }
}

#[derive(Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

/// Supported language with the highest `q` weight. Ties keep header order.
fn preferred_from_header(header: &str) -> Option<Locale> {
    let mut best: Option<(Locale, f32)> = None;
    for part in header.split(',') {
        let mut pieces = part.split(';');
        let locale = match pieces.next().and_then(Locale::from_tag) {
            Some(l) => l,
            None => continue,
        };
        let weight = pieces
            .find_map(|p| p.trim().strip_prefix("q="))
            .and_then(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        if weight <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, w)| weight > w) {
            best = Some((locale, weight));
        }
    }
    best.map(|(locale, _)| locale)
}

/// `?lang=` first, then `Accept-Language`, then English.
pub fn detect_locale(req: &HttpRequest) -> Locale {
    let from_query = web::Query::<LangQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().lang)
        .and_then(|lang| Locale::from_tag(&lang));
    if let Some(locale) = from_query {
        return locale;
    }

    req.headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(preferred_from_header)
        .unwrap_or(Locale::En)
}

#[derive(Clone, Copy, Debug)]
pub enum Text {
    UploadSucceeded,
    NoFileSelected,
    OnlyImagesAllowed,
    FileTooLarge,
    EmptyFile,
    MessageSent,
}

pub fn text(locale: Locale, key: Text) -> &'static str {
    match (locale, key) {
        (Locale::Ar, Text::UploadSucceeded) => "تم رفع الصورة بنجاح",
        (Locale::Ar, Text::NoFileSelected) => "لم يتم اختيار ملف",
        (Locale::Ar, Text::OnlyImagesAllowed) => "يُسمح فقط برفع ملفات الصور",
        (Locale::Ar, Text::FileTooLarge) => "حجم الملف أكبر من الحد المسموح",
        (Locale::Ar, Text::EmptyFile) => "الملف فارغ",
        (Locale::Ar, Text::MessageSent) => "تم إرسال الرسالة بنجاح",
        (Locale::En, Text::UploadSucceeded) => "Image uploaded successfully",
        (Locale::En, Text::NoFileSelected) => "No file selected",
        (Locale::En, Text::OnlyImagesAllowed) => "Only image files are allowed",
        (Locale::En, Text::FileTooLarge) => "File exceeds the maximum allowed size",
        (Locale::En, Text::EmptyFile) => "Uploaded file is empty",
        (Locale::En, Text::MessageSent) => "Message sent successfully",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn query_parameter_wins_over_header() {
        let req = TestRequest::default()
            .uri("/api/upload?lang=en")
            .insert_header(("Accept-Language", "ar-LY,ar;q=0.9"))
            .to_http_request();
        assert_eq!(detect_locale(&req), Locale::En);
    }

    #[test]
    fn arabic_header_is_detected() {
        let req = TestRequest::default()
            .insert_header(("Accept-Language", "ar-LY,ar;q=0.9"))
            .to_http_request();
        assert_eq!(detect_locale(&req), Locale::Ar);
        assert_eq!(text(Locale::Ar, Text::NoFileSelected), "لم يتم اختيار ملف");
    }

    #[test]
    fn defaults_to_english() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(detect_locale(&req), Locale::En);
    }

    #[test]
    fn header_weights_pick_the_language() {
        assert_eq!(preferred_from_header("en-US;q=0.5, ar;q=0.9"), Some(Locale::Ar));
        assert_eq!(preferred_from_header("fr-FR, ar;q=0.1"), Some(Locale::Ar));
        assert_eq!(preferred_from_header("ar;q=0, en;q=0.2"), Some(Locale::En));
        assert_eq!(preferred_from_header("de, fr"), None);
        assert_eq!(preferred_from_header("ar, en"), Some(Locale::Ar));
    }

    #[test]
    fn unsupported_query_value_falls_back_to_header() {
        let req = TestRequest::default()
            .uri("/api/messages?lang=fr&page=2")
            .insert_header(("Accept-Language", "ar"))
            .to_http_request();
        assert_eq!(detect_locale(&req), Locale::Ar);
    }
}
