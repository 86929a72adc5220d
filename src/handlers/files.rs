use std::path::PathBuf;

use actix_files::NamedFile;
use actix_web::http::header::{
    self, ContentDisposition, DispositionParam, DispositionType, HeaderValue,
};
use actix_web::{web, HttpRequest, HttpResponse};

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const UPLOADS_PREFIX: &str = "/uploads/";

/// Raster formats accepted for upload, with the extension they are stored under.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    IMAGE_TYPES
        .iter()
        .find(|(m, _)| m.eq_ignore_ascii_case(mime))
        .map(|(_, ext)| *ext)
}

fn is_image_extension(name: &str) -> bool {
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return false,
    };
    ext == "jpeg" || IMAGE_TYPES.iter().any(|(_, e)| *e == ext)
}

/// Only flat names produced by the upload handler are accepted.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Maps a `/uploads/<name>` URL to its location on disk.
pub fn stored_upload_path(config: &Config, url: &str) -> Option<PathBuf> {
    let name = url.strip_prefix(UPLOADS_PREFIX)?;
    if !is_safe_file_name(name) {
        return None;
    }
    Some(config.upload_dir.join(name))
}

/// Removes the file behind a `/uploads/...` URL. Inline data URLs and
/// foreign links are ignored. Failures are logged.
pub async fn remove_stored_upload(config: &Config, url: &str) {
    if let Some(file) = stored_upload_path(config, url) {
        if let Err(e) = tokio::fs::remove_file(&file).await {
            tracing::warn!(error = %e, path = %file.display(), "failed to remove uploaded file");
        }
    }
}

pub async fn serve_upload(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let name = path.into_inner();
    let file = stored_upload_path(&state.config, &format!("{}{}", UPLOADS_PREFIX, name))
        .ok_or_else(|| ApiError::not_found("File"))?;

    let mut named = match NamedFile::open_async(&file).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ApiError::not_found("File")),
        Err(e) => return Err(e.into()),
    };

    // Anything that is not one of the raster formats is never rendered inline.
    if !is_image_extension(&name) {
        named = named.set_content_disposition(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(name.clone())],
        });
    }

    let mut resp = named.into_response(&req);
    resp.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    resp.headers_mut()
        .insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use uuid::Uuid;

    use crate::config::UploadMode;
    use crate::test_support;

    #[test]
    fn rejects_traversal_and_hidden_names() {
        assert!(is_safe_file_name("3f2a-logo.png"));
        assert!(!is_safe_file_name("../etc/passwd"));
        assert!(!is_safe_file_name("a/b.png"));
        assert!(!is_safe_file_name(".env"));
        assert!(!is_safe_file_name(""));
    }

    #[test]
    fn maps_upload_urls_only() {
        let config = Config {
            upload_dir: PathBuf::from("/srv/uploads"),
            ..Config::default()
        };
        assert_eq!(
            stored_upload_path(&config, "/uploads/a.png"),
            Some(PathBuf::from("/srv/uploads/a.png"))
        );
        assert_eq!(stored_upload_path(&config, "data:image/png;base64,AAAA"), None);
        assert_eq!(stored_upload_path(&config, "/uploads/../secret"), None);
    }

    #[test]
    fn only_raster_types_have_extensions() {
        assert_eq!(extension_for_mime("image/png"), Some("png"));
        assert_eq!(extension_for_mime("IMAGE/JPEG"), Some("jpg"));
        assert_eq!(extension_for_mime("image/svg+xml"), None);
        assert_eq!(extension_for_mime("text/html"), None);
        assert!(is_image_extension("a.JPEG"));
        assert!(!is_image_extension("a.svg"));
        assert!(!is_image_extension("noext"));
    }

    async fn disk_state(dir: &PathBuf) -> web::Data<AppState> {
        std::fs::create_dir_all(dir).unwrap();
        let config = Config {
            upload_mode: UploadMode::Disk,
            upload_dir: dir.clone(),
            ..test_support::config()
        };
        test_support::state_with(config).await
    }

    #[actix_web::test]
    async fn serves_images_with_nosniff() {
        let dir = std::env::temp_dir().join(format!("car-directory-serve-{}", Uuid::new_v4()));
        let state = disk_state(&dir).await;
        std::fs::write(dir.join("a1-logo.png"), b"png-bytes").unwrap();
        let app = test_app!(state);

        let req = actix_web::test::TestRequest::get().uri("/uploads/a1-logo.png").to_request();
        let resp = actix_web::test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        let body = actix_web::test::read_body(resp).await;
        assert_eq!(&body[..], b"png-bytes");

        let req = actix_web::test::TestRequest::get().uri("/uploads/missing.png").to_request();
        assert_eq!(actix_web::test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[actix_web::test]
    async fn non_raster_files_are_attachments() {
        let dir = std::env::temp_dir().join(format!("car-directory-serve-{}", Uuid::new_v4()));
        let state = disk_state(&dir).await;
        std::fs::write(dir.join("b2-x.svg"), b"<svg><script>alert(1)</script></svg>").unwrap();
        let app = test_app!(state);

        let req = actix_web::test::TestRequest::get().uri("/uploads/b2-x.svg").to_request();
        let resp = actix_web::test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert!(disposition.starts_with("attachment"));
        assert_eq!(resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
