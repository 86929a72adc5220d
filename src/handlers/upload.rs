use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use futures_util::TryStreamExt;
use serde_json::json;
use uuid::Uuid;

use crate::config::UploadMode;
use crate::error::{ApiError, ApiResult};
use crate::handlers::files::{extension_for_mime, UPLOADS_PREFIX};
use crate::i18n::{self, Locale, Text};
use crate::session::AdminUser;
use crate::state::AppState;

struct UploadedFile {
    filename: String,
    mime: String,
    extension: &'static str,
    bytes: Vec<u8>,
}

/// Client file name reduced to a safe stem: no directories, no extension,
/// only ASCII letters, digits, `-` and `_`.
fn file_stem(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => base,
    };
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Stored name: random prefix, client stem, extension from the checked MIME type.
fn stored_file_name(client_name: &str, extension: &str) -> String {
    format!("{}-{}.{}", Uuid::new_v4(), file_stem(client_name), extension)
}

async fn read_file_field(payload: &mut Multipart, max_bytes: usize, locale: Locale) -> ApiResult<UploadedFile> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != "file" {
            while field.try_next().await?.is_some() {}
            continue;
        }

        let mime = field
            .content_type()
            .map(|m| m.essence_str().to_ascii_lowercase())
            .unwrap_or_default();
        let extension = extension_for_mime(&mime)
            .ok_or_else(|| ApiError::BadRequest(i18n::text(locale, Text::OnlyImagesAllowed).to_string()))?;
        let filename = field
            .content_disposition()
            .get_filename()
            .unwrap_or("image")
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(ApiError::BadRequest(i18n::text(locale, Text::FileTooLarge).to_string()));
            }
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            return Err(ApiError::BadRequest(i18n::text(locale, Text::EmptyFile).to_string()));
        }

        return Ok(UploadedFile { filename, mime, extension, bytes });
    }

    Err(ApiError::BadRequest(i18n::text(locale, Text::NoFileSelected).to_string()))
}

pub async fn upload_image(
    req: HttpRequest,
    _admin: AdminUser,
    mut payload: Multipart,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let locale = i18n::detect_locale(&req);
    let config = &state.config;
    let file = read_file_field(&mut payload, config.max_upload_bytes, locale).await?;

    let url = match config.upload_mode {
        UploadMode::Inline => format!("data:{};base64,{}", file.mime, B64.encode(&file.bytes)),
        UploadMode::Disk => {
            let name = stored_file_name(&file.filename, file.extension);
            tokio::fs::create_dir_all(&config.upload_dir).await?;
            tokio::fs::write(config.upload_dir.join(&name), &file.bytes).await?;
            format!("{}{}", UPLOADS_PREFIX, name)
        }
    };

    tracing::info!(size = file.bytes.len(), mime = %file.mime, mode = ?config.upload_mode, "image uploaded");
    Ok(HttpResponse::Ok().json(json!({
        "url": url,
        "message": i18n::text(locale, Text::UploadSucceeded),
    })))
}
