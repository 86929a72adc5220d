use actix_web::web;

use crate::error::ApiError;
use crate::handlers::{
    self, advertisements, auth, branches, companies, files, images, messages, news, upload, users,
};

/// Inline data-URL images travel inside JSON bodies, so the limit sits well
/// above the default 2 MiB upload cap.
const JSON_LIMIT: usize = 8 * 1024 * 1024;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| {
            tracing::debug!(error = %err, "rejected JSON body");
            ApiError::BadRequest("Invalid JSON".to_string()).into()
        })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(handlers::health_check))
        .service(
            web::resource("/uploads/{file}")
                .route(web::get().to(files::serve_upload))
                .route(web::head().to(files::serve_upload)),
        )
        .service(
            web::scope("/api")
                .service(
                    web::resource("/companies")
                        .route(web::get().to(companies::list_companies))
                        .route(web::post().to(companies::create_company)),
                )
                .service(
                    web::resource("/companies/{id}")
                        .route(web::get().to(companies::get_company))
                        .route(web::put().to(companies::update_company))
                        .route(web::delete().to(companies::delete_company)),
                )
                .service(
                    web::resource("/branches")
                        .route(web::get().to(branches::list_branches))
                        .route(web::post().to(branches::create_branch)),
                )
                .service(
                    web::resource("/branches/{id}")
                        .route(web::get().to(branches::get_branch))
                        .route(web::put().to(branches::update_branch))
                        .route(web::delete().to(branches::delete_branch)),
                )
                .service(
                    web::resource("/news")
                        .route(web::get().to(news::list_news))
                        .route(web::post().to(news::create_news)),
                )
                .service(
                    web::resource("/news/{id}")
                        .route(web::get().to(news::get_news))
                        .route(web::put().to(news::update_news))
                        .route(web::delete().to(news::delete_news)),
                )
                .service(
                    web::resource("/images")
                        .route(web::get().to(images::list_images))
                        .route(web::post().to(images::create_image)),
                )
                .service(
                    web::resource("/images/{id}")
                        .route(web::get().to(images::get_image))
                        .route(web::put().to(images::update_image))
                        .route(web::delete().to(images::delete_image)),
                )
                .service(
                    web::resource("/advertisements")
                        .route(web::get().to(advertisements::list_advertisements))
                        .route(web::post().to(advertisements::create_advertisement)),
                )
                .service(
                    web::resource("/advertisements/{id}")
                        .route(web::get().to(advertisements::get_advertisement))
                        .route(web::put().to(advertisements::update_advertisement))
                        .route(web::delete().to(advertisements::delete_advertisement)),
                )
                .service(
                    web::resource("/messages")
                        .route(web::get().to(messages::list_messages))
                        .route(web::post().to(messages::create_message)),
                )
                .service(
                    web::resource("/messages/{id}")
                        .route(web::get().to(messages::get_message))
                        .route(web::delete().to(messages::delete_message)),
                )
                .service(
                    web::resource("/users")
                        .route(web::get().to(users::list_users))
                        .route(web::post().to(users::create_user)),
                )
                .service(
                    web::resource("/users/{id}")
                        .route(web::get().to(users::get_user))
                        .route(web::put().to(users::update_user))
                        .route(web::delete().to(users::delete_user)),
                )
                .route("/auth/login", web::post().to(auth::login))
                .route("/auth/logout", web::post().to(auth::logout))
                .route("/auth/session", web::get().to(auth::current_session))
                .route("/register", web::post().to(auth::register))
                .route("/setup", web::post().to(auth::setup))
                .route("/upload", web::post().to(upload::upload_image)),
        );
}
