//! HTTP handlers and route configuration.

mod dashboard;
mod form;
mod health;
mod posts;
mod presenter;

#[cfg(test)]
mod tests;

use actix_web::web;

use crate::middleware::error::AppError;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/v1")
                    // Public routes
                    .service(
                        web::scope("/posts")
                            .route("", web::get().to(posts::index))
                            .route("/featureds", web::get().to(posts::featured))
                            .route("/latest", web::get().to(posts::latest))
                            .route("/search", web::get().to(posts::search))
                            .route("/{slug}", web::get().to(posts::show)),
                    )
                    // Dashboard routes
                    .service(
                        web::scope("/dashboard")
                            .route("/tags", web::get().to(dashboard::tags))
                            .service(
                                web::scope("/posts")
                                    .route("", web::get().to(dashboard::index))
                                    .route("", web::post().to(dashboard::store))
                                    .route("/{post}", web::get().to(dashboard::show))
                                    .route("/{post}", web::put().to(dashboard::update))
                                    .route("/{post}", web::patch().to(dashboard::update))
                                    .route("/{post}", web::delete().to(dashboard::destroy))
                                    .route("/{post}/restore", web::post().to(dashboard::restore))
                                    .route("/{post}/force", web::delete().to(dashboard::force_delete)),
                            ),
                    ),
            ),
    );
}

/// Malformed query strings answer with the usual error body.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

/// Path ids that are not UUIDs cannot name a post.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req| AppError::NotFound("Post not found.".to_string()).into())
}
