//! # citadel-api
//!
//! The web routing and validation layer for Citadel.

pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::web;
use error::invalid_request;

/// Configures the routes for the board.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| invalid_request(err)))
        .app_data(web::PathConfig::default().error_handler(|err, _| invalid_request(err)))
        .app_data(web::QueryConfig::default().error_handler(|err, _| invalid_request(err)))
        .service(
            web::scope("")
                .route("/ping", web::get().to(handlers::ping))
                .route("/register", web::post().to(handlers::register))
                .route("/login", web::post().to(handlers::login))
                .route("/posts", web::get().to(handlers::list_posts))
                .route("/posts", web::post().to(handlers::create_post))
                .route("/posts/{id}", web::get().to(handlers::get_post))
                .route("/posts/{id}", web::put().to(handlers::update_post))
                .route("/posts/{id}", web::delete().to(handlers::delete_post))
                .route("/posts/{id}/vote", web::post().to(handlers::cast_vote))
                .route("/posts/{id}/comments", web::get().to(handlers::comment_forest))
                .route("/posts/{id}/comments", web::post().to(handlers::add_comment))
                .route("/comments/{id}", web::put().to(handlers::update_comment))
                .route("/comments/{id}", web::delete().to(handlers::delete_comment)),
        );
}
