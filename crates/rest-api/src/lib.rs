//! Quire's REST API.

use actix_web::web::{self, ServiceConfig};

mod books;
mod categories;
mod chapters;
mod config;
mod users;

pub use self::config::Config;

pub type Result<T, E=quire_error::Error> = std::result::Result<T, E>;

/// Configure [`App`] for an API server.
///
/// The application must carry a [`quire_models::db::Pool`] and
/// a [`quire_models::ChapterConfig`] as its data.
///
/// [`App`]: actix_web::App
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(books::configure)
            .configure(categories::configure)
            .configure(chapters::configure)
            .configure(users::configure)
    );
}
