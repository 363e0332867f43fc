use actix_web::web::{self, Json, ServiceConfig};
use quire_models::{Category, Model, PublicList};
use quire_web::{Database, Principal};

use crate::Result;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.route("/categories", web::get().to(list_categories));
}

/// List all categories.
///
/// ## Method
///
/// ```text
/// GET /categories
/// ```
fn list_categories(db: Database, _: Principal)
-> Result<Json<Vec<<Category as Model>::Public>>> {
    Ok(Json(Category::all(&db)?.get_public()))
}
