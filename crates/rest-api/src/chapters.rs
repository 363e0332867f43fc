use actix_web::{
    HttpRequest,
    HttpResponse,
    http::StatusCode,
    web::{self, Json, Path, ServiceConfig},
};
use chrono::Utc;
use quire_models::{
    Chapter,
    ChapterDraft,
    FindModelError,
    Model,
    Publication,
    Receipt,
    chapter::PublicParams,
};
use quire_web::{Created, Database, Principal};
use serde::Deserialize;

use crate::Result;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg
        .route("/chapters", web::post().to(create_chapter))
        .service(web::resource("/chapters/{id}")
            .name("chapter")
            .route(web::get().to(get_chapter))
            .route(web::put().to(update_chapter))
            .route(web::delete().to(delete_chapter))
        )
        .route("/chapters/{id}/schedule", web::put().to(reschedule_chapter))
        .route("/chapters/{id}/purchase", web::post().to(buy_chapter))
    ;
}

/// Find a chapter the current user can see.
///
/// Chapters which are not visible are reported as not existing.
fn visible_chapter(db: &Database, principal: &Principal, id: i32)
-> Result<Chapter> {
    let chapter = Chapter::by_id(db, id)?;

    if chapter.is_visible_to(&**db, principal.id(), Utc::now().naive_utc())? {
        Ok(chapter)
    } else {
        Err(FindModelError::<Chapter>::not_found().into())
    }
}

/// Create a new chapter.
///
/// ## Method
///
/// ```text
/// POST /chapters
/// ```
fn create_chapter(
    req: HttpRequest,
    db: Database,
    principal: Principal,
    draft: Json<ChapterDraft>,
) -> Result<Created<Json<<Chapter as Model>::Public>>> {
    let chapter = Chapter::create_or_update(
        &db, None, &principal, &draft, Utc::now().naive_utc())?;
    let location = req.url_for("chapter", &[chapter.id().to_string()])?;

    Ok(Created(location.to_string(), Json(chapter.get_public_full(
        &db, &PublicParams { viewer: principal.id() })?)))
}

/// Get a chapter.
///
/// Content of priced chapters is only included if the current user can read
/// it, that is when they wrote or bought it.
///
/// ## Method
///
/// ```text
/// GET /chapters/:id
/// ```
fn get_chapter(db: Database, principal: Principal, id: Path<i32>)
-> Result<Json<<Chapter as Model>::Public>> {
    let chapter = visible_chapter(&db, &principal, *id)?;

    Ok(Json(chapter.get_public_full(
        &db, &PublicParams { viewer: principal.id() })?))
}

/// Edit a chapter.
///
/// ## Method
///
/// ```text
/// PUT /chapters/:id
/// ```
fn update_chapter(
    db: Database,
    principal: Principal,
    id: Path<i32>,
    draft: Json<ChapterDraft>,
) -> Result<Json<<Chapter as Model>::Public>> {
    let chapter = Chapter::create_or_update(
        &db, Some(*id), &principal, &draft, Utc::now().naive_utc())?;

    Ok(Json(chapter.get_public_full(
        &db, &PublicParams { viewer: principal.id() })?))
}

/// Delete a chapter which was not yet published.
///
/// ## Method
///
/// ```text
/// DELETE /chapters/:id
/// ```
fn delete_chapter(db: Database, principal: Principal, id: Path<i32>)
-> Result<HttpResponse> {
    let chapter = visible_chapter(&db, &principal, *id)?;

    chapter.delete_draft(&db, &principal, Utc::now().naive_utc())?;

    Ok(HttpResponse::new(StatusCode::NO_CONTENT))
}

#[derive(Deserialize)]
struct Schedule {
    /// `"now"`, a date, or `null` to cancel publication.
    published_at: Option<Publication>,
}

/// Change when a chapter will be published.
///
/// ## Method
///
/// ```text
/// PUT /chapters/:id/schedule
/// ```
fn reschedule_chapter(
    db: Database,
    principal: Principal,
    id: Path<i32>,
    schedule: Json<Schedule>,
) -> Result<Json<<Chapter as Model>::Public>> {
    let mut chapter = visible_chapter(&db, &principal, *id)?;

    chapter.reschedule(
        &db, &principal, schedule.published_at, Utc::now().naive_utc())?;

    Ok(Json(chapter.get_public_full(
        &db, &PublicParams { viewer: principal.id() })?))
}

/// Buy a chapter.
///
/// ## Method
///
/// ```text
/// POST /chapters/:id/purchase
/// ```
fn buy_chapter(db: Database, principal: Principal, id: Path<i32>)
-> Result<Json<Receipt>> {
    let chapter = visible_chapter(&db, &principal, *id)?;
    let receipt = chapter.buy(&db, &principal, Utc::now().naive_utc())?;

    Ok(Json(receipt))
}
