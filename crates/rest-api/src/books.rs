use actix_web::{
    HttpRequest,
    HttpResponse,
    http::StatusCode,
    web::{self, Json, Path, Query, ServiceConfig},
};
use chrono::Utc;
use quire_models::{
    Book,
    BookDetails,
    BookMember,
    BookStatus,
    Chapter,
    Model,
    NewBook,
    PublicList,
    chapter::PublicParams as ChapterParams,
};
use quire_web::{Created, Database, Principal};
use serde::Deserialize;

use crate::Result;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg
        .service(web::resource("/books")
            .route(web::get().to(list_books))
            .route(web::post().to(create_book))
        )
        .service(web::resource("/books/{id}")
            .route(web::get().to(get_book))
            .route(web::put().to(update_book))
            .route(web::delete().to(delete_book))
        )
        .route("/books/{id}/status", web::put().to(move_book))
        .service(web::resource("/books/{id}/members")
            .route(web::get().to(list_members))
            .route(web::post().to(invite_member))
        )
        .route("/books/{id}/members/me", web::put().to(respond_to_invite))
        .service(web::resource("/books/{id}/members/{user}")
            .name("book-member")
            .route(web::get().to(get_member))
            .route(web::delete().to(remove_member))
        )
        .route("/books/{id}/chapters", web::get().to(list_chapters))
    ;
}

#[derive(Deserialize)]
struct BookQuery {
    status: Option<BookStatus>,
}

/// List all books, optionally only those in a given status.
///
/// ## Method
///
/// ```text
/// GET /books
/// GET /books?status=:status
/// ```
fn list_books(db: Database, _: Principal, query: Query<BookQuery>)
-> Result<Json<Vec<<Book as Model>::Public>>> {
    let books = match query.status {
        Some(status) => Book::by_status(&db, status)?,
        None => Book::all(&db)?,
    };

    Ok(Json(books.get_public()))
}

/// Create a new book.
///
/// The current user becomes its owner, and all users listed in `invitees`
/// are invited to collaborate.
///
/// ## Method
///
/// ```text
/// POST /books
/// ```
fn create_book(
    req: HttpRequest,
    db: Database,
    principal: Principal,
    data: Json<NewBook>,
) -> Result<Created<Json<<Book as Model>::Public>>> {
    let book = Book::create(&db, &*db, &principal, &data)?;
    let location = format!(
        "{}/api/v1/books/{}", req.app_config().host(), book.id());

    Ok(Created(location, Json(book.get_public_full(&db, &())?)))
}

/// Get a book by ID.
///
/// ## Method
///
/// ```text
/// GET /books/:id
/// ```
fn get_book(db: Database, _: Principal, id: Path<i32>)
-> Result<Json<<Book as Model>::Public>> {
    let book = Book::by_id(&db, *id)?;
    Ok(Json(book.get_public_full(&db, &())?))
}

/// Update book's details.
///
/// ## Method
///
/// ```text
/// PUT /books/:id
/// ```
fn update_book(
    db: Database,
    principal: Principal,
    id: Path<i32>,
    details: Json<BookDetails>,
) -> Result<Json<<Book as Model>::Public>> {
    let mut book = Book::by_id(&db, *id)?;
    let access = book.access(&*db, &principal)?;

    book.set_details(&db, &access, &details)?;

    Ok(Json(book.get_public_full(&db, &())?))
}

/// Delete a book.
///
/// ## Method
///
/// ```text
/// DELETE /books/:id
/// ```
fn delete_book(db: Database, principal: Principal, id: Path<i32>)
-> Result<HttpResponse> {
    let book = Book::by_id(&db, *id)?;
    let access = book.access(&*db, &principal)?;

    book.delete(&db, &access)?;

    Ok(HttpResponse::new(StatusCode::NO_CONTENT))
}

#[derive(Deserialize)]
struct StatusChange {
    status: BookStatus,
    /// Purge pending invitations instead of refusing to leave the initial
    /// status.
    #[serde(default)]
    force: bool,
}

/// Move a book to another status.
///
/// ## Method
///
/// ```text
/// PUT /books/:id/status
/// ```
fn move_book(
    db: Database,
    principal: Principal,
    id: Path<i32>,
    change: Json<StatusChange>,
) -> Result<Json<<Book as Model>::Public>> {
    let mut book = Book::by_id(&db, *id)?;
    let access = book.access(&*db, &principal)?;

    book.move_state(&db, &access, change.status, change.force)?;

    Ok(Json(book.get_public()))
}

/// List members of a book.
///
/// ## Method
///
/// ```text
/// GET /books/:id/members
/// ```
fn list_members(db: Database, _: Principal, id: Path<i32>)
-> Result<Json<Vec<<BookMember as Model>::Public>>> {
    let book = Book::by_id(&db, *id)?;
    Ok(Json(book.members(&db)?.get_public()))
}

#[derive(Deserialize)]
struct Invitation {
    penname: String,
}

/// Invite a user to collaborate on a book.
///
/// ## Method
///
/// ```text
/// POST /books/:id/members
/// ```
fn invite_member(
    req: HttpRequest,
    db: Database,
    principal: Principal,
    id: Path<i32>,
    invitation: Json<Invitation>,
) -> Result<Created<Json<<BookMember as Model>::Public>>> {
    let book = Book::by_id(&db, *id)?;
    let access = book.access(&*db, &principal)?;
    let member = book.invite(&db, &*db, &access, &invitation.penname)?;

    let (book_id, user_id) = member.id();
    let location = req.url_for(
        "book-member", &[book_id.to_string(), user_id.to_string()])?;

    Ok(Created(location.to_string(), Json(member.get_public())))
}

#[derive(Deserialize)]
struct InviteResponse {
    accept: bool,
}

/// Accept or decline an invitation to a book.
///
/// ## Method
///
/// ```text
/// PUT /books/:id/members/me
/// ```
fn respond_to_invite(
    db: Database,
    principal: Principal,
    id: Path<i32>,
    response: Json<InviteResponse>,
) -> Result<Json<<BookMember as Model>::Public>> {
    let book = Book::by_id(&db, *id)?;
    let access = book.access(&*db, &principal)?;
    let member = BookMember::respond(&db, &access, response.accept)?;

    Ok(Json(member.get_public()))
}

/// Get a single member of a book.
///
/// ## Method
///
/// ```text
/// GET /books/:id/members/:user
/// ```
fn get_member(db: Database, _: Principal, path: Path<(i32, i32)>)
-> Result<Json<<BookMember as Model>::Public>> {
    let (book, user) = path.into_inner();
    let book = Book::by_id(&db, book)?;

    Ok(Json(book.member(&db, user)?.get_public()))
}

/// Remove a user from a book.
///
/// Owner can remove anyone but themselves, other members can only leave.
///
/// ## Method
///
/// ```text
/// DELETE /books/:id/members/:user
/// ```
fn remove_member(db: Database, principal: Principal, path: Path<(i32, i32)>)
-> Result<HttpResponse> {
    let (book, user) = path.into_inner();
    let book = Book::by_id(&db, book)?;
    let access = book.access(&*db, &principal)?;

    BookMember::remove(&db, &access, user)?;

    Ok(HttpResponse::new(StatusCode::NO_CONTENT))
}

/// List chapters of a book visible to the current user.
///
/// ## Method
///
/// ```text
/// GET /books/:id/chapters
/// ```
fn list_chapters(db: Database, principal: Principal, id: Path<i32>)
-> Result<Json<Vec<<Chapter as Model>::Public>>> {
    let book = Book::by_id(&db, *id)?;
    let chapters = Chapter::by_book(
        &db, book.id(), principal.id(), Utc::now().naive_utc())?;

    Ok(Json(chapters.get_public_full(&db, &ChapterParams {
        viewer: principal.id(),
    })?))
}
