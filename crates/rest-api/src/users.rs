use actix_web::{
    HttpResponse,
    http::StatusCode,
    web::{self, Data, Json, Path, ServiceConfig},
};
use chrono::Utc;
use quire_models::{
    ChapterConfig,
    Chapter,
    Model,
    PublicList,
    Purchase,
    User,
    chapter::PublicParams as ChapterParams,
    user::PublicParams,
};
use quire_web::{Database, Principal};

use crate::Result;

/// Configure routes.
pub fn configure(app: &mut ServiceConfig) {
    app
        .service(web::scope("/users")
            .route("/me", web::get().to(get_me))
            .route("/me/purchases", web::get().to(list_purchases))
            .route("/me/drafts", web::get().to(list_drafts))
            .route("/{penname}", web::get().to(get_user))
            .route("/{penname}/followers", web::get().to(list_followers))
            .route("/{penname}/following", web::get().to(list_following))
            .service(web::resource("/{penname}/follow")
                .route(web::put().to(follow))
                .route(web::delete().to(unfollow))
            )
        )
    ;
}

/// Get current user's information, including their balance.
///
/// ## Method
///
/// ```text
/// GET /users/me
/// ```
fn get_me(db: Database, principal: Principal)
-> Result<Json<<User as Model>::Public>> {
    Ok(Json(principal.get_public_full(&db, &PublicParams {
        include_balance: true,
    })?))
}

/// Get list of chapters current user bought, newest first.
///
/// ## Method
///
/// ```text
/// GET /users/me/purchases
/// ```
fn list_purchases(db: Database, principal: Principal)
-> Result<Json<Vec<<Purchase as Model>::Public>>> {
    Ok(Json(Purchase::by_user(&db, principal.id())?.get_public()))
}

/// Get list of chapters current user is working on.
///
/// ## Method
///
/// ```text
/// GET /users/me/drafts
/// ```
fn list_drafts(db: Database, config: Data<ChapterConfig>, principal: Principal)
-> Result<Json<Vec<<Chapter as Model>::Public>>> {
    let chapters = Chapter::recent_drafts(
        &db, principal.id(), config.draft_grace(), Utc::now().naive_utc())?;

    Ok(Json(chapters.get_public_full(&db, &ChapterParams {
        viewer: principal.id(),
    })?))
}

/// Get user information.
///
/// ## Method
///
/// ```text
/// GET /users/:penname
/// ```
fn get_user(db: Database, _: Principal, penname: Path<String>)
-> Result<Json<<User as Model>::Public>> {
    Ok(Json(User::by_penname(&db, &penname)?.get_public()))
}

/// Get list of users following a user.
///
/// ## Method
///
/// ```text
/// GET /users/:penname/followers
/// ```
fn list_followers(db: Database, _: Principal, penname: Path<String>)
-> Result<Json<Vec<<User as Model>::Public>>> {
    let user = User::by_penname(&db, &penname)?;
    Ok(Json(user.followers(&db)?.get_public()))
}

/// Get list of users a user follows.
///
/// ## Method
///
/// ```text
/// GET /users/:penname/following
/// ```
fn list_following(db: Database, _: Principal, penname: Path<String>)
-> Result<Json<Vec<<User as Model>::Public>>> {
    let user = User::by_penname(&db, &penname)?;
    Ok(Json(user.following(&db)?.get_public()))
}

/// Start following a user.
///
/// ## Method
///
/// ```text
/// PUT /users/:penname/follow
/// ```
fn follow(db: Database, principal: Principal, penname: Path<String>)
-> Result<HttpResponse> {
    let user = User::by_penname(&db, &penname)?;
    principal.follow(&db, &user)?;
    Ok(HttpResponse::new(StatusCode::NO_CONTENT))
}

/// Stop following a user.
///
/// ## Method
///
/// ```text
/// DELETE /users/:penname/follow
/// ```
fn unfollow(db: Database, principal: Principal, penname: Path<String>)
-> Result<HttpResponse> {
    let user = User::by_penname(&db, &penname)?;
    principal.unfollow(&db, &user)?;
    Ok(HttpResponse::new(StatusCode::NO_CONTENT))
}
