//! Tests of the HTTP interface.

use actix_web::{
    App,
    http::{Method, StatusCode, header::{CONTENT_TYPE, LOCATION}},
    test::{self, TestRequest},
};
use failure::{Fallible, err_msg};
use quire_models::{
    ChapterConfig,
    Model,
    User,
    db::{self, Pool},
};
use serde_json::{Value, json};
use tempfile::TempDir;

/// A server with its own database.
struct Server {
    pool: Pool,
    _dir: TempDir,
}

/// A response, with its body parsed as JSON.
struct Response {
    status: StatusCode,
    location: Option<String>,
    body: Value,
}

impl Response {
    fn error(&self) -> Option<&str> {
        self.body["error"].as_str()
    }
}

impl Server {
    fn new() -> Fallible<Server> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("quire.sqlite3");
        let url = path.to_str().ok_or_else(|| err_msg("non UTF-8 path"))?;
        let pool = db::build_pool(url)?;

        Ok(Server { pool, _dir: dir })
    }

    fn user(&self, penname: &str, coin: i64) -> Fallible<User> {
        let db = self.pool.get()?;
        let mut user = User::create(&db, penname, penname)?;

        if coin > 0 {
            user.grant_coins(&db, coin)?;
        }

        Ok(user)
    }

    fn befriend(&self, a: &User, b: &User) -> Fallible<()> {
        let db = self.pool.get()?;
        a.follow(&db, b)?;
        b.follow(&db, a)?;
        Ok(())
    }

    fn send(&self, as_user: Option<&User>, method: Method, uri: &str, body: Option<Value>)
    -> Fallible<Response> {
        let mut app = test::init_service(App::new()
            .data(self.pool.clone())
            .data(ChapterConfig::default())
            .configure(quire_rest_api::configure));

        let mut req = TestRequest::default().method(method).uri(uri);

        if let Some(user) = as_user {
            req = req.header("X-Principal-Id", user.id().to_string());
        }

        if let Some(body) = body {
            req = req
                .header(CONTENT_TYPE, "application/json")
                .set_payload(body.to_string());
        }

        let rsp = test::call_service(&mut app, req.to_request());
        let status = rsp.status();
        let location = rsp.headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = test::read_body(rsp);

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok(Response { status, location, body })
    }

    fn get(&self, user: &User, uri: &str) -> Fallible<Response> {
        self.send(Some(user), Method::GET, uri, None)
    }

    fn post(&self, user: &User, uri: &str, body: Value) -> Fallible<Response> {
        self.send(Some(user), Method::POST, uri, Some(body))
    }

    fn put(&self, user: &User, uri: &str, body: Value) -> Fallible<Response> {
        self.send(Some(user), Method::PUT, uri, Some(body))
    }

    /// Create a book owned by `owner` and start drafting it.
    fn drafting_book(&self, owner: &User) -> Fallible<i64> {
        let rsp = self.post(owner, "/api/v1/books", json!({ "title": "Book" }))?;
        assert_eq!(rsp.status, StatusCode::CREATED);
        let id = rsp.body["id"].as_i64().ok_or_else(|| err_msg("no id"))?;

        let rsp = self.put(owner, &format!("/api/v1/books/{}/status", id),
            json!({ "status": "draft" }))?;
        assert_eq!(rsp.status, StatusCode::OK);

        Ok(id)
    }
}

#[test]
fn requests_must_identify_user() -> Fallible<()> {
    let server = Server::new()?;
    let alice = server.user("alice", 10)?;

    let rsp = server.send(None, Method::GET, "/api/v1/users/me", None)?;
    assert_eq!(rsp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(rsp.error(), Some("user:session:required"));

    let rsp = server.get(&alice, "/api/v1/users/me")?;
    assert_eq!(rsp.status, StatusCode::OK);
    assert_eq!(rsp.body["penname"], "alice");
    assert_eq!(rsp.body["coin"], 10);

    // Balance is private.
    let bob = server.user("bob", 0)?;
    let rsp = server.get(&bob, "/api/v1/users/alice")?;
    assert_eq!(rsp.status, StatusCode::OK);
    assert!(rsp.body.get("coin").is_none());

    Ok(())
}

#[test]
fn follow_over_http() -> Fallible<()> {
    let server = Server::new()?;
    let alice = server.user("alice", 0)?;
    let _bob = server.user("bob", 0)?;

    let rsp = server.send(
        Some(&alice), Method::PUT, "/api/v1/users/bob/follow", None)?;
    assert_eq!(rsp.status, StatusCode::NO_CONTENT);

    let rsp = server.get(&alice, "/api/v1/users/bob/followers")?;
    assert_eq!(rsp.body, json!([{ "id": alice.id(), "penname": "alice", "name": "alice" }]));

    let rsp = server.send(
        Some(&alice), Method::PUT, "/api/v1/users/alice/follow", None)?;
    assert_eq!(rsp.status, StatusCode::BAD_REQUEST);
    assert_eq!(rsp.error(), Some("user:follow:self"));

    let rsp = server.get(&alice, "/api/v1/users/nobody")?;
    assert_eq!(rsp.status, StatusCode::NOT_FOUND);
    assert_eq!(rsp.error(), Some("user:not-found"));

    Ok(())
}

#[test]
fn collaboration_workflow() -> Fallible<()> {
    let server = Server::new()?;
    let alice = server.user("alice", 0)?;
    let bob = server.user("bob", 0)?;
    server.befriend(&alice, &bob)?;

    let rsp = server.post(&alice, "/api/v1/books", json!({
        "title": "Together",
        "invitees": ["bob"],
    }))?;
    assert_eq!(rsp.status, StatusCode::CREATED);
    assert_eq!(rsp.body["status"], "initial");
    let id = rsp.body["id"].as_i64().ok_or_else(|| err_msg("no id"))?;
    assert!(rsp.location.map_or(false, |l| l.ends_with(&format!("/api/v1/books/{}", id))));

    let status = format!("/api/v1/books/{}/status", id);

    let rsp = server.put(&alice, &status, json!({ "status": "draft" }))?;
    assert_eq!(rsp.status, StatusCode::CONFLICT);
    assert_eq!(rsp.error(), Some("book:status:pending-invites"));

    // Only the owner can move a book.
    let rsp = server.put(&bob, &status, json!({ "status": "draft", "force": true }))?;
    assert_eq!(rsp.status, StatusCode::FORBIDDEN);
    assert_eq!(rsp.error(), Some("book:role:missing"));

    let rsp = server.put(&bob, &format!("/api/v1/books/{}/members/me", id),
        json!({ "accept": true }))?;
    assert_eq!(rsp.status, StatusCode::OK);
    assert_eq!(rsp.body["status"], "collaborator");

    let rsp = server.put(&alice, &status, json!({ "status": "draft" }))?;
    assert_eq!(rsp.status, StatusCode::OK);
    assert_eq!(rsp.body["status"], "draft");

    let rsp = server.put(&alice, &status, json!({ "status": "initial" }))?;
    assert_eq!(rsp.status, StatusCode::BAD_REQUEST);
    assert_eq!(rsp.error(), Some("book:status:illegal-transition"));

    let rsp = server.get(&alice, &format!("/api/v1/books/{}/members", id))?;
    assert_eq!(rsp.body.as_array().map(Vec::len), Some(2));

    let rsp = server.send(Some(&alice), Method::DELETE,
        &format!("/api/v1/books/{}/members/{}", id, alice.id()), None)?;
    assert_eq!(rsp.status, StatusCode::BAD_REQUEST);
    assert_eq!(rsp.error(), Some("book:member:owner"));

    Ok(())
}

#[test]
fn invite_requires_mutual_follow() -> Fallible<()> {
    let server = Server::new()?;
    let alice = server.user("alice", 0)?;
    let bob = server.user("bob", 0)?;

    let rsp = server.post(&alice, "/api/v1/books", json!({ "title": "Solo" }))?;
    let id = rsp.body["id"].as_i64().ok_or_else(|| err_msg("no id"))?;
    let members = format!("/api/v1/books/{}/members", id);

    let rsp = server.post(&alice, &members, json!({ "penname": "bob" }))?;
    assert_eq!(rsp.status, StatusCode::BAD_REQUEST);
    assert_eq!(rsp.error(), Some("book:invite:not-mutual"));

    // Being followed by the invitee is not enough either.
    let rsp = server.send(Some(&bob), Method::PUT, "/api/v1/users/alice/follow", None)?;
    assert_eq!(rsp.status, StatusCode::NO_CONTENT);

    let rsp = server.post(&alice, &members, json!({ "penname": "bob" }))?;
    assert_eq!(rsp.status, StatusCode::BAD_REQUEST);
    assert_eq!(rsp.error(), Some("book:invite:not-mutual"));

    Ok(())
}

#[test]
fn drafted_books_take_no_invitations() -> Fallible<()> {
    let server = Server::new()?;
    let alice = server.user("alice", 0)?;
    let bob = server.user("bob", 0)?;
    server.befriend(&alice, &bob)?;
    let id = server.drafting_book(&alice)?;

    let rsp = server.post(&alice, &format!("/api/v1/books/{}/members", id),
        json!({ "penname": "bob" }))?;
    assert_eq!(rsp.status, StatusCode::BAD_REQUEST);
    assert_eq!(rsp.error(), Some("book:invite:closed"));

    Ok(())
}

#[test]
fn buy_chapter_over_http() -> Fallible<()> {
    let server = Server::new()?;
    let author = server.user("author", 0)?;
    let buyer = server.user("buyer", 50)?;
    let book = server.drafting_book(&author)?;

    let rsp = server.post(&author, "/api/v1/chapters", json!({
        "title": "The Heist",
        "content": "Secret plans",
        "book": book,
        "published_at": "now",
        "price": 100,
    }))?;
    assert_eq!(rsp.status, StatusCode::CREATED);
    assert_eq!(rsp.body["state"], "live");
    assert_eq!(rsp.body["content"], "Secret plans");
    let id = rsp.body["id"].as_i64().ok_or_else(|| err_msg("no id"))?;

    let chapter = format!("/api/v1/chapters/{}", id);
    let purchase = format!("/api/v1/chapters/{}/purchase", id);

    let rsp = server.get(&buyer, &chapter)?;
    assert_eq!(rsp.body["locked"], true);
    assert!(rsp.body["content"].is_null());

    let rsp = server.post(&buyer, &purchase, json!({}))?;
    assert_eq!(rsp.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(rsp.error(), Some("user:coin:insufficient"));

    {
        let db = server.pool.get()?;
        let mut buyer = User::by_id(&db, buyer.id())?;
        buyer.grant_coins(&db, 100)?;
    }

    let rsp = server.post(&buyer, &purchase, json!({}))?;
    assert_eq!(rsp.status, StatusCode::OK);
    assert_eq!(rsp.body["buyer_balance"], 50);
    assert_eq!(rsp.body["author_balance"], 100);
    assert_eq!(rsp.body["purchase"]["price"], 100);

    let rsp = server.post(&buyer, &purchase, json!({}))?;
    assert_eq!(rsp.status, StatusCode::CONFLICT);
    assert_eq!(rsp.error(), Some("chapter:buy:already-bought"));

    let rsp = server.get(&buyer, &chapter)?;
    assert_eq!(rsp.body["locked"], false);
    assert_eq!(rsp.body["content"], "Secret plans");

    let rsp = server.get(&buyer, "/api/v1/users/me/purchases")?;
    assert_eq!(rsp.body.as_array().map(Vec::len), Some(1));

    // Published chapters are immutable.
    let rsp = server.put(&author, &chapter, json!({
        "title": "The Heist",
        "content": "Changed plans",
    }))?;
    assert_eq!(rsp.status, StatusCode::BAD_REQUEST);
    assert_eq!(rsp.error(), Some("chapter:live"));

    Ok(())
}

#[test]
fn drafts_are_private() -> Fallible<()> {
    let server = Server::new()?;
    let author = server.user("author", 0)?;
    let reader = server.user("reader", 0)?;
    let book = server.drafting_book(&author)?;

    let rsp = server.post(&author, "/api/v1/chapters", json!({
        "title": "Work in progress",
        "content": "...",
        "book": book,
    }))?;
    assert_eq!(rsp.status, StatusCode::CREATED);
    assert_eq!(rsp.body["state"], "draft");
    let id = rsp.body["id"].as_i64().ok_or_else(|| err_msg("no id"))?;

    let rsp = server.get(&reader, &format!("/api/v1/chapters/{}", id))?;
    assert_eq!(rsp.status, StatusCode::NOT_FOUND);
    assert_eq!(rsp.error(), Some("chapter:not-found"));

    let rsp = server.get(&reader, &format!("/api/v1/books/{}/chapters", book))?;
    assert_eq!(rsp.body, json!([]));

    let rsp = server.get(&author, "/api/v1/users/me/drafts")?;
    assert_eq!(rsp.body.as_array().map(Vec::len), Some(1));

    let rsp = server.put(&author, &format!("/api/v1/chapters/{}/schedule", id),
        json!({ "published_at": "2000-01-01T00:00:00Z" }))?;
    assert_eq!(rsp.status, StatusCode::BAD_REQUEST);
    assert_eq!(rsp.error(), Some("chapter:schedule:past"));

    let rsp = server.send(Some(&author), Method::DELETE,
        &format!("/api/v1/chapters/{}", id), None)?;
    assert_eq!(rsp.status, StatusCode::NO_CONTENT);

    Ok(())
}

#[test]
fn missing_book() -> Fallible<()> {
    let server = Server::new()?;
    let alice = server.user("alice", 0)?;

    let rsp = server.get(&alice, "/api/v1/books/42")?;
    assert_eq!(rsp.status, StatusCode::NOT_FOUND);
    assert_eq!(rsp.error(), Some("book:not-found"));

    Ok(())
}
