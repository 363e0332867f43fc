use chrono::NaiveDateTime;

use super::{schema::*, types::{BookStatus, MemberStatus}};

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct User {
    pub id: i32,
    /// Unique public handle, used to find users (e.g. when inviting them to
    /// a book).
    pub penname: String,
    /// User's display name.
    pub name: String,
    /// User's balance of coins. Never negative.
    pub coin: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "users"]
pub struct NewUser<'a> {
    pub penname: &'a str,
    pub name: &'a str,
    pub created_at: NaiveDateTime,
}

/// A directed edge in the follow graph.
#[derive(Clone, Copy, Debug, Insertable, Queryable)]
#[table_name = "follows"]
pub struct Follow {
    pub follower: i32,
    pub followee: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    /// URL of the cover image. This is an opaque value, not interpreted in
    /// any way.
    pub cover: Option<String>,
    /// URL of the wallpaper image. This is an opaque value, not interpreted
    /// in any way.
    pub wallpaper: Option<String>,
    pub status: BookStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "books"]
pub struct NewBook<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub cover: Option<&'a str>,
    pub wallpaper: Option<&'a str>,
    pub status: BookStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Clone, Copy, Debug, Default)]
#[table_name = "books"]
pub struct BookChange<'a> {
    pub title: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
    pub cover: Option<Option<&'a str>>,
    pub wallpaper: Option<Option<&'a str>>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Clone, Copy, Debug, Identifiable, Insertable, Queryable)]
#[primary_key(book, user)]
#[table_name = "book_owners"]
pub struct BookOwner {
    pub book: i32,
    pub user: i32,
    pub status: MemberStatus,
}

#[derive(Clone, Debug, Identifiable, Queryable)]
#[table_name = "categories"]
pub struct Category {
    pub id: i32,
    pub name: String,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "categories"]
pub struct NewCategory<'a> {
    pub name: &'a str,
}

#[derive(Clone, Copy, Debug, Insertable, Queryable)]
#[table_name = "categories_on_books"]
pub struct CategoryOnBook {
    pub book: i32,
    pub category: i32,
}

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct Chapter {
    pub id: i32,
    /// Book this chapter is part of. Chapters without a book are standalone
    /// drafts.
    pub book: Option<i32>,
    /// User who wrote this chapter, and who is paid when it's bought.
    pub author: i32,
    pub title: String,
    pub content: String,
    /// Publication date. `None` for drafts, a future date for scheduled
    /// chapters.
    pub published_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Price in coins, `0` for free chapters.
    pub price: i64,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "chapters"]
pub struct NewChapter<'a> {
    pub book: Option<i32>,
    pub author: i32,
    pub title: &'a str,
    pub content: &'a str,
    pub published_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub price: i64,
}

#[derive(AsChangeset, Clone, Copy, Debug)]
#[table_name = "chapters"]
pub struct ChapterChange<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub published_at: Option<Option<NaiveDateTime>>,
    pub price: Option<i64>,
    pub updated_at: NaiveDateTime,
}

/// Receipt of a chapter purchase.
#[derive(Clone, Copy, Debug, Identifiable, Insertable, Queryable)]
#[primary_key(chapter, user)]
#[table_name = "chapter_market_history"]
pub struct Purchase {
    pub chapter: i32,
    pub user: i32,
    /// Price paid, in coins. Later changes to chapter's price don't affect
    /// it.
    pub price: i64,
    pub created_at: NaiveDateTime,
}
