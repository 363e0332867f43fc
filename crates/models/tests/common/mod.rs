#![allow(dead_code)]

use diesel::{Connection as _, connection::SimpleConnection, sqlite::SqliteConnection};
use failure::Fallible;
use quire_models::{
    Book,
    BookStatus,
    Model,
    NewBook,
    User,
    db::{self, Connection},
};

/// Open a fresh in-memory database with all migrations applied.
pub fn connection() -> Fallible<Connection> {
    let db = SqliteConnection::establish(":memory:")?;
    db.batch_execute("PRAGMA foreign_keys = ON;")?;
    db::run_migrations(&db)?;
    Ok(db)
}

pub fn user(db: &Connection, penname: &str) -> Fallible<User> {
    Ok(User::create(db, penname, &penname.to_uppercase())?)
}

/// Create a user with `coin` coins.
pub fn funded(db: &Connection, penname: &str, coin: i64) -> Fallible<User> {
    let mut user = user(db, penname)?;

    if coin > 0 {
        user.grant_coins(db, coin)?;
    }

    Ok(user)
}

/// Make `a` and `b` follow each other.
pub fn befriend(db: &Connection, a: &User, b: &User) -> Fallible<()> {
    a.follow(db, b)?;
    b.follow(db, a)?;
    Ok(())
}

/// Create a book owned by `owner`, inviting `invitees`.
pub fn book(db: &Connection, owner: &User, invitees: &[&User]) -> Fallible<Book> {
    let data = NewBook {
        title: "The Book".into(),
        invitees: invitees.iter().map(|u| u.penname.clone()).collect(),
        ..NewBook::default()
    };

    Ok(Book::create(db, db, owner, &data)?)
}

/// Create a book owned by `owner` and move it through the lifecycle up to
/// `status`.
pub fn book_in(db: &Connection, owner: &User, status: BookStatus)
-> Fallible<Book> {
    let mut book = book(db, owner, &[])?;
    let access = book.access(db, owner)?;

    let path: &[BookStatus] = match status {
        BookStatus::Initial => &[],
        BookStatus::Draft => &[BookStatus::Draft],
        BookStatus::Published => &[BookStatus::Draft, BookStatus::Published],
        BookStatus::Completed => &[BookStatus::Draft, BookStatus::Completed],
        BookStatus::Archived =>
            &[BookStatus::Draft, BookStatus::Published, BookStatus::Archived],
    };

    for &next in path {
        book.move_state(db, &access, next, false)?;
    }

    assert_eq!(book.status, status);
    Ok(book)
}

/// Reload a user to see changes made to their balance.
pub fn reloaded(db: &Connection, user: &User) -> Fallible<User> {
    Ok(User::by_id(db, user.id())?)
}
