use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use failure::Fallible;
use quire_models::{
    BookStatus,
    Chapter,
    ChapterDraft,
    Model,
    Publication,
    Purchase,
    User,
    chapter::PublicParams,
    db::{Connection, models as db, schema::chapter_market_history},
    purchase::BuyChapterError,
    user::GrantCoinsError,
};

mod common;

use common::*;

/// Publish a chapter priced at `price` in a new book owned by `author`.
fn priced_chapter(db: &Connection, author: &User, price: i64, now: NaiveDateTime)
-> Fallible<Chapter> {
    let book = book_in(db, author, BookStatus::Published)?;

    Ok(Chapter::create(db, author, &ChapterDraft {
        title: "Paid chapter".into(),
        content: "The butler did it".into(),
        book: Some(book.id()),
        published_at: Some(Publication::Now),
        price: Some(price),
    }, now)?)
}

fn receipts(db: &Connection, user: &User) -> Fallible<usize> {
    Ok(Purchase::by_user(db, user.id())?.len())
}

#[test]
fn scenario_insufficient_balance() -> Fallible<()> {
    let db = connection()?;
    let now = Utc::now().naive_utc();
    let author = user(&db, "author")?;
    let buyer = funded(&db, "buyer", 50)?;
    let chapter = priced_chapter(&db, &author, 100, now)?;

    match chapter.buy(&db, &buyer, now) {
        Err(BuyChapterError::InsufficientBalance) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(reloaded(&db, &buyer)?.coin(), 50);
    assert_eq!(reloaded(&db, &author)?.coin(), 0);
    assert_eq!(receipts(&db, &buyer)?, 0);

    Ok(())
}

#[test]
fn scenario_successful_purchase() -> Fallible<()> {
    let db = connection()?;
    let now = Utc::now().naive_utc();
    let author = user(&db, "author")?;
    let buyer = funded(&db, "buyer", 150)?;
    let chapter = priced_chapter(&db, &author, 100, now)?;

    let receipt = chapter.buy(&db, &buyer, now)?;

    assert_eq!(receipt.buyer_balance, 50);
    assert_eq!(receipt.author_balance, 100);
    assert_eq!(reloaded(&db, &buyer)?.coin(), 50);
    assert_eq!(reloaded(&db, &author)?.coin(), 100);

    let purchases = Purchase::by_user(&db, buyer.id())?;
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].price(), 100);
    assert_eq!(purchases[0].id(), (chapter.id(), buyer.id()));

    Ok(())
}

#[test]
fn chapter_is_bought_once() -> Fallible<()> {
    let db = connection()?;
    let now = Utc::now().naive_utc();
    let author = user(&db, "author")?;
    let buyer = funded(&db, "buyer", 500)?;
    let chapter = priced_chapter(&db, &author, 100, now)?;

    chapter.buy(&db, &buyer, now)?;

    match chapter.buy(&db, &buyer, now) {
        Err(BuyChapterError::AlreadyBought) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(reloaded(&db, &buyer)?.coin(), 400);
    assert_eq!(reloaded(&db, &author)?.coin(), 100);
    assert_eq!(receipts(&db, &buyer)?, 1);

    Ok(())
}

#[test]
fn existing_receipt_blocks_transfer() -> Fallible<()> {
    let db = connection()?;
    let now = Utc::now().naive_utc();
    let author = user(&db, "author")?;
    let buyer = funded(&db, "buyer", 500)?;
    let chapter = priced_chapter(&db, &author, 100, now)?;

    // A purchase committed by another request.
    diesel::insert_into(chapter_market_history::table)
        .values(&db::Purchase {
            chapter: chapter.id(),
            user: buyer.id(),
            price: 100,
            created_at: now,
        })
        .execute(&db)?;

    match chapter.buy(&db, &buyer, now) {
        Err(BuyChapterError::AlreadyBought) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(reloaded(&db, &buyer)?.coin(), 500);
    assert_eq!(reloaded(&db, &author)?.coin(), 0);
    assert_eq!(receipts(&db, &buyer)?, 1);

    Ok(())
}

#[test]
fn purchase_preconditions() -> Fallible<()> {
    let db = connection()?;
    let now = Utc::now().naive_utc();
    let author = funded(&db, "author", 100)?;
    let buyer = funded(&db, "buyer", 100)?;

    let chapter = priced_chapter(&db, &author, 10, now)?;

    match chapter.buy(&db, &author, now) {
        Err(BuyChapterError::Own) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    let free = priced_chapter(&db, &author, 0, now)?;

    match free.buy(&db, &buyer, now) {
        Err(BuyChapterError::Free) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    let book = book_in(&db, &author, BookStatus::Draft)?;
    let scheduled = Chapter::create(&db, &author, &ChapterDraft {
        title: "Coming soon".into(),
        content: "...".into(),
        book: Some(book.id()),
        published_at: Some(Publication::At(
            chrono::DateTime::from_utc(now + Duration::days(1), Utc))),
        price: Some(10),
    }, now)?;

    match scheduled.buy(&db, &buyer, now) {
        Err(BuyChapterError::NotPublished) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(reloaded(&db, &buyer)?.coin(), 100);
    assert_eq!(receipts(&db, &buyer)?, 0);

    Ok(())
}

#[test]
fn content_requires_purchase() -> Fallible<()> {
    let db = connection()?;
    let now = Utc::now().naive_utc();
    let author = user(&db, "author")?;
    let buyer = funded(&db, "buyer", 100)?;
    let chapter = priced_chapter(&db, &author, 10, now)?;

    assert!(chapter.can_access_content(&db, author.id())?);
    assert!(!chapter.can_access_content(&db, buyer.id())?);

    let public = serde_json::to_value(chapter.get_public_full(
        &db, &PublicParams { viewer: buyer.id() })?)?;
    assert_eq!(public["locked"], true);
    assert!(public["content"].is_null());

    chapter.buy(&db, &buyer, now)?;

    assert!(chapter.can_access_content(&db, buyer.id())?);

    let public = serde_json::to_value(chapter.get_public_full(
        &db, &PublicParams { viewer: buyer.id() })?)?;
    assert_eq!(public["locked"], false);
    assert_eq!(public["content"], "The butler did it");

    Ok(())
}

#[test]
fn granting_coins() -> Fallible<()> {
    let db = connection()?;
    let mut user = user(&db, "alice")?;

    match user.grant_coins(&db, 0) {
        Err(GrantCoinsError::NotPositive) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    user.grant_coins(&db, 30)?;
    user.grant_coins(&db, 12)?;
    assert_eq!(user.coin(), 42);

    Ok(())
}
