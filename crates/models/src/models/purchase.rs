use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::{
    Connection as _,
    prelude::*,
    result::{DatabaseErrorKind, Error as DbError},
};
use failure::Fail;
use quire_error::ApiError;
use quire_macros::From;
use serde::Serialize;

use crate::db::{
    Connection,
    models as db,
    schema::{chapter_market_history, users},
};
use super::{Chapter, ChapterState, FindModelResult, Model, User};

/// Record of a user buying a chapter.
#[derive(Clone, Debug)]
pub struct Purchase {
    data: db::Purchase,
}

#[derive(Debug, Serialize)]
pub struct Public {
    chapter: i32,
    user: i32,
    price: i64,
    created_at: DateTime<Utc>,
}

/// Result of buying a chapter.
#[derive(Debug, Serialize)]
pub struct Receipt {
    pub purchase: Public,
    /// Buyer's balance after the purchase.
    pub buyer_balance: i64,
    /// Chapter author's balance after the purchase.
    pub author_balance: i64,
}

impl Model for Purchase {
    const ERROR_CATEGORY: &'static str = "purchase";

    /// Chapter and user IDs.
    type Id = (i32, i32);
    type Database = db::Purchase;
    type Public = Public;
    type PublicParams = ();

    fn by_id(db: &Connection, (chapter, user): (i32, i32))
    -> FindModelResult<Self> {
        chapter_market_history::table
            .filter(chapter_market_history::chapter.eq(chapter)
                .and(chapter_market_history::user.eq(user)))
            .get_result(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    fn from_db(data: db::Purchase) -> Self {
        Purchase { data }
    }

    fn into_db(self) -> db::Purchase {
        self.data
    }

    fn id(&self) -> Self::Id {
        (self.data.chapter, self.data.user)
    }

    fn get_public(&self) -> Public {
        let db::Purchase { chapter, user, price, created_at } = self.data;

        Public {
            chapter,
            user,
            price,
            created_at: DateTime::from_utc(created_at, Utc),
        }
    }
}

impl Purchase {
    /// Get all purchases made by a user, newest first.
    pub fn by_user(db: &Connection, user: i32) -> Result<Vec<Purchase>, DbError> {
        chapter_market_history::table
            .filter(chapter_market_history::user.eq(user))
            .order((
                chapter_market_history::created_at.desc(),
                chapter_market_history::chapter.desc(),
            ))
            .get_results::<db::Purchase>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Has `user` bought `chapter`?
    pub fn exists(db: &Connection, chapter: i32, user: i32)
    -> Result<bool, DbError> {
        diesel::select(diesel::dsl::exists(chapter_market_history::table
            .filter(chapter_market_history::chapter.eq(chapter)
                .and(chapter_market_history::user.eq(user)))))
            .get_result(db)
    }

    pub fn price(&self) -> i64 {
        self.data.price
    }
}

impl Chapter {
    /// Buy this chapter.
    ///
    /// Chapter's price is moved from buyer's to author's balance and
    /// a receipt is recorded, all in a single transaction. A chapter can only
    /// be bought once by each user.
    pub fn buy(&self, db: &Connection, buyer: &User, now: NaiveDateTime)
    -> Result<Receipt, BuyChapterError> {
        if self.state(now) != ChapterState::Live {
            return Err(BuyChapterError::NotPublished);
        }

        if self.author == buyer.id() {
            return Err(BuyChapterError::Own);
        }

        let price = self.price;

        if price == 0 {
            return Err(BuyChapterError::Free);
        }

        let purchase = db::Purchase {
            chapter: self.id,
            user: buyer.id(),
            price,
            created_at: now,
        };

        db.transaction(|| {
            // The receipt's primary key serialises purchases of the same
            // chapter by the same user. Everything below is rolled back with
            // it when the buyer can't pay.
            diesel::insert_into(chapter_market_history::table)
                .values(&purchase)
                .execute(db)
                .map_err(|err| match err {
                    DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) =>
                        BuyChapterError::AlreadyBought,
                    err => BuyChapterError::Database(err),
                })?;

            let debited = diesel::update(users::table
                .filter(users::id.eq(buyer.id())
                    .and(users::coin.ge(price))))
                .set(users::coin.eq(users::coin - price))
                .execute(db)?;

            if debited == 0 {
                return Err(BuyChapterError::InsufficientBalance);
            }

            diesel::update(users::table.filter(users::id.eq(self.author)))
                .set(users::coin.eq(users::coin + price))
                .execute(db)?;

            let buyer_balance = balance(db, buyer.id())?;
            let author_balance = balance(db, self.author)?;

            log::info!("User {} bought chapter {} from {} for {} coin(s)",
                buyer.id(), self.id, self.author, price);

            Ok(Receipt {
                purchase: Purchase::from_db(purchase).get_public(),
                buyer_balance,
                author_balance,
            })
        })
    }
}

fn balance(db: &Connection, user: i32) -> Result<i64, DbError> {
    users::table
        .filter(users::id.eq(user))
        .select(users::coin)
        .get_result(db)
}

#[derive(ApiError, Debug, Fail, From)]
pub enum BuyChapterError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[api(code = "chapter:not-published", status = "BAD_REQUEST")]
    #[fail(display = "Chapter is not published")]
    NotPublished,
    #[api(code = "chapter:buy:own", status = "BAD_REQUEST")]
    #[fail(display = "You can't buy your own chapter")]
    Own,
    #[api(code = "chapter:buy:free", status = "BAD_REQUEST")]
    #[fail(display = "This chapter is free")]
    Free,
    #[api(code = "chapter:buy:already-bought", status = "CONFLICT")]
    #[fail(display = "You have already bought this chapter")]
    AlreadyBought,
    #[api(code = "user:coin:insufficient", status = "PAYMENT_REQUIRED")]
    #[fail(display = "Not enough coins to buy this chapter")]
    InsufficientBalance,
}
