use chrono::Utc;
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
    functions::last_insert_rowid,
    models as db,
    schema::{follows, users},
};
use super::{FindModelResult, Model};

/// A single user in the system.
#[derive(Clone, Debug)]
pub struct User {
    data: db::User,
}

/// A subset of user's data that can safely be publicly exposed.
#[derive(Debug, Serialize)]
pub struct Public {
    id: i32,
    penname: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    coin: Option<i64>,
}

#[derive(Default)]
pub struct PublicParams {
    /// Include user's balance. This should only be set when user is looking
    /// at their own profile.
    pub include_balance: bool,
}

impl Model for User {
    const ERROR_CATEGORY: &'static str = "user";

    type Id = i32;
    type Database = db::User;
    type Public = Public;
    type PublicParams = PublicParams;

    fn by_id(db: &Connection, id: Self::Id) -> FindModelResult<Self> {
        users::table
            .filter(users::id.eq(id))
            .get_result(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    fn from_db(data: Self::Database) -> Self {
        User { data }
    }

    fn into_db(self) -> Self::Database {
        self.data
    }

    fn id(&self) -> Self::Id {
        self.data.id
    }

    fn get_public(&self) -> Public {
        let db::User { id, ref penname, ref name, .. } = self.data;

        Public {
            id,
            penname: penname.clone(),
            name: name.clone(),
            coin: None,
        }
    }

    fn get_public_full(&self, _: &Connection, params: &PublicParams)
    -> Result<Public, DbError> {
        let mut public = self.get_public();

        if params.include_balance {
            public.coin = Some(self.data.coin);
        }

        Ok(public)
    }
}

impl User {
    /// Get all users.
    pub fn all(db: &Connection) -> Result<Vec<User>, DbError> {
        users::table
            .order(users::id.asc())
            .get_results::<db::User>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Find an user by their penname.
    pub fn by_penname(db: &Connection, penname: &str) -> FindModelResult<User> {
        users::table
            .filter(users::penname.eq(penname))
            .get_result(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    /// Create a new user.
    pub fn create(db: &Connection, penname: &str, name: &str)
    -> Result<User, CreateUserError> {
        let penname = penname.trim();

        if penname.is_empty() || penname.chars().any(char::is_whitespace) {
            return Err(CreateUserError::BadPenname);
        }

        db.transaction(|| {
            diesel::insert_into(users::table)
                .values(db::NewUser {
                    penname,
                    name,
                    created_at: Utc::now().naive_utc(),
                })
                .execute(db)
                .map_err(|err| match err {
                    DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) =>
                        CreateUserError::PennameTaken,
                    err => CreateUserError::Database(err),
                })?;

            let id = diesel::select(last_insert_rowid).get_result::<i64>(db)?;

            log::info!("Created user {} ({})", penname, id);

            User::by_id(db, id as i32)
                .map_err(|err| CreateUserError::Database(err.assert_exists()))
        })
    }

    /// Reload this user's data from the database.
    ///
    /// Balance is modified by operations on other objects (e.g. when a chapter
    /// is bought), after which a user model held by the caller is stale.
    pub fn reload(&mut self, db: &Connection) -> Result<(), DbError> {
        self.data = users::table
            .filter(users::id.eq(self.data.id))
            .get_result(db)?;
        Ok(())
    }

    /// Current balance, as of when this model was loaded.
    pub fn coin(&self) -> i64 {
        self.data.coin
    }

    /// Add coins to this user's balance.
    ///
    /// There is no real money in the system, coins are granted by
    /// administrators.
    pub fn grant_coins(&mut self, db: &Connection, amount: i64)
    -> Result<(), GrantCoinsError> {
        if amount <= 0 {
            return Err(GrantCoinsError::NotPositive);
        }

        db.transaction(|| {
            diesel::update(users::table.filter(users::id.eq(self.data.id)))
                .set(users::coin.eq(users::coin + amount))
                .execute(db)?;

            self.reload(db)?;

            log::info!("Granted {} coins to user {}, balance is now {}",
                amount, self.data.id, self.data.coin);

            Ok(())
        })
    }

    /// Start following another user.
    ///
    /// Following a user who is already followed does nothing.
    pub fn follow(&self, db: &Connection, other: &User) -> Result<(), FollowError> {
        if self.data.id == other.data.id {
            return Err(FollowError::SelfFollow);
        }

        diesel::insert_or_ignore_into(follows::table)
            .values(db::Follow {
                follower: self.data.id,
                followee: other.data.id,
                created_at: Utc::now().naive_utc(),
            })
            .execute(db)?;

        Ok(())
    }

    /// Stop following another user.
    pub fn unfollow(&self, db: &Connection, other: &User) -> Result<(), DbError> {
        diesel::delete(follows::table
            .filter(follows::follower.eq(self.data.id)
                .and(follows::followee.eq(other.data.id))))
            .execute(db)?;
        Ok(())
    }

    /// Get list of users following this user.
    pub fn followers(&self, db: &Connection) -> Result<Vec<User>, DbError> {
        users::table
            .inner_join(follows::table.on(follows::follower.eq(users::id)))
            .filter(follows::followee.eq(self.data.id))
            .select(users::all_columns)
            .order(users::id.asc())
            .get_results::<db::User>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Get list of users this user follows.
    pub fn following(&self, db: &Connection) -> Result<Vec<User>, DbError> {
        users::table
            .inner_join(follows::table.on(follows::followee.eq(users::id)))
            .filter(follows::follower.eq(self.data.id))
            .select(users::all_columns)
            .order(users::id.asc())
            .get_results::<db::User>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }
}

impl std::ops::Deref for User {
    type Target = db::User;

    fn deref(&self) -> &db::User {
        &self.data
    }
}

/// Directed graph of who follows whom.
pub trait FollowGraph {
    /// Does `follower` follow `followee`?
    fn follows(&self, follower: i32, followee: i32) -> Result<bool, DbError>;

    /// Do `a` and `b` follow each other?
    fn are_mutual(&self, a: i32, b: i32) -> Result<bool, DbError> {
        Ok(self.follows(a, b)? && self.follows(b, a)?)
    }
}

impl FollowGraph for Connection {
    fn follows(&self, follower: i32, followee: i32) -> Result<bool, DbError> {
        diesel::select(diesel::dsl::exists(follows::table
            .filter(follows::follower.eq(follower)
                .and(follows::followee.eq(followee)))))
            .get_result(self)
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum CreateUserError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[api(code = "user:penname:invalid", status = "BAD_REQUEST")]
    #[fail(display = "Penname must be a single non-empty word")]
    BadPenname,
    #[api(code = "user:penname:taken", status = "CONFLICT")]
    #[fail(display = "This penname is already taken")]
    PennameTaken,
}

#[derive(ApiError, Debug, Fail, From)]
pub enum FollowError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[api(code = "user:follow:self", status = "BAD_REQUEST")]
    #[fail(display = "Users can't follow themselves")]
    SelfFollow,
}

#[derive(ApiError, Debug, Fail, From)]
pub enum GrantCoinsError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[api(code = "user:coin:not-positive", status = "BAD_REQUEST")]
    #[fail(display = "Only a positive amount of coins can be granted")]
    NotPositive,
}
