//! Data and behaviours modelled as objects.

use diesel::result::Error as DbError;
use failure::Fail;
use quire_error::{ApiError, StatusCode};
use serde::Serialize;
use std::{borrow::Cow, fmt, marker::PhantomData};

use crate::db::Connection;

pub mod book;
pub mod book_member;
pub mod category;
pub mod chapter;
pub mod purchase;
pub mod user;

pub use self::{
    book::{Book, BookDetails, NewBook},
    book_member::BookMember,
    category::Category,
    chapter::{Chapter, ChapterDraft, ChapterState, Publication},
    purchase::{Purchase, Receipt},
    user::{FollowGraph, User},
};

/// A database-backed object.
pub trait Model: Sized {
    /// Prefix of error codes reported for this model, e.g. `book` in
    /// `book:not-found`.
    const ERROR_CATEGORY: &'static str;

    type Id;
    /// Raw database record(s) backing this model.
    type Database;
    /// A subset of this model's data that can safely be publicly exposed.
    type Public: Serialize;
    /// Additional parameters for [`Model::get_public_full`].
    type PublicParams;

    /// Find a model by its ID.
    fn by_id(db: &Connection, id: Self::Id) -> FindModelResult<Self>;

    fn from_db(data: Self::Database) -> Self;

    fn into_db(self) -> Self::Database;

    fn id(&self) -> Self::Id;

    /// Get public portion of this model's data.
    fn get_public(&self) -> Self::Public;

    /// Get public portion of this model's data, including data which requires
    /// additional queries.
    fn get_public_full(&self, db: &Connection, params: &Self::PublicParams)
    -> Result<Self::Public, DbError> {
        let _ = (db, params);
        Ok(self.get_public())
    }
}

/// Public data of many models at once.
pub trait PublicList {
    type Public;
    type PublicParams;

    fn get_public(&self) -> Vec<Self::Public>;

    fn get_public_full(&self, db: &Connection, params: &Self::PublicParams)
    -> Result<Vec<Self::Public>, DbError>;
}

impl<M: Model> PublicList for [M] {
    type Public = M::Public;
    type PublicParams = M::PublicParams;

    fn get_public(&self) -> Vec<M::Public> {
        self.iter().map(Model::get_public).collect()
    }

    fn get_public_full(&self, db: &Connection, params: &M::PublicParams)
    -> Result<Vec<M::Public>, DbError> {
        self.iter().map(|model| model.get_public_full(db, params)).collect()
    }
}

pub type FindModelResult<M> = Result<M, FindModelError<M>>;

/// Error looking up a model.
pub enum FindModelError<M> {
    /// No such model exists.
    NotFound(PhantomData<fn() -> M>),
    /// Database error.
    Database(PhantomData<fn() -> M>, DbError),
}

impl<M> FindModelError<M> {
    pub fn not_found() -> Self {
        FindModelError::NotFound(PhantomData)
    }

    /// Turn this error into a [`DbError`], for when missing model is a bug
    /// rather than a user error.
    pub fn assert_exists(self) -> DbError {
        match self {
            FindModelError::NotFound(_) => DbError::NotFound,
            FindModelError::Database(_, err) => err,
        }
    }
}

impl<M> From<DbError> for FindModelError<M> {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => FindModelError::NotFound(PhantomData),
            err => FindModelError::Database(PhantomData, err),
        }
    }
}

impl<M> fmt::Debug for FindModelError<M> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FindModelError::NotFound(_) => fmt.write_str("NotFound"),
            FindModelError::Database(_, err) =>
                fmt.debug_tuple("Database").field(err).finish(),
        }
    }
}

impl<M: Model> fmt::Display for FindModelError<M> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FindModelError::NotFound(_) =>
                write!(fmt, "No such {}", M::ERROR_CATEGORY),
            FindModelError::Database(_, err) => fmt::Display::fmt(err, fmt),
        }
    }
}

impl<M: Model + 'static> Fail for FindModelError<M> {
    fn cause(&self) -> Option<&dyn Fail> {
        match self {
            FindModelError::NotFound(_) => None,
            FindModelError::Database(_, err) => Some(err),
        }
    }
}

impl<M: Model + 'static> ApiError for FindModelError<M> {
    fn status(&self) -> StatusCode {
        match self {
            FindModelError::NotFound(_) => StatusCode::NOT_FOUND,
            FindModelError::Database(..) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<Cow<str>> {
        match self {
            FindModelError::NotFound(_) =>
                Some(Cow::Owned(format!("{}:not-found", M::ERROR_CATEGORY))),
            FindModelError::Database(..) => None,
        }
    }
}

/// Treat a missing model as a database error.
pub trait AssertExists {
    type Ok;

    fn assert_exists(self) -> Result<Self::Ok, DbError>;
}

impl<T, M> AssertExists for Result<T, FindModelError<M>> {
    type Ok = T;

    fn assert_exists(self) -> Result<T, DbError> {
        self.map_err(FindModelError::assert_exists)
    }
}
