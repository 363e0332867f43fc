use diesel::{Connection as _, prelude::*, result::Error as DbError};
use failure::Fail;
use quire_error::ApiError;
use quire_macros::From;
use serde::Serialize;

use crate::{
    db::{
        Connection,
        models as db,
        schema::{book_owners, users},
        types::MemberStatus,
    },
    permissions::{Access, RequireRoleError},
};
use super::{AssertExists, FindModelError, FindModelResult, Model, User};

/// A user's membership in a book.
#[derive(Clone, Debug)]
pub struct BookMember {
    data: db::BookOwner,
    user: User,
}

#[derive(Debug, Serialize)]
pub struct Public {
    book: i32,
    user: <User as Model>::Public,
    status: MemberStatus,
}

impl Model for BookMember {
    const ERROR_CATEGORY: &'static str = "book:member";

    /// Book and user IDs.
    type Id = (i32, i32);
    type Database = (db::BookOwner, db::User);
    type Public = Public;
    type PublicParams = ();

    fn by_id(db: &Connection, (book, user): (i32, i32))
    -> FindModelResult<Self> {
        book_owners::table
            .inner_join(users::table)
            .filter(book_owners::book.eq(book)
                .and(book_owners::user.eq(user)))
            .get_result::<(db::BookOwner, db::User)>(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    fn from_db((data, user): Self::Database) -> Self {
        BookMember {
            data,
            user: User::from_db(user),
        }
    }

    fn into_db(self) -> Self::Database {
        (self.data, self.user.into_db())
    }

    fn id(&self) -> Self::Id {
        (self.data.book, self.data.user)
    }

    fn get_public(&self) -> Public {
        Public {
            book: self.data.book,
            user: self.user.get_public(),
            status: self.data.status,
        }
    }
}

impl BookMember {
    /// Get all members of a book, owner first.
    pub fn by_book(db: &Connection, book: i32)
    -> Result<Vec<BookMember>, DbError> {
        book_owners::table
            .inner_join(users::table)
            .filter(book_owners::book.eq(book))
            .order(users::id.asc())
            .get_results::<(db::BookOwner, db::User)>(db)
            .map(|v| {
                let mut members = v.into_iter()
                    .map(Self::from_db)
                    .collect::<Vec<_>>();
                members.sort_by_key(|m| m.data.status != MemberStatus::Owner);
                members
            })
    }

    pub fn status(&self) -> MemberStatus {
        self.data.status
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Accept or decline an invitation to a book.
    ///
    /// The acting user must be currently invited to the book.
    pub fn respond(db: &Connection, access: &Access, accept: bool)
    -> Result<BookMember, RespondError> {
        access.require_invitee()?;

        let status = if accept {
            MemberStatus::Collaborator
        } else {
            MemberStatus::Rejected
        };

        db.transaction(|| {
            let updated = diesel::update(book_owners::table
                .filter(book_owners::book.eq(access.book())
                    .and(book_owners::user.eq(access.user()))
                    .and(book_owners::status.eq(MemberStatus::Invitee))))
                .set(book_owners::status.eq(status))
                .execute(db)?;

            if updated == 0 {
                return Err(RespondError::NoLongerInvited);
            }

            log::info!("User {} {} invitation to book {}",
                access.user(),
                if accept { "accepted" } else { "declined" },
                access.book());

            Ok(BookMember::by_id(db, (access.book(), access.user()))
                .assert_exists()?)
        })
    }

    /// Remove a user from a book.
    ///
    /// The owner can remove anyone but themselves. Other members can only
    /// remove themselves.
    pub fn remove(db: &Connection, access: &Access, user: i32)
    -> Result<(), RemoveMemberError> {
        if user == access.user() {
            if access.is_owner() {
                return Err(RemoveMemberError::OwnerCannotLeave);
            }
        } else {
            access.require_owner()?;
        }

        let deleted = diesel::delete(book_owners::table
            .filter(book_owners::book.eq(access.book())
                .and(book_owners::user.eq(user))))
            .execute(db)?;

        if deleted == 0 {
            return Err(FindModelError::<BookMember>::not_found().into());
        }

        log::info!("User {} removed {} from book {}",
            access.user(), user, access.book());

        Ok(())
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum RespondError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    Role(#[cause] #[from] RequireRoleError),
    #[api(code = "book:member:no-longer-invited", status = "CONFLICT")]
    #[fail(display = "Invitation was withdrawn")]
    NoLongerInvited,
}

#[derive(ApiError, Debug, Fail, From)]
pub enum RemoveMemberError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    Role(#[cause] #[from] RequireRoleError),
    #[fail(display = "{}", _0)]
    NotFound(#[cause] #[from] FindModelError<BookMember>),
    #[api(code = "book:member:owner", status = "BAD_REQUEST")]
    #[fail(display = "Owner can't leave their own book")]
    OwnerCannotLeave,
}
