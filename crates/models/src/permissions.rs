//! Who can do what with a book.
//!
//! A user's capabilities in a book are determined entirely by their
//! [`MemberStatus`] in it. Every workflow resolves an [`Access`] for the
//! acting user before touching any state.

use diesel::{prelude::*, result::Error as DbError};
use failure::Fail;
use quire_error::{ApiError, StatusCode};
use std::{borrow::Cow, fmt};

use crate::db::{Connection, schema::book_owners, types::MemberStatus};

/// Source of users' roles in books.
pub trait RoleLookup {
    /// Find status of `user` in `book`, or `None` if they have no relation to
    /// it.
    fn member_status(&self, book: i32, user: i32)
    -> Result<Option<MemberStatus>, DbError>;
}

impl RoleLookup for Connection {
    fn member_status(&self, book: i32, user: i32)
    -> Result<Option<MemberStatus>, DbError> {
        book_owners::table
            .filter(book_owners::book.eq(book)
                .and(book_owners::user.eq(user)))
            .select(book_owners::status)
            .get_result(self)
            .optional()
    }
}

/// Resolved role of a user in a book.
#[derive(Clone, Copy, Debug)]
pub struct Access {
    book: i32,
    user: i32,
    status: Option<MemberStatus>,
}

impl Access {
    /// Look up what `user` can do in `book`.
    pub fn resolve(lookup: &dyn RoleLookup, book: i32, user: i32)
    -> Result<Access, DbError> {
        Ok(Access {
            book,
            user,
            status: lookup.member_status(book, user)?,
        })
    }

    pub fn book(&self) -> i32 {
        self.book
    }

    pub fn user(&self) -> i32 {
        self.user
    }

    /// User's status in the book, or `None` if they are not related to it.
    pub fn status(&self) -> Option<MemberStatus> {
        self.status
    }

    pub fn is_owner(&self) -> bool {
        self.status == Some(MemberStatus::Owner)
    }

    /// Can this user write chapters in this book?
    pub fn is_collaborator_or_owner(&self) -> bool {
        self.status.map_or(false, MemberStatus::is_author)
    }

    pub fn is_invitee(&self) -> bool {
        self.status == Some(MemberStatus::Invitee)
    }

    pub fn require_owner(&self) -> Result<(), RequireRoleError> {
        self.require(Role::Owner, self.is_owner())
    }

    pub fn require_author(&self) -> Result<(), RequireRoleError> {
        self.require(Role::Author, self.is_collaborator_or_owner())
    }

    pub fn require_invitee(&self) -> Result<(), RequireRoleError> {
        self.require(Role::Invitee, self.is_invitee())
    }

    fn require(&self, role: Role, present: bool) -> Result<(), RequireRoleError> {
        if present {
            Ok(())
        } else {
            log::debug!("User {} is not {} of book {} (status: {:?})",
                self.user, role, self.book, self.status);
            Err(RequireRoleError { book: self.book, role })
        }
    }
}

/// Role required to perform an action.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Owner,
    /// Owner or collaborator.
    Author,
    Invitee,
}

impl fmt::Display for Role {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            Role::Owner => "the owner",
            Role::Author => "an author",
            Role::Invitee => "invited",
        })
    }
}

#[derive(Debug, Fail)]
pub struct RequireRoleError {
    book: i32,
    role: Role,
}

impl RequireRoleError {
    pub fn role(&self) -> Role {
        self.role
    }
}

impl ApiError for RequireRoleError {
    fn status(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }

    fn code(&self) -> Option<Cow<str>> {
        Some(Cow::Borrowed("book:role:missing"))
    }
}

impl fmt::Display for RequireRoleError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Only {} of book {} can do this", self.role, self.book)
    }
}
