use chrono::Utc;
use diesel::{Connection as _, prelude::*, result::Error as DbError};
use failure::Fail;
use itertools::Itertools;
use quire_error::ApiError;
use quire_macros::From;
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        Connection,
        functions::last_insert_rowid,
        models as db,
        schema::{book_owners, books, categories_on_books, chapters},
        types::{BookStatus, MemberStatus},
    },
    lifecycle::{self, IllegalTransition},
    permissions::{Access, RequireRoleError, RoleLookup},
};
use super::{
    AssertExists,
    BookMember,
    Category,
    FindModelError,
    FindModelResult,
    FollowGraph,
    Model,
    User,
    category::Public as CategoryPublic,
};

/// A book, written collaboratively by its owner and collaborators.
#[derive(Clone, Debug)]
pub struct Book {
    data: db::Book,
}

/// A subset of book's data that can safely be publicly exposed.
#[derive(Debug, Serialize)]
pub struct Public {
    id: i32,
    title: String,
    description: Option<String>,
    cover: Option<String>,
    wallpaper: Option<String>,
    status: BookStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<Vec<CategoryPublic>>,
}

/// Data needed to create a new book.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewBook {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub wallpaper: Option<String>,
    /// Pennames of users to invite as collaborators.
    #[serde(default)]
    pub invitees: Vec<String>,
    /// IDs of categories to tag this book with.
    #[serde(default)]
    pub categories: Vec<i32>,
}

/// Changes to a book's details. Fields which are `None` are left unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BookDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub wallpaper: Option<String>,
    /// Replace book's categories with these.
    #[serde(default)]
    pub categories: Option<Vec<i32>>,
}

impl Model for Book {
    const ERROR_CATEGORY: &'static str = "book";

    type Id = i32;
    type Database = db::Book;
    type Public = Public;
    type PublicParams = ();

    fn by_id(db: &Connection, id: i32) -> FindModelResult<Self> {
        books::table
            .filter(books::id.eq(id))
            .get_result::<db::Book>(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    fn from_db(data: db::Book) -> Self {
        Book { data }
    }

    fn into_db(self) -> db::Book {
        self.data
    }

    fn id(&self) -> i32 {
        self.data.id
    }

    fn get_public(&self) -> Self::Public {
        let db::Book {
            id, ref title, ref description, ref cover, ref wallpaper, status, ..
        } = self.data;

        Public {
            id,
            title: title.clone(),
            description: description.clone(),
            cover: cover.clone(),
            wallpaper: wallpaper.clone(),
            status,
            categories: None,
        }
    }

    fn get_public_full(&self, db: &Connection, _: &())
    -> Result<Public, DbError> {
        let categories = Category::by_book(db, self.data.id)?
            .iter()
            .map(Category::get_public)
            .collect();

        Ok(Public {
            categories: Some(categories),
            ..self.get_public()
        })
    }
}

impl Book {
    /// Get all books.
    pub fn all(db: &Connection) -> Result<Vec<Book>, DbError> {
        books::table
            .order(books::id.asc())
            .get_results::<db::Book>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Get all books in a given status.
    pub fn by_status(db: &Connection, status: BookStatus)
    -> Result<Vec<Book>, DbError> {
        books::table
            .filter(books::status.eq(status))
            .order(books::id.asc())
            .get_results::<db::Book>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Get all books a user owns or collaborates on.
    pub fn by_member(db: &Connection, user: i32) -> Result<Vec<Book>, DbError> {
        books::table
            .inner_join(book_owners::table)
            .filter(book_owners::user.eq(user))
            .filter(book_owners::status.eq_any(
                vec![MemberStatus::Owner, MemberStatus::Collaborator]))
            .select(books::all_columns)
            .order(books::id.asc())
            .get_results::<db::Book>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Create a new book owned by `owner`.
    ///
    /// Each of the invitees must be in a mutual follow relationship with the
    /// owner. Duplicate pennames are collapsed into a single invitation.
    pub fn create(
        db: &Connection,
        graph: &dyn FollowGraph,
        owner: &User,
        data: &NewBook,
    ) -> Result<Book, CreateBookError> {
        let title = data.title.trim();

        if title.is_empty() {
            return Err(CreateBookError::EmptyTitle);
        }

        db.transaction(|| {
            let now = Utc::now().naive_utc();

            diesel::insert_into(books::table)
                .values(db::NewBook {
                    title,
                    description: data.description.as_ref().map(String::as_str),
                    cover: data.cover.as_ref().map(String::as_str),
                    wallpaper: data.wallpaper.as_ref().map(String::as_str),
                    status: BookStatus::Initial,
                    created_at: now,
                    updated_at: now,
                })
                .execute(db)?;

            let id = diesel::select(last_insert_rowid).get_result::<i64>(db)?
                as i32;

            diesel::insert_into(book_owners::table)
                .values(db::BookOwner {
                    book: id,
                    user: owner.id(),
                    status: MemberStatus::Owner,
                })
                .execute(db)?;

            for penname in data.invitees.iter().map(|p| p.trim()).unique() {
                let invitee = User::by_penname(db, penname)
                    .map_err(InviteError::from)?;

                check_invitee(graph, owner.id(), &invitee, None)?;

                diesel::insert_into(book_owners::table)
                    .values(db::BookOwner {
                        book: id,
                        user: invitee.id(),
                        status: MemberStatus::Invitee,
                    })
                    .execute(db)?;
            }

            set_categories(db, id, &data.categories)?;

            let book = Book::by_id(db, id).assert_exists()?;

            log::info!("User {} created book {} with {} invitee(s)",
                owner.id(), id, data.invitees.len());

            Ok(book)
        })
    }

    /// Resolve what `user` can do in this book.
    pub fn access(&self, lookup: &dyn RoleLookup, user: &User)
    -> Result<Access, DbError> {
        Access::resolve(lookup, self.data.id, user.id())
    }

    /// Change this book's details.
    pub fn set_details(
        &mut self,
        db: &Connection,
        access: &Access,
        details: &BookDetails,
    ) -> Result<(), UpdateBookError> {
        debug_assert_eq!(access.book(), self.data.id);
        access.require_author()?;

        if self.data.status == BookStatus::Archived {
            return Err(UpdateBookError::Archived);
        }

        let title = details.title.as_ref().map(|t| t.trim());

        if title.map_or(false, str::is_empty) {
            return Err(UpdateBookError::EmptyTitle);
        }

        db.transaction(|| {
            diesel::update(&self.data)
                .set(db::BookChange {
                    title,
                    description: details.description.as_ref()
                        .map(|d| Some(d.as_str())),
                    cover: details.cover.as_ref().map(|c| Some(c.as_str())),
                    wallpaper: details.wallpaper.as_ref()
                        .map(|w| Some(w.as_str())),
                    updated_at: Some(Utc::now().naive_utc()),
                })
                .execute(db)?;

            if let Some(ref categories) = details.categories {
                diesel::delete(categories_on_books::table
                    .filter(categories_on_books::book.eq(self.data.id)))
                    .execute(db)?;
                set_categories(db, self.data.id, categories)?;
            }

            self.reload(db)?;

            Ok(())
        })
    }

    /// Move this book to another status.
    ///
    /// Leaving the initial status purges all invitations, pending and
    /// rejected. Unless `force` is set this is refused while any invitation
    /// is still pending.
    pub fn move_state(
        &mut self,
        db: &Connection,
        access: &Access,
        target: BookStatus,
        force: bool,
    ) -> Result<(), MoveStateError> {
        debug_assert_eq!(access.book(), self.data.id);
        access.require_owner()?;

        let observed = self.data.status;
        lifecycle::check_transition(observed, target)?;

        db.transaction(|| {
            if observed == BookStatus::Initial && !force {
                let pending = book_owners::table
                    .filter(book_owners::book.eq(self.data.id))
                    .filter(book_owners::status.eq(MemberStatus::Invitee))
                    .count()
                    .get_result::<i64>(db)?;

                if pending > 0 {
                    return Err(MoveStateError::PendingInvites);
                }
            }

            let updated = diesel::update(books::table
                .filter(books::id.eq(self.data.id)
                    .and(books::status.eq(observed))))
                .set((
                    books::status.eq(target),
                    books::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(db)?;

            if updated == 0 {
                return Err(MoveStateError::ConcurrentChange);
            }

            if observed == BookStatus::Initial {
                let purged = diesel::delete(book_owners::table
                    .filter(book_owners::book.eq(self.data.id))
                    .filter(book_owners::status.eq_any(
                        vec![MemberStatus::Invitee, MemberStatus::Rejected])))
                    .execute(db)?;

                log::debug!("Purged {} invitation(s) of book {}",
                    purged, self.data.id);
            }

            self.reload(db)?;

            log::info!("Book {} moved from {} to {} by user {}",
                self.data.id, observed, target, access.user());

            Ok(())
        })
    }

    /// Delete this book.
    ///
    /// Chapters which were not yet published are deleted with it.
    pub fn delete(self, db: &Connection, access: &Access)
    -> Result<(), DeleteBookError> {
        debug_assert_eq!(access.book(), self.data.id);
        access.require_owner()?;

        if !lifecycle::can_delete(self.data.status) {
            return Err(DeleteBookError::BadStatus(self.data.status));
        }

        db.transaction(|| {
            let now = Utc::now().naive_utc();

            let has_live = diesel::select(diesel::dsl::exists(chapters::table
                .filter(chapters::book.eq(self.data.id))
                .filter(chapters::published_at.le(now))))
                .get_result::<bool>(db)?;

            if has_live {
                return Err(DeleteBookError::HasLiveChapters);
            }

            diesel::delete(chapters::table
                .filter(chapters::book.eq(self.data.id)))
                .execute(db)?;

            let deleted = diesel::delete(books::table
                .filter(books::id.eq(self.data.id)
                    .and(books::status.eq(self.data.status))))
                .execute(db)?;

            if deleted == 0 {
                return Err(DeleteBookError::ConcurrentChange);
            }

            log::info!("Book {} deleted by user {}", self.data.id, access.user());

            Ok(())
        })
    }

    /// Invite a user to collaborate on this book.
    ///
    /// Inviting a user who was already invited, or who rejected an earlier
    /// invitation, renews the invitation. Only books in the initial status
    /// accept new invitations.
    pub fn invite(
        &self,
        db: &Connection,
        graph: &dyn FollowGraph,
        access: &Access,
        penname: &str,
    ) -> Result<BookMember, InviteError> {
        debug_assert_eq!(access.book(), self.data.id);
        access.require_owner()?;

        let invitee = User::by_penname(db, penname.trim())?;

        db.transaction(|| {
            // Invitations are purged when a book leaves the initial status,
            // so they can't be made afterwards.
            let status = books::table
                .filter(books::id.eq(self.data.id))
                .select(books::status)
                .get_result::<BookStatus>(db)?;

            if status != BookStatus::Initial {
                return Err(InviteError::BookClosed(status));
            }

            let current = db.member_status(self.data.id, invitee.id())?;

            check_invitee(graph, access.user(), &invitee, current)?;

            diesel::replace_into(book_owners::table)
                .values(db::BookOwner {
                    book: self.data.id,
                    user: invitee.id(),
                    status: MemberStatus::Invitee,
                })
                .execute(db)?;

            log::info!("User {} invited {} to book {}",
                access.user(), invitee.id(), self.data.id);

            Ok(BookMember::by_id(db, (self.data.id, invitee.id()))
                .assert_exists()?)
        })
    }

    /// Get all members of this book, including invitees.
    pub fn members(&self, db: &Connection) -> Result<Vec<BookMember>, DbError> {
        BookMember::by_book(db, self.data.id)
    }

    /// Get a single member of this book.
    pub fn member(&self, db: &Connection, user: i32)
    -> FindModelResult<BookMember> {
        BookMember::by_id(db, (self.data.id, user))
    }

    fn reload(&mut self, db: &Connection) -> Result<(), DbError> {
        self.data = books::table
            .filter(books::id.eq(self.data.id))
            .get_result(db)?;
        Ok(())
    }
}

impl std::ops::Deref for Book {
    type Target = db::Book;

    fn deref(&self) -> &db::Book {
        &self.data
    }
}

/// Check whether `inviter` can invite `invitee`, whose current status in the
/// book is `current`.
fn check_invitee(
    graph: &dyn FollowGraph,
    inviter: i32,
    invitee: &User,
    current: Option<MemberStatus>,
) -> Result<(), InviteError> {
    if invitee.id() == inviter {
        return Err(InviteError::SelfInvite);
    }

    match current {
        Some(MemberStatus::Owner) | Some(MemberStatus::Collaborator) =>
            return Err(InviteError::AlreadyMember),
        Some(MemberStatus::Invitee) | Some(MemberStatus::Rejected) | None => (),
    }

    if !graph.are_mutual(inviter, invitee.id())? {
        return Err(InviteError::NotMutual);
    }

    Ok(())
}

/// Tag a book with categories. All categories must exist.
fn set_categories(db: &Connection, book: i32, categories: &[i32])
-> Result<(), CategoriesError> {
    for &category in categories.iter().unique() {
        Category::by_id(db, category)?;

        diesel::insert_into(categories_on_books::table)
            .values(db::CategoryOnBook { book, category })
            .execute(db)?;
    }

    Ok(())
}

#[derive(ApiError, Debug, Fail, From)]
pub enum CategoriesError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    NotFound(#[cause] #[from] FindModelError<Category>),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum CreateBookError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[api(code = "book:title:empty", status = "BAD_REQUEST")]
    #[fail(display = "Book's title can't be empty")]
    EmptyTitle,
    #[fail(display = "{}", _0)]
    Invite(#[cause] #[from] InviteError),
    #[fail(display = "{}", _0)]
    Categories(#[cause] #[from] CategoriesError),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum UpdateBookError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    Role(#[cause] #[from] RequireRoleError),
    #[api(code = "book:archived", status = "BAD_REQUEST")]
    #[fail(display = "Archived books can't be modified")]
    Archived,
    #[api(code = "book:title:empty", status = "BAD_REQUEST")]
    #[fail(display = "Book's title can't be empty")]
    EmptyTitle,
    #[fail(display = "{}", _0)]
    Categories(#[cause] #[from] CategoriesError),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum MoveStateError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    Role(#[cause] #[from] RequireRoleError),
    #[fail(display = "{}", _0)]
    IllegalTransition(#[cause] #[from] IllegalTransition),
    #[api(code = "book:status:pending-invites", status = "CONFLICT")]
    #[fail(display = "There are pending invitations to this book")]
    PendingInvites,
    #[api(code = "book:status:concurrent-change", status = "CONFLICT")]
    #[fail(display = "Book's status was changed by someone else")]
    ConcurrentChange,
}

#[derive(ApiError, Debug, Fail, From)]
pub enum DeleteBookError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    Role(#[cause] #[from] RequireRoleError),
    #[api(code = "book:delete:bad-status", status = "BAD_REQUEST")]
    #[fail(display = "Books can't be deleted once {}", _0)]
    BadStatus(BookStatus),
    #[api(code = "book:delete:has-live-chapters", status = "CONFLICT")]
    #[fail(display = "Book has published chapters")]
    HasLiveChapters,
    #[api(code = "book:status:concurrent-change", status = "CONFLICT")]
    #[fail(display = "Book's status was changed by someone else")]
    ConcurrentChange,
}

#[derive(ApiError, Debug, Fail, From)]
pub enum InviteError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    Role(#[cause] #[from] RequireRoleError),
    #[fail(display = "{}", _0)]
    NoSuchUser(#[cause] #[from] FindModelError<User>),
    #[api(code = "book:invite:self", status = "BAD_REQUEST")]
    #[fail(display = "You can't invite yourself")]
    SelfInvite,
    #[api(code = "book:invite:already-member", status = "CONFLICT")]
    #[fail(display = "This user is already a member of this book")]
    AlreadyMember,
    #[api(code = "book:invite:not-mutual", status = "BAD_REQUEST")]
    #[fail(display = "Only users who follow each other can collaborate")]
    NotMutual,
    #[api(code = "book:invite:closed", status = "BAD_REQUEST")]
    #[fail(display = "Book is {}, it no longer accepts invitations", _0)]
    BookClosed(BookStatus),
}
