use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use diesel::{Connection as _, prelude::*, result::Error as DbError};
use failure::Fail;
use quire_error::ApiError;
use quire_macros::From;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::{fmt, str::FromStr};

use crate::{
    db::{
        Connection,
        functions::last_insert_rowid,
        models as db,
        schema::chapters,
    },
    lifecycle,
    permissions::{Access, RequireRoleError, RoleLookup},
};
use super::{AssertExists, Book, FindModelError, FindModelResult, Model, Purchase, User};

/// A chapter of a book, or a standalone draft.
#[derive(Clone, Debug)]
pub struct Chapter {
    data: db::Chapter,
}

/// Publication state of a chapter, derived from its publication date.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChapterState {
    /// Not scheduled for publication.
    Draft,
    /// Will be published at a future date.
    Scheduled,
    /// Published and visible to everyone.
    Live,
}

impl ChapterState {
    pub fn of(published_at: Option<NaiveDateTime>, now: NaiveDateTime)
    -> ChapterState {
        match published_at {
            None => ChapterState::Draft,
            Some(date) if date > now => ChapterState::Scheduled,
            Some(_) => ChapterState::Live,
        }
    }
}

/// When to publish a chapter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Publication {
    /// Right away.
    Now,
    /// At a specific (future) instant.
    At(DateTime<Utc>),
}

impl Publication {
    /// Resolve into a concrete publication date.
    ///
    /// Scheduling publication in the past is an error.
    pub fn resolve(self, now: NaiveDateTime)
    -> Result<NaiveDateTime, SaveChapterError> {
        match self {
            Publication::Now => Ok(now),
            Publication::At(date) if date.naive_utc() > now =>
                Ok(date.naive_utc()),
            Publication::At(_) => Err(SaveChapterError::PastSchedule),
        }
    }
}

impl FromStr for Publication {
    type Err = chrono::ParseError;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        if v == "now" {
            Ok(Publication::Now)
        } else {
            DateTime::parse_from_rfc3339(v)
                .map(|date| Publication::At(date.with_timezone(&Utc)))
        }
    }
}

impl<'de> Deserialize<'de> for Publication {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        d.deserialize_str(PublicationVisitor)
    }
}

struct PublicationVisitor;

impl<'de> de::Visitor<'de> for PublicationVisitor {
    type Value = Publication;

    fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(r#""now" or an RFC 3339 date"#)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Publication, E> {
        v.parse().map_err(|err| E::custom(format_args!(
            "invalid publication date {:?}: {}", v, err)))
    }
}

/// Contents of a new or edited chapter.
#[derive(Clone, Debug, Deserialize)]
pub struct ChapterDraft {
    pub title: String,
    pub content: String,
    /// Book to add this chapter to. When editing, `None` keeps the current
    /// book.
    #[serde(default)]
    pub book: Option<i32>,
    /// When to publish. When editing, `None` keeps the current schedule.
    #[serde(default)]
    pub published_at: Option<Publication>,
    /// Price in coins. When editing, `None` keeps the current price; new
    /// chapters are free by default.
    #[serde(default)]
    pub price: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Public {
    id: i32,
    book: Option<i32>,
    author: i32,
    title: String,
    /// Chapter's content, `None` if the viewer can't read it.
    content: Option<String>,
    locked: bool,
    state: ChapterState,
    published_at: Option<DateTime<Utc>>,
    price: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub struct PublicParams {
    /// User looking at the chapter.
    pub viewer: i32,
}

impl Model for Chapter {
    const ERROR_CATEGORY: &'static str = "chapter";

    type Id = i32;
    type Database = db::Chapter;
    type Public = Public;
    type PublicParams = PublicParams;

    fn by_id(db: &Connection, id: i32) -> FindModelResult<Self> {
        chapters::table
            .filter(chapters::id.eq(id))
            .get_result(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    fn from_db(data: db::Chapter) -> Self {
        Chapter { data }
    }

    fn into_db(self) -> db::Chapter {
        self.data
    }

    fn id(&self) -> i32 {
        self.data.id
    }

    /// Get public portion of this chapter's data. Content is only included
    /// for free chapters.
    fn get_public(&self) -> Public {
        let db::Chapter {
            id, book, author, ref title, ref content, published_at, created_at,
            updated_at, price,
        } = self.data;
        let locked = price > 0;

        Public {
            id,
            book,
            author,
            title: title.clone(),
            content: if locked { None } else { Some(content.clone()) },
            locked,
            state: self.state(Utc::now().naive_utc()),
            published_at: published_at.map(|d| DateTime::from_utc(d, Utc)),
            price,
            created_at: DateTime::from_utc(created_at, Utc),
            updated_at: DateTime::from_utc(updated_at, Utc),
        }
    }

    fn get_public_full(&self, db: &Connection, params: &PublicParams)
    -> Result<Public, DbError> {
        let mut public = self.get_public();

        if public.locked && self.can_access_content(db, params.viewer)? {
            public.content = Some(self.data.content.clone());
            public.locked = false;
        }

        Ok(public)
    }
}

impl Chapter {
    /// Create a new chapter.
    pub fn create(
        db: &Connection,
        author: &User,
        draft: &ChapterDraft,
        now: NaiveDateTime,
    ) -> Result<Chapter, SaveChapterError> {
        let title = check_draft(draft)?;

        let published_at = match (draft.book, draft.published_at) {
            (None, Some(_)) => return Err(SaveChapterError::NoBook),
            (_, publication) => publication.map(|p| p.resolve(now)).transpose()?,
        };

        db.transaction(|| {
            if let Some(book) = draft.book {
                check_book(db, book, author.id())?;
            }

            diesel::insert_into(chapters::table)
                .values(db::NewChapter {
                    book: draft.book,
                    author: author.id(),
                    title,
                    content: &draft.content,
                    published_at,
                    created_at: now,
                    updated_at: now,
                    price: draft.price.unwrap_or(0),
                })
                .execute(db)?;

            let id = diesel::select(last_insert_rowid).get_result::<i64>(db)?;
            let chapter = Chapter::by_id(db, id as i32).assert_exists()?;

            log::info!("User {} created chapter {} ({:?}) in book {:?}",
                author.id(), id, chapter.state(now), draft.book);

            Ok(chapter)
        })
    }

    /// Edit this chapter.
    ///
    /// Only chapter's author can edit it, and only until it's published.
    pub fn update(
        &mut self,
        db: &Connection,
        author: &User,
        draft: &ChapterDraft,
        now: NaiveDateTime,
    ) -> Result<(), SaveChapterError> {
        let title = check_draft(draft)?;
        self.check_editable(author, now)?;

        if draft.book.map_or(false, |book| Some(book) != self.data.book) {
            return Err(SaveChapterError::BookImmutable);
        }

        let published_at = match (self.data.book, draft.published_at) {
            (None, Some(_)) => return Err(SaveChapterError::NoBook),
            (_, publication) => publication.map(|p| p.resolve(now)).transpose()?,
        };

        db.transaction(|| {
            if let Some(book) = self.data.book {
                check_book(db, book, author.id())?;
            }

            diesel::update(&self.data)
                .set(db::ChapterChange {
                    title,
                    content: &draft.content,
                    published_at: published_at.map(Some),
                    price: draft.price,
                    updated_at: now,
                })
                .execute(db)?;

            self.reload(db)?;

            log::debug!("User {} edited chapter {}", author.id(), self.data.id);

            Ok(())
        })
    }

    /// Create a new chapter if `id` is `None`, or edit an existing one.
    pub fn create_or_update(
        db: &Connection,
        id: Option<i32>,
        author: &User,
        draft: &ChapterDraft,
        now: NaiveDateTime,
    ) -> Result<Chapter, SaveChapterError> {
        match id {
            None => Chapter::create(db, author, draft, now),
            Some(id) => {
                let mut chapter = Chapter::by_id(db, id)?;
                chapter.update(db, author, draft, now)?;
                Ok(chapter)
            }
        }
    }

    /// Change when this chapter will be published.
    ///
    /// `None` cancels publication, turning the chapter back into a draft.
    /// Chapters which are already published can't be rescheduled.
    pub fn reschedule(
        &mut self,
        db: &Connection,
        author: &User,
        publication: Option<Publication>,
        now: NaiveDateTime,
    ) -> Result<(), SaveChapterError> {
        self.check_editable(author, now)?;

        if self.data.book.is_none() && publication.is_some() {
            return Err(SaveChapterError::NoBook);
        }

        let published_at = publication.map(|p| p.resolve(now)).transpose()?;

        db.transaction(|| {
            if let Some(book) = self.data.book {
                check_book(db, book, author.id())?;
            }

            diesel::update(&self.data)
                .set((
                    chapters::published_at.eq(published_at),
                    chapters::updated_at.eq(now),
                ))
                .execute(db)?;

            self.reload(db)?;

            log::info!("Chapter {} rescheduled to {:?}", self.data.id, published_at);

            Ok(())
        })
    }

    /// Delete this chapter, which must not be published yet.
    pub fn delete_draft(self, db: &Connection, author: &User, now: NaiveDateTime)
    -> Result<(), DeleteChapterError> {
        if self.data.author != author.id() {
            return Err(DeleteChapterError::NotAuthor);
        }

        if self.state(now) == ChapterState::Live {
            return Err(DeleteChapterError::Live);
        }

        diesel::delete(&self.data).execute(db)?;

        log::info!("User {} deleted chapter {}", author.id(), self.data.id);

        Ok(())
    }

    /// Get chapters of a book which `viewer` can see, in publication order.
    pub fn by_book(
        db: &Connection,
        book: i32,
        viewer: i32,
        now: NaiveDateTime,
    ) -> Result<Vec<Chapter>, DbError> {
        let access = Access::resolve(db, book, viewer)?;

        chapters::table
            .filter(chapters::book.eq(book))
            .order((chapters::published_at.asc(), chapters::created_at.asc()))
            .get_results::<db::Chapter>(db)
            .map(|v| v.into_iter()
                .map(Self::from_db)
                .filter(|c| access.is_collaborator_or_owner()
                    || c.is_visible_without_role(viewer, now))
                .collect())
    }

    /// Get chapters an author is still working on.
    ///
    /// This includes drafts, scheduled chapters, and chapters published
    /// within the last `grace`.
    pub fn recent_drafts(
        db: &Connection,
        author: i32,
        grace: Duration,
        now: NaiveDateTime,
    ) -> Result<Vec<Chapter>, DbError> {
        chapters::table
            .filter(chapters::author.eq(author))
            .filter(chapters::published_at.is_null()
                .or(chapters::published_at.gt(now - grace)))
            .order(chapters::updated_at.desc())
            .get_results::<db::Chapter>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    pub fn state(&self, now: NaiveDateTime) -> ChapterState {
        ChapterState::of(self.data.published_at, now)
    }

    /// Can `viewer` see this chapter?
    ///
    /// Published chapters are visible to everyone. Drafts and scheduled
    /// chapters are visible to their author and authors of their book.
    pub fn is_visible_to(
        &self,
        lookup: &dyn RoleLookup,
        viewer: i32,
        now: NaiveDateTime,
    ) -> Result<bool, DbError> {
        if self.is_visible_without_role(viewer, now) {
            return Ok(true);
        }

        match self.data.book {
            Some(book) => Ok(Access::resolve(lookup, book, viewer)?
                .is_collaborator_or_owner()),
            None => Ok(false),
        }
    }

    /// Can `user` read this chapter's content?
    pub fn can_access_content(&self, db: &Connection, user: i32)
    -> Result<bool, DbError> {
        if self.data.author == user || self.data.price == 0 {
            return Ok(true);
        }

        Purchase::exists(db, self.data.id, user)
    }

    fn is_visible_without_role(&self, viewer: i32, now: NaiveDateTime) -> bool {
        self.data.author == viewer || self.state(now) == ChapterState::Live
    }

    fn check_editable(&self, author: &User, now: NaiveDateTime)
    -> Result<(), SaveChapterError> {
        if self.data.author != author.id() {
            return Err(SaveChapterError::NotAuthor);
        }

        if self.state(now) == ChapterState::Live {
            return Err(SaveChapterError::Live);
        }

        Ok(())
    }

    fn reload(&mut self, db: &Connection) -> Result<(), DbError> {
        self.data = chapters::table
            .filter(chapters::id.eq(self.data.id))
            .get_result(db)?;
        Ok(())
    }
}

impl std::ops::Deref for Chapter {
    type Target = db::Chapter;

    fn deref(&self) -> &db::Chapter {
        &self.data
    }
}

/// Validate fields of a draft which don't depend on the database. Returns
/// trimmed title.
fn check_draft(draft: &ChapterDraft) -> Result<&str, SaveChapterError> {
    let title = draft.title.trim();

    if title.is_empty() {
        return Err(SaveChapterError::EmptyTitle);
    }

    if draft.price.map_or(false, |price| price < 0) {
        return Err(SaveChapterError::NegativePrice);
    }

    Ok(title)
}

/// Check that `user` can write chapters in `book`.
fn check_book(db: &Connection, book: i32, user: i32)
-> Result<(), SaveChapterError> {
    let book = Book::by_id(db, book)?;

    Access::resolve(db, book.id(), user)?.require_author()?;

    if !lifecycle::accepts_chapters(book.status) {
        return Err(SaveChapterError::BookClosed(book.status));
    }

    Ok(())
}

#[derive(ApiError, Debug, Fail, From)]
pub enum SaveChapterError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    NoSuchChapter(#[cause] #[from] FindModelError<Chapter>),
    #[fail(display = "{}", _0)]
    NoSuchBook(#[cause] #[from] FindModelError<Book>),
    #[fail(display = "{}", _0)]
    Role(#[cause] #[from] RequireRoleError),
    #[api(code = "chapter:not-author", status = "FORBIDDEN")]
    #[fail(display = "Only chapter's author can modify it")]
    NotAuthor,
    #[api(code = "chapter:title:empty", status = "BAD_REQUEST")]
    #[fail(display = "Chapter's title can't be empty")]
    EmptyTitle,
    #[api(code = "chapter:price:negative", status = "BAD_REQUEST")]
    #[fail(display = "Chapter's price can't be negative")]
    NegativePrice,
    #[api(code = "chapter:book:required", status = "BAD_REQUEST")]
    #[fail(display = "Only chapters of a book can be published")]
    NoBook,
    #[api(code = "chapter:book:immutable", status = "BAD_REQUEST")]
    #[fail(display = "Chapters can't be moved to another book")]
    BookImmutable,
    #[api(code = "chapter:book:closed", status = "BAD_REQUEST")]
    #[fail(display = "Chapters can't be written in a book which is {}", _0)]
    BookClosed(crate::db::types::BookStatus),
    #[api(code = "chapter:schedule:past", status = "BAD_REQUEST")]
    #[fail(display = "Publication can't be scheduled in the past")]
    PastSchedule,
    #[api(code = "chapter:live", status = "BAD_REQUEST")]
    #[fail(display = "Published chapters can't be modified")]
    Live,
}

#[derive(ApiError, Debug, Fail, From)]
pub enum DeleteChapterError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[api(code = "chapter:not-author", status = "FORBIDDEN")]
    #[fail(display = "Only chapter's author can delete it")]
    NotAuthor,
    #[api(code = "chapter:live", status = "BAD_REQUEST")]
    #[fail(display = "Published chapters can't be deleted")]
    Live,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        Utc.ymd(2019, 11, 20).and_hms(h, m, 0).naive_utc()
    }

    fn draft(published_at: Option<Publication>, price: Option<i64>)
    -> ChapterDraft {
        ChapterDraft {
            title: "Chapter".into(),
            content: "Once upon a time".into(),
            book: Some(1),
            published_at,
            price,
        }
    }

    #[test]
    fn state_derives_from_publication_date() {
        let now = at(12, 0);

        assert_eq!(ChapterState::of(None, now), ChapterState::Draft);
        assert_eq!(ChapterState::of(Some(at(12, 1)), now), ChapterState::Scheduled);
        assert_eq!(ChapterState::of(Some(now), now), ChapterState::Live);
        assert_eq!(ChapterState::of(Some(at(11, 0)), now), ChapterState::Live);
    }

    #[test]
    fn publication_now_resolves_to_current_instant() {
        let now = at(12, 0);
        assert_eq!(Publication::Now.resolve(now).unwrap(), now);
    }

    #[test]
    fn publication_in_past_is_rejected() {
        let now = at(12, 0);
        let past = Publication::At(DateTime::from_utc(at(11, 59), Utc));

        match past.resolve(now) {
            Err(SaveChapterError::PastSchedule) => (),
            other => panic!("unexpected result: {:?}", other),
        }

        let future = Publication::At(DateTime::from_utc(at(13, 0), Utc));
        assert_eq!(future.resolve(now).unwrap(), at(13, 0));
    }

    #[test]
    fn parse_publication() {
        assert_eq!("now".parse::<Publication>().unwrap(), Publication::Now);
        assert_eq!(
            "2019-11-20T13:00:00+01:00".parse::<Publication>().unwrap(),
            Publication::At(DateTime::from_utc(at(12, 0), Utc)),
        );
        assert!("tomorrow".parse::<Publication>().is_err());
    }

    #[test]
    fn deserialize_draft() {
        let draft: ChapterDraft = serde_json::from_str(r#"{
            "title": "Prologue",
            "content": "...",
            "book": 3,
            "published_at": "now",
            "price": 10
        }"#).unwrap();

        assert_eq!(draft.book, Some(3));
        assert_eq!(draft.published_at, Some(Publication::Now));
        assert_eq!(draft.price, Some(10));

        let draft: ChapterDraft = serde_json::from_str(
            r#"{"title": "Notes", "content": ""}"#).unwrap();

        assert_eq!(draft.book, None);
        assert_eq!(draft.published_at, None);
    }

    #[test]
    fn draft_validation() {
        assert_eq!(check_draft(&draft(None, Some(0))).unwrap(), "Chapter");

        match check_draft(&draft(None, Some(-1))) {
            Err(SaveChapterError::NegativePrice) => (),
            other => panic!("unexpected result: {:?}", other),
        }

        let mut untitled = draft(None, None);
        untitled.title = "   ".into();

        match check_draft(&untitled) {
            Err(SaveChapterError::EmptyTitle) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
