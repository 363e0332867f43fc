use diesel::{
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
    schema::{categories, categories_on_books},
};
use super::{AssertExists, FindModelResult, Model};

/// A category books can be tagged with.
#[derive(Clone, Debug)]
pub struct Category {
    data: db::Category,
}

#[derive(Debug, Serialize)]
pub struct Public {
    id: i32,
    name: String,
}

impl Model for Category {
    const ERROR_CATEGORY: &'static str = "category";

    type Id = i32;
    type Database = db::Category;
    type Public = Public;
    type PublicParams = ();

    fn by_id(db: &Connection, id: i32) -> FindModelResult<Self> {
        categories::table
            .filter(categories::id.eq(id))
            .get_result(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    fn from_db(data: db::Category) -> Self {
        Category { data }
    }

    fn into_db(self) -> db::Category {
        self.data
    }

    fn id(&self) -> i32 {
        self.data.id
    }

    fn get_public(&self) -> Public {
        Public {
            id: self.data.id,
            name: self.data.name.clone(),
        }
    }
}

impl Category {
    pub fn all(db: &Connection) -> Result<Vec<Category>, DbError> {
        categories::table
            .order(categories::name.asc())
            .get_results::<db::Category>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Get categories a book is tagged with.
    pub fn by_book(db: &Connection, book: i32) -> Result<Vec<Category>, DbError> {
        categories::table
            .inner_join(categories_on_books::table)
            .filter(categories_on_books::book.eq(book))
            .select(categories::all_columns)
            .order(categories::name.asc())
            .get_results::<db::Category>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    pub fn create(db: &Connection, name: &str)
    -> Result<Category, CreateCategoryError> {
        let name = name.trim();

        if name.is_empty() {
            return Err(CreateCategoryError::EmptyName);
        }

        diesel::insert_into(categories::table)
            .values(db::NewCategory { name })
            .execute(db)
            .map_err(|err| match err {
                DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) =>
                    CreateCategoryError::Duplicate,
                err => CreateCategoryError::Database(err),
            })?;

        let id = diesel::select(last_insert_rowid).get_result::<i64>(db)?;

        Ok(Category::by_id(db, id as i32).assert_exists()?)
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum CreateCategoryError {
    #[api(internal)]
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] DbError),
    #[api(code = "category:name:empty", status = "BAD_REQUEST")]
    #[fail(display = "Category name can't be empty")]
    EmptyName,
    #[api(code = "category:name:taken", status = "CONFLICT")]
    #[fail(display = "Category with this name already exists")]
    Duplicate,
}
