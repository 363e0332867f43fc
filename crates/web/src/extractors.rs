use actix_web::{FromRequest, HttpRequest, dev::Payload};
use failure::Fail;
use futures::future::{self, FutureResult};
use quire_error::{ApiError, Error};
use quire_models::db::{Connection, Pool, PooledConnection};
use std::ops::Deref;

/// A database connection taken out of the application's [`Pool`] for the
/// duration of a request.
pub struct Database(PooledConnection);

impl Database {
    pub(crate) fn get(req: &HttpRequest) -> Result<Database, Error> {
        let pool = req.app_data::<Pool>().ok_or(DatabasePoolMissing)?;
        Ok(Database(pool.get()?))
    }
}

impl FromRequest for Database {
    type Error = Error;
    type Future = FutureResult<Database, Error>;
    type Config = ();

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        future::result(Database::get(req))
    }
}

impl Deref for Database {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.0
    }
}

/// The application was built without a [`Pool`] in its data.
#[derive(ApiError, Debug, Fail)]
#[api(internal)]
#[fail(display = "no database pool registered with the application")]
pub struct DatabasePoolMissing;
