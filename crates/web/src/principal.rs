//! Identification of the user making a request.
//!
//! Users are authenticated by an identity gateway in front of this server,
//! which passes the authenticated user's ID in the [`PRINCIPAL_HEADER`]
//! header. The value is trusted as-is.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use failure::Fail;
use futures::future::{self, FutureResult};
use quire_error::{ApiError, Error};
use quire_models::{FindModelError, Model, User};
use std::ops::Deref;

use crate::Database;

/// Name of the header carrying the authenticated user's ID.
pub const PRINCIPAL_HEADER: &str = "X-Principal-Id";

/// The user making a request.
///
/// Requests without a valid principal are rejected with
/// [`SessionRequired`].
pub struct Principal {
    user: User,
}

impl Principal {
    pub fn into_inner(self) -> User {
        self.user
    }

    fn load(req: &HttpRequest) -> Result<Principal, Error> {
        let id = req.headers()
            .get(PRINCIPAL_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i32>().ok())
            .ok_or(SessionRequired)?;

        let db = Database::get(req)?;

        match User::by_id(&*db, id) {
            Ok(user) => Ok(Principal { user }),
            Err(FindModelError::NotFound(_)) => {
                log::debug!("Principal {} does not exist", id);
                Err(SessionRequired.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl FromRequest for Principal {
    type Error = Error;
    type Future = FutureResult<Principal, Error>;
    type Config = ();

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        future::result(Principal::load(req))
    }
}

impl Deref for Principal {
    type Target = User;

    fn deref(&self) -> &User {
        &self.user
    }
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "user:session:required", status = "UNAUTHORIZED")]
#[fail(display = "Request must identify a user")]
pub struct SessionRequired;
