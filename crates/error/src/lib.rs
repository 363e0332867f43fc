//! Errors reported by Quire's API.
//!
//! Every user-facing failure implements [`ApiError`], which gives it an HTTP
//! status and a stable code such as `book:invite:not-mutual`. Handlers return
//! [`Error`], into which both API errors and infrastructure failures convert.

use actix_web::{HttpResponse, ResponseError};
use failure::Fail;
use quire_macros::From;
use serde::Serialize;
use std::borrow::Cow;

pub use actix_web::http::StatusCode;
pub use quire_macros::ApiError;

/// A failure which can be reported to an API client.
pub trait ApiError: Fail {
    /// Status class: `FORBIDDEN` for a missing role, `BAD_REQUEST` for
    /// rejected input, `CONFLICT` for state conflicts, `PAYMENT_REQUIRED` for
    /// insufficient balance, `NOT_FOUND` for missing records.
    fn status(&self) -> StatusCode;

    /// Stable code identifying this failure, or `None` for internal errors
    /// whose details must not leave the server.
    fn code(&self) -> Option<Cow<str>>;
}

// Lets `Error::Api` mark its box as `#[cause]`.
impl Fail for Box<dyn ApiError> {
    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    fn cause(&self) -> Option<&dyn Fail> {
        (**self).cause()
    }

    fn backtrace(&self) -> Option<&failure::Backtrace> {
        (**self).backtrace()
    }
}

/// Error returned from request handlers.
#[derive(Debug, Fail, From)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Api(#[cause] Box<dyn ApiError>),
    /// Query failed. Missing records should be turned into an [`ApiError`]
    /// before they get here, otherwise they are reported as internal errors.
    #[fail(display = "{}", _0)]
    Db(#[cause] #[from] diesel::result::Error),
    /// No connection could be taken out of the pool.
    #[fail(display = "{}", _0)]
    DbPool(#[cause] #[from] r2d2::Error),
    #[fail(display = "{}", _0)]
    UrlGeneration(#[from] actix_web::error::UrlGenerationError),
}

impl<T: ApiError> From<T> for Error {
    fn from(error: T) -> Error {
        Error::Api(Box::new(error))
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Api(err) => err.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> Option<Cow<str>> {
        match self {
            Error::Api(err) => err.code(),
            _ => None,
        }
    }
}

/// Body of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody<'s> {
    error: Cow<'s, str>,
    raw: String,
}

impl ResponseError for Error {
    fn error_response(&self) -> HttpResponse {
        match self.code() {
            Some(code) => HttpResponse::build(self.status())
                .json(ErrorBody {
                    error: code,
                    raw: self.to_string(),
                }),
            None => {
                log::error!("{}", self);
                HttpResponse::new(self.status())
            }
        }
    }

    fn render_response(&self) -> HttpResponse {
        self.error_response()
    }
}
