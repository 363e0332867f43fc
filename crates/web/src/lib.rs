//! Request plumbing shared by Quire's HTTP handlers.

mod extractors;
mod principal;
mod responders;

pub use self::{
    extractors::{Database, DatabasePoolMissing},
    principal::{PRINCIPAL_HEADER, Principal, SessionRequired},
    responders::Created,
};
