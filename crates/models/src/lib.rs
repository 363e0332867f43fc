//! Books, chapters, and the workflows around them.

#[macro_use] extern crate diesel;
#[macro_use] extern crate diesel_migrations;

mod config;

pub mod db;
pub mod lifecycle;
pub mod models;
pub mod permissions;

pub use self::{
    config::{ChapterConfig, Config},
    db::types::{BookStatus, MemberStatus},
    models::*,
    permissions::{Access, RoleLookup},
};
