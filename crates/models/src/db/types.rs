use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Publication status of a book.
///
/// Legal moves between statuses are described by
/// [`crate::lifecycle::next_states`].
#[derive(Clone, Copy, DbEnum, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[DieselType = "Book_status"]
#[serde(rename_all = "kebab-case")]
pub enum BookStatus {
    /// Newly created book. Collaborators are being gathered and no chapters
    /// can be added yet.
    Initial,
    /// Authors are writing. Chapters can be added, and published ones are
    /// visible.
    Draft,
    /// The book has been announced; authors can still add chapters.
    Published,
    /// The book is finished. No more chapters can be added.
    Completed,
    /// The book is retired. This status is terminal.
    Archived,
}

impl fmt::Display for BookStatus {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            BookStatus::Initial => "initial",
            BookStatus::Draft => "draft",
            BookStatus::Published => "published",
            BookStatus::Completed => "completed",
            BookStatus::Archived => "archived",
        })
    }
}

/// Relation of a user to a book.
#[derive(Clone, Copy, DbEnum, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[DieselType = "Member_status"]
#[serde(rename_all = "kebab-case")]
pub enum MemberStatus {
    /// The user who created the book. Each book has exactly one.
    Owner,
    /// User who accepted an invitation and can write chapters.
    Collaborator,
    /// User invited by the owner, who has not yet responded.
    Invitee,
    /// User who declined an invitation.
    Rejected,
}

impl MemberStatus {
    /// Does this status allow writing chapters in a book?
    pub fn is_author(self) -> bool {
        match self {
            MemberStatus::Owner | MemberStatus::Collaborator => true,
            MemberStatus::Invitee | MemberStatus::Rejected => false,
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            MemberStatus::Owner => "owner",
            MemberStatus::Collaborator => "collaborator",
            MemberStatus::Invitee => "invitee",
            MemberStatus::Rejected => "rejected",
        })
    }
}
