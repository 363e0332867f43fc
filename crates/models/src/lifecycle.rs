//! Book status transitions.
//!
//! ```text
//! initial   -> draft
//! draft     -> published | completed
//! published -> completed | archived
//! completed -> archived
//! archived  -> (none)
//! ```

use failure::Fail;
use quire_error::ApiError;
use std::fmt;

use crate::db::types::BookStatus;

/// Statuses a book in status `from` can be moved to.
pub fn next_states(from: BookStatus) -> &'static [BookStatus] {
    use BookStatus::*;

    match from {
        Initial => &[Draft],
        Draft => &[Published, Completed],
        Published => &[Completed, Archived],
        Completed => &[Archived],
        Archived => &[],
    }
}

/// Check whether a book can be moved from `from` to `to`.
pub fn check_transition(from: BookStatus, to: BookStatus)
-> Result<(), IllegalTransition> {
    if next_states(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// Can chapters be added to, or edited in, a book in this status?
pub fn accepts_chapters(status: BookStatus) -> bool {
    match status {
        BookStatus::Draft | BookStatus::Published => true,
        _ => false,
    }
}

/// Can a book in this status be deleted?
pub fn can_delete(status: BookStatus) -> bool {
    match status {
        BookStatus::Initial | BookStatus::Draft => true,
        _ => false,
    }
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "book:status:illegal-transition", status = "BAD_REQUEST")]
pub struct IllegalTransition {
    pub from: BookStatus,
    pub to: BookStatus,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Book can't be moved from {} to {}", self.from, self.to)?;

        let next = next_states(self.from);

        if next.is_empty() {
            return write!(fmt, ": {} is final", self.from);
        }

        fmt.write_str(", it can only be moved to ")?;

        for (inx, status) in next.iter().enumerate() {
            if inx > 0 {
                fmt.write_str(" or ")?;
            }
            write!(fmt, "{}", status)?;
        }

        Ok(())
    }
}
