use chrono::Utc;
use failure::Fallible;
use quire_models::{
    BookMember,
    BookStatus,
    Chapter,
    ChapterDraft,
    MemberStatus,
    Model,
    Publication,
    book::{DeleteBookError, MoveStateError},
};

mod common;

use common::*;

fn statuses(members: &[BookMember]) -> Vec<MemberStatus> {
    members.iter().map(BookMember::status).collect()
}

#[test]
fn leaving_initial_requires_no_pending_invites() -> Fallible<()> {
    let db = connection()?;
    let owner = user(&db, "alice")?;
    let bob = user(&db, "bob")?;
    befriend(&db, &owner, &bob)?;

    let mut book = book(&db, &owner, &[&bob])?;
    let access = book.access(&db, &owner)?;

    match book.move_state(&db, &access, BookStatus::Draft, false) {
        Err(MoveStateError::PendingInvites) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(book.status, BookStatus::Initial);
    assert_eq!(statuses(&book.members(&db)?),
        vec![MemberStatus::Owner, MemberStatus::Invitee]);

    book.move_state(&db, &access, BookStatus::Draft, true)?;

    assert_eq!(book.status, BookStatus::Draft);
    assert_eq!(statuses(&book.members(&db)?), vec![MemberStatus::Owner]);

    Ok(())
}

#[test]
fn accepted_invite_survives_leaving_initial() -> Fallible<()> {
    let db = connection()?;
    let alice = user(&db, "alice")?;
    let bob = user(&db, "bob")?;
    let carol = user(&db, "carol")?;
    befriend(&db, &alice, &bob)?;
    befriend(&db, &alice, &carol)?;

    let mut book = book(&db, &alice, &[&bob, &carol])?;

    let member = BookMember::respond(&db, &book.access(&db, &bob)?, true)?;
    assert_eq!(member.status(), MemberStatus::Collaborator);
    BookMember::respond(&db, &book.access(&db, &carol)?, false)?;

    let access = book.access(&db, &alice)?;
    book.move_state(&db, &access, BookStatus::Draft, false)?;

    let members = book.members(&db)?;
    assert_eq!(statuses(&members),
        vec![MemberStatus::Owner, MemberStatus::Collaborator]);
    assert_eq!(members[1].user().id(), bob.id());

    Ok(())
}

#[test]
fn only_owner_moves_book() -> Fallible<()> {
    let db = connection()?;
    let alice = user(&db, "alice")?;
    let bob = user(&db, "bob")?;
    befriend(&db, &alice, &bob)?;

    let mut book = book(&db, &alice, &[&bob])?;
    BookMember::respond(&db, &book.access(&db, &bob)?, true)?;

    let access = book.access(&db, &bob)?;

    match book.move_state(&db, &access, BookStatus::Draft, true) {
        Err(MoveStateError::Role(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(book.status, BookStatus::Initial);

    Ok(())
}

#[test]
fn illegal_transitions_are_rejected() -> Fallible<()> {
    let db = connection()?;
    let owner = user(&db, "alice")?;
    let mut book = book_in(&db, &owner, BookStatus::Draft)?;
    let access = book.access(&db, &owner)?;

    for &target in &[BookStatus::Initial, BookStatus::Draft, BookStatus::Archived] {
        match book.move_state(&db, &access, target, false) {
            Err(MoveStateError::IllegalTransition(err)) => {
                assert_eq!(err.from, BookStatus::Draft);
                assert_eq!(err.to, target);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    Ok(())
}

#[test]
fn archived_book_cannot_move() -> Fallible<()> {
    let db = connection()?;
    let owner = user(&db, "alice")?;
    let stranger = user(&db, "mallory")?;
    let mut book = book_in(&db, &owner, BookStatus::Archived)?;

    let owner_access = book.access(&db, &owner)?;
    let stranger_access = book.access(&db, &stranger)?;

    for &target in &[
        BookStatus::Initial,
        BookStatus::Draft,
        BookStatus::Published,
        BookStatus::Completed,
        BookStatus::Archived,
    ] {
        for &force in &[false, true] {
            assert!(book.move_state(&db, &owner_access, target, force).is_err());
            assert!(book.move_state(&db, &stranger_access, target, force).is_err());
        }
    }

    assert_eq!(book.status, BookStatus::Archived);

    Ok(())
}

#[test]
fn stale_status_is_a_conflict() -> Fallible<()> {
    let db = connection()?;
    let owner = user(&db, "alice")?;
    let mut first = book_in(&db, &owner, BookStatus::Draft)?;
    let mut second = quire_models::Book::by_id(&db, first.id())?;
    let access = first.access(&db, &owner)?;

    first.move_state(&db, &access, BookStatus::Published, false)?;

    match second.move_state(&db, &access, BookStatus::Completed, false) {
        Err(MoveStateError::ConcurrentChange) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    let book = quire_models::Book::by_id(&db, first.id())?;
    assert_eq!(book.status, BookStatus::Published);

    Ok(())
}

#[test]
fn delete_book() -> Fallible<()> {
    let db = connection()?;
    let owner = user(&db, "alice")?;
    let book = book_in(&db, &owner, BookStatus::Draft)?;
    let access = book.access(&db, &owner)?;
    let id = book.id();

    let draft = Chapter::create(&db, &owner, &ChapterDraft {
        title: "Draft".into(),
        content: "...".into(),
        book: Some(id),
        published_at: None,
        price: None,
    }, Utc::now().naive_utc())?;

    book.delete(&db, &access)?;

    assert!(quire_models::Book::by_id(&db, id).is_err());
    assert!(Chapter::by_id(&db, draft.id()).is_err());

    Ok(())
}

#[test]
fn book_with_live_chapters_cannot_be_deleted() -> Fallible<()> {
    let db = connection()?;
    let owner = user(&db, "alice")?;
    let book = book_in(&db, &owner, BookStatus::Draft)?;
    let access = book.access(&db, &owner)?;

    Chapter::create(&db, &owner, &ChapterDraft {
        title: "Live".into(),
        content: "...".into(),
        book: Some(book.id()),
        published_at: Some(Publication::Now),
        price: None,
    }, Utc::now().naive_utc())?;

    match book.delete(&db, &access) {
        Err(DeleteBookError::HasLiveChapters) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    Ok(())
}

#[test]
fn published_book_cannot_be_deleted() -> Fallible<()> {
    let db = connection()?;
    let owner = user(&db, "alice")?;
    let book = book_in(&db, &owner, BookStatus::Published)?;
    let access = book.access(&db, &owner)?;

    match book.delete(&db, &access) {
        Err(DeleteBookError::BadStatus(BookStatus::Published)) => (),
        other => panic!("unexpected result: {:?}", other),
    }

    Ok(())
}
