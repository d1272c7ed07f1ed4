#![cfg(feature = "inmem-store")]

use msgboard::{
    models::{Id, Reply, Thread, REDACTED_TEXT},
    repo::{inmem::InMemRepo, RepoError},
};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use msgboard::repo::{ReplyRepo, ThreadRepo};

fn thread(board: &str) -> Thread {
    Thread::new(board, "OP body".into(), "$argon2id$stub".into())
}

fn reply(text: &str) -> Reply {
    Reply::new(text.into(), "$argon2id$stub".into())
}

#[tokio::test]
async fn thread_crud() {
    let r = InMemRepo::new();

    // starts empty
    assert!(r.recent_threads("general", 10).await.unwrap().is_empty());

    let t = r.insert_thread(thread("general")).await.unwrap();
    assert_eq!(r.get_thread("general", t.id).await.unwrap(), t);

    // a thread is only addressable through its own board
    assert!(matches!(r.get_thread("tech", t.id).await, Err(RepoError::NotFound)));

    r.report_thread("general", t.id).await.unwrap();
    assert!(r.get_thread("general", t.id).await.unwrap().reported);

    r.delete_thread("general", t.id).await.unwrap();
    assert!(matches!(r.delete_thread("general", t.id).await, Err(RepoError::NotFound)));
    assert!(matches!(r.report_thread("general", t.id).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn recent_threads_respects_limit_and_board() {
    let r = InMemRepo::new();
    for _ in 0..4 {
        r.insert_thread(thread("games")).await.unwrap();
    }
    r.insert_thread(thread("movies")).await.unwrap();

    assert_eq!(r.recent_threads("games", 3).await.unwrap().len(), 3);
    assert_eq!(r.recent_threads("games", 10).await.unwrap().len(), 4);
    assert_eq!(r.recent_threads("movies", 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn append_bumps_thread_with_reply() {
    let r = InMemRepo::new();
    let t = r.insert_thread(thread("general")).await.unwrap();

    let stored = r.append_reply("general", t.id, reply("Hi")).await.unwrap();
    let after = r.get_thread("general", t.id).await.unwrap();
    assert_eq!(after.replies, vec![stored.clone()]);
    assert_eq!(after.bumped_on, stored.created_on);
    assert!(after.bumped_on > t.bumped_on);

    assert_eq!(r.get_reply("general", t.id, stored.id).await.unwrap(), stored);
    assert!(matches!(r.append_reply("general", Id::new_v4(), reply("x")).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn reply_updates_are_positional() {
    let r = InMemRepo::new();
    let t = r.insert_thread(thread("general")).await.unwrap();
    let a = r.append_reply("general", t.id, reply("a")).await.unwrap();
    let b = r.append_reply("general", t.id, reply("b")).await.unwrap();

    r.report_reply("general", t.id, a.id).await.unwrap();
    r.redact_reply("general", t.id, b.id).await.unwrap();

    let after = r.get_thread("general", t.id).await.unwrap();
    assert_eq!(after.replies.len(), 2);
    assert!(after.replies[0].reported);
    assert_eq!(after.replies[0].text, "a");
    assert!(!after.replies[1].reported);
    assert_eq!(after.replies[1].text, REDACTED_TEXT);
    assert!(after.replies[1].is_redacted());

    let ghost = Id::new_v4();
    assert!(matches!(r.report_reply("general", t.id, ghost).await, Err(RepoError::NotFound)));
    assert!(matches!(r.redact_reply("general", t.id, ghost).await, Err(RepoError::NotFound)));
    assert!(matches!(r.get_reply("general", t.id, ghost).await, Err(RepoError::NotFound)));
}
