#![cfg(feature = "inmem-store")]

use actix_web::{test, web, App};
use msgboard::credential::CredentialCodec;
use msgboard::models::{BoardList, REDACTED_TEXT};
use msgboard::repo::inmem::InMemRepo;
use msgboard::routes::{config, AppState};
use msgboard::BoardStore;
use serde_json::Value;
use std::sync::Arc;

fn state() -> web::Data<AppState> {
    let store = BoardStore::new(Arc::new(InMemRepo::new()), BoardList::default(), CredentialCodec::insecure_fast());
    web::Data::new(AppState { store })
}

fn text(body: &[u8]) -> &str {
    std::str::from_utf8(body).unwrap()
}

#[actix_web::test]
async fn test_thread_reply_moderation_flow() {
    let app = test::init_service(App::new().app_data(state()).configure(config)).await;

    // create thread (form body, as the board's HTML forms send it)
    let req = test::TestRequest::post()
        .uri("/api/threads/testaroo")
        .set_form([("text", "This is a post"), ("delete_password", "some-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.headers().get("location").unwrap(), "/b/testaroo/");

    // list threads
    let req = test::TestRequest::get().uri("/api/threads/testaroo").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let threads: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let threads = threads.as_array().unwrap();
    assert_eq!(threads.len(), 1);
    let thread = &threads[0];
    assert_eq!(thread["text"], "This is a post");
    assert_eq!(thread["replycount"], 0);
    assert_eq!(thread["replies"].as_array().unwrap().len(), 0);
    assert!(thread.get("reported").is_none());
    assert!(thread.get("delete_password_hash").is_none());
    let thread_id = thread["_id"].as_str().unwrap().to_string();

    // reply
    let req = test::TestRequest::post()
        .uri("/api/replies/testaroo")
        .set_form([("thread_id", thread_id.as_str()), ("text", "a reply"), ("delete_password", "reply-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.headers().get("location").unwrap().to_str().unwrap(), format!("/b/testaroo/{thread_id}"));

    // thread view
    let req = test::TestRequest::get()
        .uri(&format!("/api/replies/testaroo?thread_id={thread_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let detail: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(detail["_id"], thread_id.as_str());
    let replies = detail["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["text"], "a reply");
    assert!(replies[0].get("reported").is_none());
    assert!(replies[0].get("delete_password_hash").is_none());
    let reply_id = replies[0]["_id"].as_str().unwrap().to_string();

    // report reply
    let req = test::TestRequest::put()
        .uri("/api/replies/testaroo")
        .set_form([("thread_id", thread_id.as_str()), ("reply_id", reply_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(text(&test::read_body(resp).await), "Reply has been reported.");

    // delete reply with the thread's password is refused
    let req = test::TestRequest::delete()
        .uri("/api/replies/testaroo")
        .set_form([("thread_id", thread_id.as_str()), ("reply_id", reply_id.as_str()), ("delete_password", "some-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(body["error"], "Incorrect password supplied for deletion.");

    // delete reply with its own password
    let req = test::TestRequest::delete()
        .uri("/api/replies/testaroo")
        .set_form([("thread_id", thread_id.as_str()), ("reply_id", reply_id.as_str()), ("delete_password", "reply-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(text(&test::read_body(resp).await), "Delete successful.");

    let req = test::TestRequest::get()
        .uri(&format!("/api/replies/testaroo?thread_id={thread_id}"))
        .to_request();
    let detail: Value = serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await).unwrap();
    assert_eq!(detail["replies"].as_array().unwrap().len(), 1);
    assert_eq!(detail["replies"][0]["text"], REDACTED_TEXT);

    // report thread
    let req = test::TestRequest::put()
        .uri("/api/threads/testaroo")
        .set_form([("report_id", thread_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(text(&test::read_body(resp).await), "Thread has been reported.");

    // delete thread: wrong password, then right one
    let req = test::TestRequest::delete()
        .uri("/api/threads/testaroo")
        .set_form([("thread_id", thread_id.as_str()), ("delete_password", "nope")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let req = test::TestRequest::delete()
        .uri("/api/threads/testaroo")
        .set_form([("thread_id", thread_id.as_str()), ("delete_password", "some-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(text(&test::read_body(resp).await), "Delete successful.");

    let req = test::TestRequest::get()
        .uri(&format!("/api/replies/testaroo?thread_id={thread_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_json_bodies_are_accepted() {
    let app = test::init_service(App::new().app_data(state()).configure(config)).await;

    let req = test::TestRequest::post()
        .uri("/api/threads/general")
        .set_json(serde_json::json!({"text": "json thread", "delete_password": "pw"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);

    let req = test::TestRequest::get().uri("/api/threads/general").to_request();
    let threads: Value = serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await).unwrap();
    let thread_id = threads[0]["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri("/api/threads/general")
        .set_json(serde_json::json!({"thread_id": thread_id}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_summary_shows_latest_three_replies() {
    let app = test::init_service(App::new().app_data(state()).configure(config)).await;

    let req = test::TestRequest::post()
        .uri("/api/threads/tech")
        .set_form([("text", "op"), ("delete_password", "pw")])
        .to_request();
    test::call_service(&app, req).await;
    let req = test::TestRequest::get().uri("/api/threads/tech").to_request();
    let threads: Value = serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await).unwrap();
    let thread_id = threads[0]["_id"].as_str().unwrap().to_string();

    for i in 0..5 {
        let reply_text = format!("reply {i}");
        let req = test::TestRequest::post()
            .uri("/api/replies/tech")
            .set_form([("thread_id", thread_id.as_str()), ("text", reply_text.as_str()), ("delete_password", "pw")])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 302);
    }

    let req = test::TestRequest::get().uri("/api/threads/tech").to_request();
    let threads: Value = serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await).unwrap();
    assert_eq!(threads[0]["replycount"], 5);
    let shown: Vec<&str> = threads[0]["replies"].as_array().unwrap().iter().map(|r| r["text"].as_str().unwrap()).collect();
    assert_eq!(shown, ["reply 2", "reply 3", "reply 4"]);
}

#[actix_web::test]
async fn test_error_outcomes_are_distinguishable() {
    let app = test::init_service(App::new().app_data(state()).configure(config)).await;

    // unknown board
    let req = test::TestRequest::get().uri("/api/threads/cooking").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(body["error"], "Board requested is invalid.");

    // missing password
    let req = test::TestRequest::post()
        .uri("/api/threads/general")
        .set_form([("text", "no password")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // malformed and unknown thread ids
    let req = test::TestRequest::get().uri("/api/replies/general?thread_id=abc").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::get().uri("/api/replies/general").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::put()
        .uri("/api/threads/general")
        .set_form([("report_id", uuid::Uuid::new_v4().to_string())])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn test_board_and_body_are_checked_before_ids() {
    let app = test::init_service(App::new().app_data(state()).configure(config)).await;

    // unknown board wins over a malformed id
    let req = test::TestRequest::put()
        .uri("/api/threads/cooking")
        .set_form([("report_id", "abc")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(body["error"], "Board requested is invalid.");

    let req = test::TestRequest::delete()
        .uri("/api/replies/cooking")
        .set_form([("thread_id", "abc"), ("reply_id", ""), ("delete_password", "pw")])
        .to_request();
    let body: Value = serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await).unwrap();
    assert_eq!(body["error"], "Board requested is invalid.");

    // missing reply text wins over a missing thread id
    let req = test::TestRequest::post()
        .uri("/api/replies/general")
        .set_form([("text", ""), ("delete_password", "pw")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // missing password wins over a malformed thread id
    let req = test::TestRequest::post()
        .uri("/api/replies/general")
        .set_form([("thread_id", "abc"), ("text", "hi")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // a well-formed request with a bad id is still NotFound
    let req = test::TestRequest::post()
        .uri("/api/replies/general")
        .set_form([("thread_id", "abc"), ("text", "hi"), ("delete_password", "pw")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_ne!(body["error"], "Board requested is invalid.");
}
