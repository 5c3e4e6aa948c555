//! Tests for the PUT and GET/HEAD handlers.

use meerkat_db::db::store::ContactStore;
use salvo::http::StatusCode;
use salvo::test::ResponseExt;

use crate::test_support::{ALICE_CARD, TestApp};

const ALICE: &str = "/carddav/addressbooks/ann/contacts/alice.vcf";

fn etag(res: &salvo::Response) -> String {
    res.headers()
        .get("ETag")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[test_log::test(tokio::test)]
async fn put_creates_then_get_returns_the_card() {
    let app = TestApp::new().await;

    let res = app.put_card(ALICE, ALICE_CARD).await;
    assert_eq!(res.status_code, Some(StatusCode::CREATED));
    let created = etag(&res);
    assert!(created.starts_with('"') && created.ends_with('"'));
    assert_eq!(res.headers().get("Location").unwrap(), ALICE);

    let mut res = app.request("GET", ALICE).send(&app.service()).await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    assert_eq!(etag(&res), created);
    assert_eq!(
        res.headers().get("Content-Type").unwrap(),
        "text/vcard; charset=utf-8"
    );
    assert!(
        res.headers()
            .get("Last-Modified")
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with(" GMT")
    );
    let body = res.take_string().await.unwrap();
    assert!(body.starts_with("BEGIN:VCARD\r\nVERSION:4.0\r\n"));
    assert!(body.contains("UID:alice\r\n"));
    assert!(body.contains("alice@example.com"));
    assert!(body.contains("CATEGORIES:Friends"));
}

#[test_log::test(tokio::test)]
async fn head_sends_headers_only() {
    let app = TestApp::new().await;
    let created = etag(&app.put_card(ALICE, ALICE_CARD).await);

    let mut res = app.request("HEAD", ALICE).send(&app.service()).await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    assert_eq!(etag(&res), created);
    assert!(res.take_string().await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn update_honours_if_match() {
    let app = TestApp::new().await;
    let created = etag(&app.put_card(ALICE, ALICE_CARD).await);
    let renamed = ALICE_CARD.replace("Johnson;Alice", "Johnson;Alison");

    let res = app
        .request("PUT", ALICE)
        .add_header("Content-Type", "text/vcard", true)
        .add_header("If-Match", "\"stale\"", true)
        .body(renamed.clone())
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::PRECONDITION_FAILED));

    let res = app
        .request("PUT", ALICE)
        .add_header("Content-Type", "text/vcard", true)
        .add_header("If-Match", created.as_str(), true)
        .body(renamed)
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));
    assert_ne!(etag(&res), created);

    let stored = app
        .store
        .find_by_uid(app.ann.id, "alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.given_name.as_deref(), Some("Alison"));
    assert_eq!(format!("\"{}\"", stored.etag), etag(&res));
}

#[test_log::test(tokio::test)]
async fn if_none_match_star_only_creates() {
    let app = TestApp::new().await;
    let put = |path: &'static str| {
        app.request("PUT", path)
            .add_header("Content-Type", "text/x-vcard", true)
            .add_header("If-None-Match", "*", true)
            .body(ALICE_CARD.to_string())
    };

    let res = put(ALICE).send(&app.service()).await;
    assert_eq!(res.status_code, Some(StatusCode::CREATED));
    let res = put(ALICE).send(&app.service()).await;
    assert_eq!(res.status_code, Some(StatusCode::PRECONDITION_FAILED));
}

#[test_log::test(tokio::test)]
async fn get_answers_not_modified_for_current_etag() {
    let app = TestApp::new().await;
    let current = etag(&app.put_card(ALICE, ALICE_CARD).await);

    let mut res = app
        .request("GET", ALICE)
        .add_header("If-None-Match", current.as_str(), true)
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_MODIFIED));
    assert_eq!(etag(&res), current);
    assert!(res.take_string().await.unwrap().is_empty());

    let mut res = app
        .request("GET", ALICE)
        .add_header("If-None-Match", "\"stale\"", true)
        .send(&app.service())
        .await;
    assert_eq!(res.status_code.unwrap_or(StatusCode::OK), StatusCode::OK);
    assert!(res.take_string().await.unwrap().contains("BEGIN:VCARD"));
}

#[test_log::test(tokio::test)]
async fn put_with_matching_if_none_match_fails() {
    let app = TestApp::new().await;
    let current = etag(&app.put_card(ALICE, ALICE_CARD).await);
    let renamed = ALICE_CARD.replace("Johnson;Alice", "Johnson;Alison");
    let put = |tag: &str| {
        app.request("PUT", ALICE)
            .add_header("Content-Type", "text/vcard", true)
            .add_header("If-None-Match", tag, true)
            .body(renamed.clone())
    };

    let res = put(&format!("\"stale\", {current}"))
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::PRECONDITION_FAILED));
    let stored = app
        .store
        .find_by_uid(app.ann.id, "alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.given_name.as_deref(), Some("Alice"));

    let res = put("\"stale\"").send(&app.service()).await;
    assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));
}

#[test_log::test(tokio::test)]
async fn put_rejects_bad_requests() {
    let app = TestApp::new().await;

    let res = app
        .request("PUT", ALICE)
        .add_header("Content-Type", "text/plain", true)
        .body(ALICE_CARD.to_string())
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::UNSUPPORTED_MEDIA_TYPE));

    let res = app.put_card(ALICE, "hello").await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

    let res = app
        .put_card("/carddav/addressbooks/ann/contacts/", ALICE_CARD)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::METHOD_NOT_ALLOWED));

    let res = app
        .put_card("/carddav/addressbooks/bob/contacts/alice.vcf", ALICE_CARD)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));

    assert!(app.store.list_contacts(app.ann.id).await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn get_resolves_legacy_numeric_names() {
    let app = TestApp::new().await;
    app.put_card(ALICE, ALICE_CARD).await;
    let id = app
        .store
        .find_by_uid(app.ann.id, "alice")
        .await
        .unwrap()
        .unwrap()
        .id;

    let mut res = app
        .request("GET", &format!("/carddav/addressbooks/ann/contacts/{id}.vcf"))
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    assert!(res.take_string().await.unwrap().contains("UID:alice"));

    let res = app
        .request("GET", "/carddav/addressbooks/ann/contacts/nobody.vcf")
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

    let res = app
        .request("GET", "/carddav/addressbooks/ann/contacts/")
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::METHOD_NOT_ALLOWED));
}

#[test_log::test(tokio::test)]
async fn other_users_cannot_read() {
    let app = TestApp::new().await;
    app.put_card(ALICE, ALICE_CARD).await;

    let res = app
        .request_as("bob", "GET", ALICE)
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));

    let res = app
        .request_as("bob", "GET", "/carddav/addressbooks/bob/contacts/alice.vcf")
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));
}
