//! Tests for DELETE, MKCOL, OPTIONS and discovery.

use salvo::http::StatusCode;

use crate::test_support::{ALICE_CARD, TestApp};

const ALICE: &str = "/carddav/addressbooks/ann/contacts/alice.vcf";

#[test_log::test(tokio::test)]
async fn delete_removes_the_object() {
    let app = TestApp::new().await;
    let created = app.put_card(ALICE, ALICE_CARD).await;
    let etag = created.headers().get("ETag").unwrap().to_str().unwrap().to_string();

    let res = app
        .request("DELETE", ALICE)
        .add_header("If-Match", "\"stale\"", true)
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::PRECONDITION_FAILED));

    let res = app
        .request("DELETE", ALICE)
        .add_header("If-Match", etag.as_str(), true)
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));

    let res = app.request("GET", ALICE).send(&app.service()).await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

    let res = app.request("DELETE", ALICE).send(&app.service()).await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));
}

#[test_log::test(tokio::test)]
async fn collections_cannot_be_deleted_or_created() {
    let app = TestApp::new().await;

    let res = app
        .request("DELETE", "/carddav/addressbooks/ann/contacts/")
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_IMPLEMENTED));

    let res = app
        .request("DELETE", "/carddav/principals/ann/")
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::METHOD_NOT_ALLOWED));

    let res = app
        .request("MKCOL", "/carddav/addressbooks/ann/")
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_IMPLEMENTED));
}

#[test_log::test(tokio::test)]
async fn options_advertises_addressbook_support() {
    let app = TestApp::new().await;

    let res = app
        .request("OPTIONS", "/carddav/addressbooks/ann/contacts/")
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let dav = res.headers().get("DAV").unwrap().to_str().unwrap();
    assert!(dav.contains("addressbook"));
    let allow = res.headers().get("Allow").unwrap().to_str().unwrap();
    assert!(allow.contains("PROPFIND"));
    assert!(allow.contains("REPORT"));
}

#[test_log::test(tokio::test)]
async fn well_known_redirects_to_the_root() {
    let app = TestApp::new().await;

    let res = app
        .request("GET", "/.well-known/carddav")
        .send(&app.service())
        .await;
    assert_eq!(res.status_code, Some(StatusCode::PERMANENT_REDIRECT));
    assert_eq!(res.headers().get("Location").unwrap(), "/carddav/");
}
