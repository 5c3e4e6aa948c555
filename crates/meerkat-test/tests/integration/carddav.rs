#![allow(clippy::unwrap_used, clippy::expect_used)]
//! `CardDAV` flows as a sync client drives them.

use salvo::http::StatusCode;

use super::helpers::*;

const PROPFIND_PRINCIPAL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:"><D:prop><D:current-user-principal/></D:prop></D:propfind>"#;

const PROPFIND_HOME_SET: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:" xmlns:CR="urn:ietf:params:xml:ns:carddav">
  <D:prop><CR:addressbook-home-set/></D:prop>
</D:propfind>"#;

const PROPFIND_ETAGS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:"><D:prop><D:resourcetype/><D:getetag/></D:prop></D:propfind>"#;

/// ## Summary
/// Two clients holding the same `ETag` race to update a card: exactly one
/// wins, the other is told its copy is stale.
#[test_log::test(tokio::test)]
async fn concurrent_updates_with_the_same_etag_conflict() {
    let server = TestServer::new().await;
    let path = card_path("ann", "alice");

    let created = TestRequest::put(&path)
        .vcard_body(&simple_vcard("alice", "Alice", "Johnson", "alice@example.com"))
        .send(&server.service)
        .await
        .assert_status(StatusCode::CREATED);
    let etag = created.etag();

    let first = TestRequest::put(&path)
        .if_match(&etag)
        .vcard_body(&simple_vcard("alice", "Alice", "Johnson", "alice@work.example"))
        .send(&server.service);
    let second = TestRequest::put(&path)
        .if_match(&etag)
        .vcard_body(&simple_vcard("alice", "Alice", "Johnson", "alice@home.example"))
        .send(&server.service);
    let (first, second) = tokio::join!(first, second);

    let mut statuses = [first.status, second.status];
    statuses.sort();
    assert_eq!(
        statuses,
        [StatusCode::NO_CONTENT, StatusCode::PRECONDITION_FAILED]
    );

    let winner = if first.status == StatusCode::NO_CONTENT {
        ("alice@work.example", first.etag())
    } else {
        ("alice@home.example", second.etag())
    };
    let stored = server.contact(&server.ann, "alice").await.unwrap();
    assert_eq!(stored.email.as_deref(), Some(winner.0));
    assert_eq!(format!("\"{}\"", stored.etag), winner.1);
}

/// ## Summary
/// Discovery from the well-known URL down to the card listing.
#[test_log::test(tokio::test)]
async fn client_discovers_and_syncs_the_address_book() {
    let server = TestServer::new().await;
    TestRequest::put(&card_path("ann", "alice"))
        .vcard_body(&simple_vcard("alice", "Alice", "Johnson", "alice@example.com"))
        .send(&server.service)
        .await
        .assert_status(StatusCode::CREATED);

    let redirect = TestRequest::get("/.well-known/carddav")
        .send(&server.service)
        .await
        .assert_status(StatusCode::PERMANENT_REDIRECT);
    let root = redirect.get_header("Location").unwrap().to_string();
    assert_eq!(root, "/carddav/");

    TestRequest::propfind(&root)
        .depth("0")
        .xml_body(PROPFIND_PRINCIPAL)
        .send(&server.service)
        .await
        .assert_status(StatusCode::MULTI_STATUS)
        .assert_body_contains("<D:href>/carddav/principals/ann/</D:href>");

    TestRequest::propfind("/carddav/principals/ann/")
        .depth("0")
        .xml_body(PROPFIND_HOME_SET)
        .send(&server.service)
        .await
        .assert_status(StatusCode::MULTI_STATUS)
        .assert_body_contains("<D:href>/carddav/addressbooks/ann/</D:href>");

    TestRequest::propfind("/carddav/addressbooks/ann/")
        .depth("1")
        .xml_body(PROPFIND_ETAGS)
        .send(&server.service)
        .await
        .assert_status(StatusCode::MULTI_STATUS)
        .assert_body_contains("<D:href>/carddav/addressbooks/ann/contacts/</D:href>")
        .assert_body_contains("<CR:addressbook/>");

    let listing = TestRequest::propfind("/carddav/addressbooks/ann/contacts/")
        .depth("1")
        .xml_body(PROPFIND_ETAGS)
        .send(&server.service)
        .await
        .assert_status(StatusCode::MULTI_STATUS)
        .assert_body_contains("<D:href>/carddav/addressbooks/ann/contacts/alice.vcf</D:href>");
    let stored = server.contact(&server.ann, "alice").await.unwrap();
    assert!(listing.body_string().contains(&stored.etag));

    TestRequest::get(&card_path("ann", "alice"))
        .send(&server.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("FN:Alice Johnson");
}

/// ## Summary
/// Address books are private: other users and anonymous clients get nothing.
#[test_log::test(tokio::test)]
async fn address_books_are_isolated_per_user() {
    let server = TestServer::new().await;
    TestRequest::put(&card_path("ann", "alice"))
        .vcard_body(&simple_vcard("alice", "Alice", "Johnson", "alice@example.com"))
        .send(&server.service)
        .await
        .assert_status(StatusCode::CREATED);

    TestRequest::get(&card_path("ann", "alice"))
        .user("bob")
        .send(&server.service)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    TestRequest::get(&card_path("ann", "alice"))
        .anonymous()
        .send(&server.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    TestRequest::propfind("/carddav/addressbooks/bob/contacts/")
        .user("bob")
        .depth("1")
        .send(&server.service)
        .await
        .assert_status(StatusCode::MULTI_STATUS)
        .assert_body_not_contains("alice.vcf");

    assert!(server.contacts(&server.bob).await.is_empty());
}

/// ## Summary
/// A deleted card disappears from listings and can be recreated.
#[test_log::test(tokio::test)]
async fn deleted_cards_leave_the_listing() {
    let server = TestServer::new().await;
    let path = card_path("ann", "alice");
    let card = simple_vcard("alice", "Alice", "Johnson", "alice@example.com");
    TestRequest::put(&path)
        .vcard_body(&card)
        .send(&server.service)
        .await
        .assert_status(StatusCode::CREATED);

    TestRequest::delete(&path)
        .send(&server.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    TestRequest::propfind("/carddav/addressbooks/ann/contacts/")
        .depth("1")
        .send(&server.service)
        .await
        .assert_status(StatusCode::MULTI_STATUS)
        .assert_body_not_contains("alice.vcf");

    TestRequest::put(&path)
        .vcard_body(&card)
        .send(&server.service)
        .await
        .assert_status(StatusCode::CREATED);
}
