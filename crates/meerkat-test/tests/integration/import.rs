#![allow(clippy::unwrap_used, clippy::expect_used)]
//! The upload, preview and confirm import flow.

use std::time::Duration;

use salvo::http::StatusCode;
use serde_json::json;

use super::helpers::*;

const GOOGLE_CSV: &str = "Given Name,Family Name,E-mail 1 - Value,Phone 1 - Value,Groups\n\
Alison,Johnson,ALICE@example.com,+1 555 0100,Friends\n\
Erin,Stone,erin@example.com,,Work\n";

async fn upload_csv(server: &TestServer, user: &str, csv: &str) -> serde_json::Value {
    TestRequest::post("/import/csv")
        .user(user)
        .file_body("contacts.csv", csv.as_bytes())
        .send(&server.service)
        .await
        .assert_status(StatusCode::OK)
        .json()
}

/// ## Summary
/// A CSV row whose email matches an existing contact (ignoring case) is
/// flagged as a duplicate and merged on update, leaving a note.
#[test_log::test(tokio::test)]
async fn csv_duplicates_are_detected_by_email_and_merged() {
    let server = TestServer::new().await;
    TestRequest::put(&card_path("ann", "alice"))
        .vcard_body(&simple_vcard("alice", "Alice", "Johnson", "alice@example.com"))
        .send(&server.service)
        .await
        .assert_status(StatusCode::CREATED);

    let upload = upload_csv(&server, "ann", GOOGLE_CSV).await;
    assert_eq!(upload["row_count"], 2);
    let session_id = upload["session_id"].as_str().unwrap().to_string();

    let preview = TestRequest::post("/import/csv/preview")
        .json_body(&json!({
            "session_id": session_id,
            "mappings": upload["suggested_mappings"],
        }))
        .send(&server.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(preview["duplicate_count"], 1);
    let duplicate = &preview["rows"][0]["duplicate_match"];
    assert_eq!(duplicate["match_reason"], "email");
    assert_eq!(duplicate["email"], "alice@example.com");
    assert_eq!(preview["rows"][0]["suggested_action"], "update");
    assert!(preview["rows"][1]["duplicate_match"].is_null());

    let result = TestRequest::post("/import/csv/confirm")
        .json_body(&json!({
            "session_id": session_id,
            "actions": [
                { "row_index": 0, "action": "update" },
                { "row_index": 1, "action": "add" },
            ],
        }))
        .send(&server.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(result["total_processed"], 2);
    assert_eq!(result["created"], 1);
    assert_eq!(result["updated"], 1);

    let alice = server.contact(&server.ann, "alice").await.unwrap();
    assert_eq!(alice.given_name.as_deref(), Some("Alison"));
    assert_eq!(alice.phone.as_deref(), Some("+1 555 0100"));
    assert_eq!(alice.circles, vec!["Friends"]);
    let notes = server
        .store
        .list_notes(server.ann.id, alice.id)
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].content.starts_with("Updated via CSV import:"));
    assert!(
        notes[0]
            .content
            .lines()
            .any(|line| line == "- First Name: Alice → Alison")
    );
    assert_eq!(server.contacts(&server.ann).await.len(), 2);

    // The merged card is what sync clients see next.
    TestRequest::get(&card_path("ann", "alice"))
        .send(&server.service)
        .await
        .assert_body_contains("+1 555 0100");
}

/// ## Summary
/// Importing a VCF whose PHOTO points at an internal address creates the
/// contact without fetching anything.
#[test_log::test(tokio::test)]
async fn vcf_import_refuses_internal_photo_urls() {
    let server = TestServer::new().await;
    let vcf = "BEGIN:VCARD\r\nVERSION:3.0\r\nUID:imported\r\nFN:Ivy Green\r\nN:Green;Ivy;;;\r\n\
               PHOTO;VALUE=uri:http://169.254.169.254/latest/meta-data/iam\r\nEND:VCARD\r\n";

    let preview = TestRequest::post("/import/vcf")
        .file_body("contacts.vcf", vcf.as_bytes())
        .send(&server.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(preview["total_rows"], 1);
    assert_eq!(preview["rows"][0]["suggested_action"], "add");

    let result = TestRequest::post("/import/vcf/confirm")
        .json_body(&json!({
            "session_id": preview["session_id"],
            "actions": [{ "row_index": 0, "action": "add" }],
        }))
        .send(&server.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(result["created"], 1);

    let contact = server.contact(&server.ann, "imported").await.unwrap();
    assert_eq!(contact.given_name.as_deref(), Some("Ivy"));
    assert!(contact.photo.is_none());
    assert!(server.photo_files().is_empty());
}

/// ## Summary
/// One user cannot preview, confirm or even detect another user's session.
#[test_log::test(tokio::test)]
async fn sessions_are_isolated_between_users() {
    let server = TestServer::new().await;
    let upload = upload_csv(&server, "ann", GOOGLE_CSV).await;
    let session_id = upload["session_id"].as_str().unwrap().to_string();

    let foreign = TestRequest::post("/import/csv/preview")
        .user("bob")
        .json_body(&json!({
            "session_id": session_id,
            "mappings": upload["suggested_mappings"],
        }))
        .send(&server.service)
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .json();
    let unknown = TestRequest::post("/import/csv/preview")
        .user("bob")
        .json_body(&json!({
            "session_id": "0123456789abcdef0123456789abcdef",
            "mappings": upload["suggested_mappings"],
        }))
        .send(&server.service)
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .json();
    assert_eq!(foreign, unknown);

    TestRequest::post("/import/csv/confirm")
        .user("bob")
        .json_body(&json!({ "session_id": session_id, "actions": [] }))
        .send(&server.service)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Still intact for its owner.
    TestRequest::post("/import/csv/preview")
        .json_body(&json!({
            "session_id": session_id,
            "mappings": upload["suggested_mappings"],
        }))
        .send(&server.service)
        .await
        .assert_status(StatusCode::OK);
    assert!(server.contacts(&server.bob).await.is_empty());
}

/// ## Summary
/// A session confirmed after its time-to-live is gone, and is dropped from
/// the store.
#[test_log::test(tokio::test)]
async fn sessions_expire() {
    let server = TestServer::new().await;
    let ttl = Duration::from_secs(server.settings.import.session_ttl_secs);
    let upload = upload_csv(&server, "ann", GOOGLE_CSV).await;
    let session_id = upload["session_id"].as_str().unwrap().to_string();

    TestRequest::post("/import/csv/preview")
        .json_body(&json!({
            "session_id": session_id,
            "mappings": upload["suggested_mappings"],
        }))
        .send(&server.service)
        .await
        .assert_status(StatusCode::OK);

    tokio::time::pause();
    tokio::time::advance(ttl + Duration::from_secs(1)).await;

    TestRequest::post("/import/csv/confirm")
        .json_body(&json!({
            "session_id": session_id,
            "actions": [{ "row_index": 1, "action": "add" }],
        }))
        .send(&server.service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert!(server.sessions.is_empty().await);
    assert!(server.contacts(&server.ann).await.is_empty());
}

/// ## Summary
/// Imports require an authenticated user.
#[test_log::test(tokio::test)]
async fn import_requires_authentication() {
    let server = TestServer::new().await;
    TestRequest::post("/import/csv")
        .anonymous()
        .file_body("contacts.csv", GOOGLE_CSV.as_bytes())
        .send(&server.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
