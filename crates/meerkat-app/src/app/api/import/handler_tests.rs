//! Tests for the import endpoints.

use meerkat_db::db::store::ContactStore;
use salvo::http::StatusCode;
use salvo::test::{RequestBuilder, ResponseExt};
use serde_json::{Value, json};

use crate::test_support::{ALICE_CARD, TestApp};

const BOUNDARY: &str = "meerkat-test-boundary";

const CSV: &str = "First Name,Last Name,E-mail Address,Groups\n\
Alice,Johnson,alice@example.com,Family\n\
Carol,White,carol@example.com,Work;Book Club\n";

fn with_file(req: RequestBuilder, filename: &str, content: &str) -> RequestBuilder {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
    );
    req.add_header(
        "Content-Type",
        format!("multipart/form-data; boundary={BOUNDARY}"),
        true,
    )
    .body(body)
}

async fn send(app: &TestApp, req: RequestBuilder) -> (StatusCode, Value) {
    let mut res = req.send(&app.service()).await;
    let status = res.status_code.unwrap_or(StatusCode::OK);
    let body = res.take_string().await.unwrap();
    (status, serde_json::from_str(&body).unwrap())
}

async fn post_json(app: &TestApp, user: &str, path: &str, body: &Value) -> (StatusCode, Value) {
    let req = app
        .request_as(user, "POST", path)
        .add_header("Content-Type", "application/json", true)
        .body(body.to_string());
    send(app, req).await
}

#[test_log::test(tokio::test)]
async fn csv_import_runs_through_all_three_steps() {
    let app = TestApp::new().await;
    app.put_card("/carddav/addressbooks/ann/contacts/alice.vcf", ALICE_CARD)
        .await;

    let req = with_file(app.request("POST", "/import/csv"), "people.csv", CSV);
    let (status, upload) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upload["row_count"], 2);
    assert_eq!(upload["headers"][2], "E-mail Address");
    assert_eq!(upload["sample_data"][1][0], "Carol");
    let session_id = upload["session_id"].as_str().unwrap().to_string();
    let mappings = upload["suggested_mappings"].clone();
    assert!(
        mappings
            .as_array()
            .unwrap()
            .iter()
            .any(|m| m["column_index"] == 2 && m["field"] == "email")
    );

    let (status, preview) = post_json(
        &app,
        "ann",
        "/import/csv/preview",
        &json!({ "session_id": session_id, "mappings": mappings }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["total_rows"], 2);
    assert_eq!(preview["duplicate_count"], 1);
    assert_eq!(preview["rows"][0]["duplicate_match"]["match_reason"], "email");
    assert_eq!(preview["rows"][0]["suggested_action"], "update");
    assert_eq!(preview["rows"][1]["suggested_action"], "add");

    let (status, result) = post_json(
        &app,
        "ann",
        "/import/csv/confirm",
        &json!({
            "session_id": session_id,
            "actions": [
                { "row_index": 0, "action": "update" },
                { "row_index": 1, "action": "add" },
            ],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["created"], 1);
    assert_eq!(result["updated"], 1);
    assert_eq!(result["skipped"], 0);

    let alice = app
        .store
        .find_by_uid(app.ann.id, "alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alice.circles, vec!["Friends", "Family"]);
    let carol = app
        .store
        .find_by_email(app.ann.id, "carol@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(carol.circles, vec!["Work", "Book Club"]);

    // The session is closed once confirmed.
    let (status, _) = post_json(
        &app,
        "ann",
        "/import/csv/confirm",
        &json!({ "session_id": session_id, "actions": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn vcf_upload_previews_immediately() {
    let app = TestApp::new().await;
    let vcf = format!(
        "{ALICE_CARD}BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Dave Brown\r\nN:Brown;Dave;;;\r\nEND:VCARD\r\n"
    );

    let req = with_file(app.request("POST", "/import/vcf"), "export.vcf", &vcf);
    let (status, preview) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["total_rows"], 2);
    assert_eq!(preview["error_count"], 0);
    assert_eq!(preview["rows"][1]["parsed_contact"]["firstname"], "Dave");
    let session_id = preview["session_id"].as_str().unwrap();

    let (status, result) = post_json(
        &app,
        "ann",
        "/import/vcf/confirm",
        &json!({
            "session_id": session_id,
            "actions": [{ "row_index": 1, "action": "add" }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["created"], 1);
    assert_eq!(result["skipped"], 1);
    assert_eq!(app.store.list_contacts(app.ann.id).await.unwrap().len(), 1);
}

#[test_log::test(tokio::test)]
async fn sessions_belong_to_their_uploader() {
    let app = TestApp::new().await;
    let req = with_file(app.request("POST", "/import/csv"), "people.csv", CSV);
    let (_, upload) = send(&app, req).await;
    let session_id = upload["session_id"].as_str().unwrap();

    let (status, body) = post_json(
        &app,
        "bob",
        "/import/csv/preview",
        &json!({ "session_id": session_id, "mappings": upload["suggested_mappings"] }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("import session"));
}

#[test_log::test(tokio::test)]
async fn bad_requests_get_json_errors() {
    let app = TestApp::new().await;

    let req = with_file(app.request("POST", "/import/csv"), "empty.csv", "");
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let req = app
        .request("POST", "/import/csv/preview")
        .add_header("Content-Type", "application/json", true)
        .body("{not json");
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid JSON body"));

    let req = app
        .request("POST", "/import/vcf")
        .add_header("Content-Type", "text/plain", true)
        .body("hi");
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn import_requires_authentication() {
    let app = TestApp::new().await;
    let req = with_file(app.request_as("mallory", "POST", "/import/csv"), "people.csv", CSV);
    let res = req.send(&app.service()).await;
    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
}
