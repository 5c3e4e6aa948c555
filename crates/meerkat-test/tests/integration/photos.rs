#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Photos travelling through `CardDAV`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::GenericImageView;
use salvo::http::StatusCode;

use super::helpers::*;

fn card_with_photo(uid: &str, photo_line: &str) -> String {
    format!(
        "BEGIN:VCARD\r\nVERSION:4.0\r\nUID:{uid}\r\nFN:Pat Doe\r\nN:Doe;Pat;;;\r\n{photo_line}\r\nEND:VCARD\r\n"
    )
}

/// ## Summary
/// A PNG uploaded inline is stored as a 125x125 JPEG with an inline
/// thumbnail, and served back as JPEG.
#[test_log::test(tokio::test)]
async fn embedded_photo_round_trips_as_jpeg() {
    let server = TestServer::new().await;
    let png = STANDARD.encode(sample_png(300, 200));
    let card = card_with_photo(
        "pat",
        &format!("PHOTO;MEDIATYPE=image/png:data:image/png;base64,{png}"),
    );

    TestRequest::put(&card_path("ann", "pat"))
        .vcard_body(&card)
        .send(&server.service)
        .await
        .assert_status(StatusCode::CREATED);

    let contact = server.contact(&server.ann, "pat").await.unwrap();
    let filename = contact.photo.clone().expect("photo should be stored");
    assert!(filename.ends_with("_photo.jpg"));
    let thumbnail = contact
        .photo_thumbnail
        .as_deref()
        .unwrap()
        .strip_prefix("data:image/jpeg;base64,")
        .expect("thumbnail should be a JPEG data URL");
    let thumbnail = image::load_from_memory(&STANDARD.decode(thumbnail).unwrap()).unwrap();
    assert_eq!(thumbnail.dimensions(), (48, 48));

    let files = server.photo_files();
    assert_eq!(files.len(), 1);
    let stored = image::open(server.photo_dir().join(&filename)).unwrap();
    assert_eq!(stored.dimensions(), (125, 125));

    let card = TestRequest::get(&card_path("ann", "pat"))
        .send(&server.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_not_contains("image/png")
        .body_string()
        .replace("\r\n ", "");
    let served = card
        .lines()
        .find_map(|line| line.strip_prefix("PHOTO;MEDIATYPE=image/jpeg:"))
        .expect("GET should emit a JPEG PHOTO");
    let served = image::load_from_memory(&STANDARD.decode(served.trim_end()).unwrap()).unwrap();
    assert_eq!(served.dimensions(), (125, 125));
}

/// ## Summary
/// Replacing a card without a PHOTO clears the contact's photo.
#[test_log::test(tokio::test)]
async fn card_without_photo_clears_it() {
    let server = TestServer::new().await;
    let path = card_path("ann", "pat");
    let png = STANDARD.encode(sample_png(40, 40));

    let created = TestRequest::put(&path)
        .vcard_body(&card_with_photo("pat", &format!("PHOTO:data:image/png;base64,{png}")))
        .send(&server.service)
        .await
        .assert_status(StatusCode::CREATED);

    TestRequest::put(&path)
        .if_match(&created.etag())
        .vcard_body(&simple_vcard("pat", "Pat", "Doe", "pat@example.com"))
        .send(&server.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let contact = server.contact(&server.ann, "pat").await.unwrap();
    assert!(contact.photo.is_none());
    assert!(contact.photo_thumbnail.is_none());
    TestRequest::get(&path)
        .send(&server.service)
        .await
        .assert_body_not_contains("PHOTO");
}

/// ## Summary
/// A PHOTO pointing at the cloud metadata address is never fetched; the
/// card itself is still stored.
#[test_log::test(tokio::test)]
async fn photo_urls_to_internal_addresses_are_refused() {
    let server = TestServer::new().await;
    let card = card_with_photo(
        "meta",
        "PHOTO;VALUE=uri:http://169.254.169.254/latest/meta-data/",
    );

    TestRequest::put(&card_path("ann", "meta"))
        .vcard_body(&card)
        .send(&server.service)
        .await
        .assert_status(StatusCode::CREATED);

    let contact = server.contact(&server.ann, "meta").await.unwrap();
    assert!(contact.photo.is_none());
    assert!(server.photo_files().is_empty());
}
