#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Provides utilities for:
//! - Building an isolated application (memory store, temporary photo dir)
//! - Making HTTP requests through the full router
//! - Asserting on responses

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use salvo::Service;
use salvo::http::header::HeaderName;
use salvo::http::{Method, ReqBody, StatusCode};
use salvo::test::{RequestBuilder, ResponseExt};
use tempfile::TempDir;

use meerkat_test::component::app::app::router;
use meerkat_test::component::app::state::AppState;
use meerkat_test::component::service::import::{ImportSessions, InMemorySessions};
use meerkat_test::component::settings::config::{
    AuthConfig, AuthMethod, DatabaseConfig, FetchConfig, ImportConfig, LoggingConfig,
    PhotoConfig, ProxyAuthConfig, ServerConfig, Settings,
};
use meerkat_test::component::store::db::memory::MemoryContactStore;
pub use meerkat_test::component::store::db::store::ContactStore;
use meerkat_test::component::store::model::user::User;

pub use meerkat_test::component::store::model::contact::Contact;

/// Header the test server trusts for the authenticated user.
pub const USER_HEADER: &str = "X-Remote-User";

pub const BOUNDARY: &str = "meerkat-integration-boundary";

/// ## Summary
/// Path of `uid`'s object in `owner`'s address book.
#[must_use]
pub fn card_path(owner: &str, uid: &str) -> String {
    format!("/carddav/addressbooks/{owner}/contacts/{uid}.vcf")
}

/// A minimal vCard 4.0 with a formatted name and an email.
#[must_use]
pub fn simple_vcard(uid: &str, given: &str, family: &str, email: &str) -> String {
    format!(
        "BEGIN:VCARD\r\nVERSION:4.0\r\nUID:{uid}\r\nFN:{given} {family}\r\n\
         N:{family};{given};;;\r\nEMAIL:{email}\r\nEND:VCARD\r\n"
    )
}

/// A gradient PNG of the given size.
#[must_use]
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            u8::try_from(x % 256).unwrap(),
            u8::try_from(y % 256).unwrap(),
            200,
        ])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// An application wired the way `main` wires it, backed by memory.
pub struct TestServer {
    pub settings: Settings,
    pub store: Arc<MemoryContactStore>,
    pub state: Arc<AppState>,
    pub service: Service,
    pub sessions: Arc<InMemorySessions>,
    pub ann: User,
    pub bob: User,
    photos: TempDir,
}

impl TestServer {
    /// ## Summary
    /// Builds a server with users `ann` and `bob`, authenticated through
    /// [`USER_HEADER`].
    pub async fn new() -> Self {
        Self::with_import(ImportConfig::default()).await
    }

    pub async fn with_import(import: ImportConfig) -> Self {
        let photos = tempfile::tempdir().expect("Failed to create photo dir");
        let settings = Settings {
            database: DatabaseConfig {
                url: "memory://".to_string(),
                max_connections: 1,
            },
            auth: AuthConfig {
                method: AuthMethod::Proxy,
                proxy: ProxyAuthConfig {
                    header: USER_HEADER.to_string(),
                },
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5800,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
            photos: PhotoConfig {
                dir: photos.path().to_string_lossy().into_owned(),
            },
            import,
            fetch: FetchConfig::default(),
        };

        let store = Arc::new(MemoryContactStore::new());
        let ann = store
            .create_user("ann", "ann@example.com", "unused")
            .await
            .expect("Failed to seed ann");
        let bob = store
            .create_user("bob", "bob@example.com", "unused")
            .await
            .expect("Failed to seed bob");

        let sessions = Arc::new(InMemorySessions::new());
        let state = Arc::new(
            AppState::build(
                &settings,
                Arc::clone(&store) as Arc<dyn ContactStore>,
                Arc::clone(&sessions) as Arc<dyn ImportSessions>,
            )
            .expect("Failed to build state"),
        );
        let service = Service::new(
            router(settings.clone(), Arc::clone(&state)).expect("Failed to build router"),
        );

        Self {
            settings,
            store,
            state,
            service,
            sessions,
            ann,
            bob,
            photos,
        }
    }

    #[must_use]
    pub fn photo_dir(&self) -> PathBuf {
        self.photos.path().to_path_buf()
    }

    /// Stored photo files, temporary files excluded.
    pub fn photo_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.photos.path())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| p.extension().is_some_and(|ext| ext == "jpg"))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The live contact `uid` of `owner`.
    pub async fn contact(&self, owner: &User, uid: &str) -> Option<Contact> {
        self.store
            .find_by_uid(owner.id, uid)
            .await
            .expect("Store lookup failed")
    }

    pub async fn contacts(&self, owner: &User) -> Vec<Contact> {
        self.store
            .list_contacts(owner.id)
            .await
            .expect("Store listing failed")
    }
}

/// Test request builder for constructing HTTP requests.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl TestRequest {
    /// Creates a new request as `ann`.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
        .user("ann")
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn propfind(path: &str) -> Self {
        Self::new(Method::from_bytes(b"PROPFIND").expect("Valid method"), path)
    }

    #[must_use]
    pub fn report(path: &str) -> Self {
        Self::new(Method::from_bytes(b"REPORT").expect("Valid method"), path)
    }

    /// Replaces the authenticated user.
    #[must_use]
    pub fn user(mut self, username: &str) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(USER_HEADER));
        self.header(USER_HEADER, username)
    }

    /// Drops the authentication header.
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(USER_HEADER));
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn depth(self, depth: &str) -> Self {
        self.header("Depth", depth)
    }

    #[must_use]
    pub fn if_match(self, etag: &str) -> Self {
        self.header("If-Match", etag)
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn xml_body(self, xml: &str) -> Self {
        self.header("Content-Type", "application/xml; charset=utf-8")
            .body(xml.as_bytes().to_vec())
    }

    #[must_use]
    pub fn vcard_body(self, vcard: &str) -> Self {
        self.header("Content-Type", "text/vcard; charset=utf-8")
            .body(vcard.as_bytes().to_vec())
    }

    #[must_use]
    pub fn json_body(self, json: &serde_json::Value) -> Self {
        self.header("Content-Type", "application/json")
            .body(json.to_string().into_bytes())
    }

    /// Sets a `multipart/form-data` body with one `file` field.
    #[must_use]
    pub fn file_body(self, filename: &str, content: &[u8]) -> Self {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        self.header(
            "Content-Type",
            &format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
    }

    /// Sends the request to the test service and returns the response.
    ///
    /// ## Panics
    /// Panics if the response body cannot be read.
    pub async fn send(self, service: &Service) -> TestResponse {
        let url = format!("http://127.0.0.1:5800{}", self.path);
        let mut client = RequestBuilder::new(&url, self.method.clone());

        for (name, value) in self.headers {
            if let Ok(header_name) = HeaderName::try_from(name.as_str()) {
                client = client.add_header(header_name, value, true);
            }
        }
        if let Some(body_bytes) = self.body {
            client = client.body(ReqBody::Once(body_bytes.into()));
        }

        let mut response = client.send(service).await;
        let status = response.status_code.unwrap_or(StatusCode::OK);
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body: Vec<u8> = response.take_bytes(None).await.unwrap_or_default().to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Represents an HTTP test response for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TestResponse {
    #[must_use]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {expected} but got {}:\n{}",
            self.status,
            self.body_string()
        );
        self
    }

    #[must_use]
    pub fn assert_body_contains(self, expected: &str) -> Self {
        let body = self.body_string();
        assert!(
            body.contains(expected),
            "Expected body to contain '{expected}' but got:\n{body}"
        );
        self
    }

    #[must_use]
    pub fn assert_body_not_contains(self, unexpected: &str) -> Self {
        let body = self.body_string();
        assert!(
            !body.contains(unexpected),
            "Expected body to NOT contain '{unexpected}' but got:\n{body}"
        );
        self
    }

    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The body parsed as JSON.
    ///
    /// ## Panics
    /// Panics if the body is not JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// ## Panics
    /// Panics if the response carries no `ETag`.
    #[must_use]
    pub fn etag(&self) -> String {
        self.get_header("ETag")
            .expect("Response has no ETag")
            .to_string()
    }
}
