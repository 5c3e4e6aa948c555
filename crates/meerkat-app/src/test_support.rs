//! Fixtures shared by the handler tests.

use std::sync::Arc;

use meerkat_core::config::{
    AuthConfig, AuthMethod, DatabaseConfig, FetchConfig, ImportConfig, LoggingConfig,
    PhotoConfig, ProxyAuthConfig, ServerConfig, Settings,
};
use meerkat_db::db::memory::MemoryContactStore;
use meerkat_db::db::store::ContactStore;
use meerkat_db::model::user::User;
use meerkat_service::auth::password::hash_password;
use meerkat_service::import::InMemorySessions;
use salvo::http::Method;
use salvo::test::RequestBuilder;
use salvo::{Router, Service};
use tempfile::TempDir;

use crate::app::router;
use crate::config::ConfigHandler;
use crate::state::{AppState, StateHandler};

pub(crate) const PASSWORD: &str = "secret";

pub(crate) fn settings(method: AuthMethod, photo_dir: &str) -> Settings {
    Settings {
        database: DatabaseConfig {
            url: "memory://".to_string(),
            max_connections: 1,
        },
        auth: AuthConfig {
            method,
            proxy: ProxyAuthConfig {
                header: "X-Remote-User".to_string(),
            },
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        photos: PhotoConfig {
            dir: photo_dir.to_string(),
        },
        import: ImportConfig::default(),
        fetch: FetchConfig::default(),
    }
}

pub(crate) const BASE: &str = "http://127.0.0.1:5800";

pub(crate) const ALICE_CARD: &str = "BEGIN:VCARD\r\nVERSION:4.0\r\nUID:alice\r\nFN:Alice Johnson\r\n\
N:Johnson;Alice;;;\r\nEMAIL:alice@example.com\r\nCATEGORIES:Friends\r\nEND:VCARD\r\n";

/// A memory-backed app with users `ann` and `bob`. Only basic-auth apps
/// get real password hashes.
pub(crate) struct TestApp {
    pub settings: Settings,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryContactStore>,
    pub ann: User,
    pub bob: User,
    pub photos: TempDir,
}

impl TestApp {
    /// Authenticated through the proxy header; see [`TestApp::request`].
    pub(crate) async fn new() -> Self {
        Self::with_auth(AuthMethod::Proxy).await
    }

    pub(crate) async fn with_auth(method: AuthMethod) -> Self {
        let photos = tempfile::tempdir().unwrap();
        let settings = settings(method, photos.path().to_str().unwrap());
        let store = Arc::new(MemoryContactStore::new());
        let hash = match method {
            AuthMethod::Basic => hash_password(PASSWORD).unwrap(),
            AuthMethod::Proxy => "unused".to_string(),
        };
        let ann = store.create_user("ann", "ann@example.com", &hash).await.unwrap();
        let bob = store.create_user("bob", "bob@example.com", &hash).await.unwrap();

        let state = AppState::build(
            &settings,
            Arc::clone(&store) as Arc<dyn ContactStore>,
            Arc::new(InMemorySessions::new()),
        )
        .unwrap();

        Self {
            settings,
            state: Arc::new(state),
            store,
            ann,
            bob,
            photos,
        }
    }

    /// Adds the config and state hoops to `router`.
    pub(crate) fn hoops(&self, router: Router) -> Router {
        router
            .hoop(ConfigHandler {
                settings: self.settings.clone(),
            })
            .hoop(StateHandler {
                state: Arc::clone(&self.state),
            })
    }

    /// A request as `ann` through the proxy header.
    pub(crate) fn request(&self, method: &str, path: &str) -> RequestBuilder {
        self.request_as("ann", method, path)
    }

    pub(crate) fn request_as(&self, username: &str, method: &str, path: &str) -> RequestBuilder {
        RequestBuilder::new(
            format!("{BASE}{path}"),
            Method::from_bytes(method.as_bytes()).unwrap(),
        )
        .add_header("X-Remote-User", username, true)
    }

    /// PUTs `card` at `path` and returns the response.
    pub(crate) async fn put_card(&self, path: &str, card: &str) -> salvo::Response {
        self.request("PUT", path)
            .add_header("Content-Type", "text/vcard; charset=utf-8", true)
            .body(card.to_string())
            .send(&self.service())
            .await
    }

    /// The full application router.
    pub(crate) fn service(&self) -> Service {
        Service::new(router(self.settings.clone(), Arc::clone(&self.state)).unwrap())
    }
}
