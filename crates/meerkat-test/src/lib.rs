//! Meerkat integration test support.
//!
//! Re-exports the workspace crates under one roof so the integration tests
//! reach the whole stack through `meerkat_test::component`.

pub mod component {
    pub use meerkat_app as app;
    pub use meerkat_core as settings;
    pub use meerkat_db as store;
    pub use meerkat_service as service;
}
