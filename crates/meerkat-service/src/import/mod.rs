//! Bulk contact import from CSV and VCF files.
//!
//! An import runs in three steps. Upload parses the file into a session,
//! preview validates rows and looks for duplicates, and confirm applies the
//! chosen action per row in one transaction. VCF uploads are previewed as
//! part of the upload.

pub mod csv;
pub mod duplicate;
pub mod mapping;
pub mod merge;
pub mod orchestrator;
pub mod session;
pub mod types;
pub mod validate;
pub mod vcf;

pub use orchestrator::ImportService;
pub use session::{ImportSessions, InMemorySessions};
