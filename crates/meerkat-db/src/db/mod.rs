pub mod connection;
pub mod enums;
pub mod memory;
pub mod migrate;
pub mod pg;
pub mod schema;
pub mod store;
