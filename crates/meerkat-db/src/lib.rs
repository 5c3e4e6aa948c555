//! Persistence for Meerkat: users, contacts and notes behind the
//! [`db::store::ContactStore`] seam.

pub mod db;
pub mod error;
pub mod model;
