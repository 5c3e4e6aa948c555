//! End-to-end scenarios against the full router and the in-memory store.

mod carddav;
mod helpers;
mod import;
mod photos;
