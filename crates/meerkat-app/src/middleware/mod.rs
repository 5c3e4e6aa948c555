pub mod auth;
pub mod dav_target;
