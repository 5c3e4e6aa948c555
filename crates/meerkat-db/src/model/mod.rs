pub mod contact;
pub mod note;
pub mod user;
