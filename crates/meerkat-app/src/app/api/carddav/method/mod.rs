pub mod delete;
pub mod get_head;
pub mod mkcol;
pub mod options;
pub mod propfind;
pub mod put;
pub mod report;

#[cfg(test)]
mod delete_tests;
#[cfg(test)]
mod put_tests;
