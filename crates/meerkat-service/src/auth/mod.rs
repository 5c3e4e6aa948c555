pub mod authenticate;
pub mod password;
