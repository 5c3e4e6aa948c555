//! vCard data model.

mod card;
mod parameter;
mod property;

pub use card::{VCard, VCardVersion};
pub use parameter::VCardParameter;
pub use property::{VCardProperty, names};
