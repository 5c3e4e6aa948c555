//! Core DAV types.

mod depth;
mod href;
mod multistatus;
mod namespace;
mod property;
mod propfind;
mod report;

pub use depth::Depth;
pub use href::Href;
pub use multistatus::{Multistatus, Propstat, PropstatResponse, Status};
pub use namespace::{CARDDAV_NS, DAV_NS, Namespace, QName};
pub use property::{DavProperty, PropertyValue};
pub use propfind::{PropfindRequest, PropfindType};
pub use report::{
    AddressbookFilter, AddressbookQuery, FilterTest, MatchType, ParamFilter, PropFilter,
    ReportRequest, TextMatch,
};
