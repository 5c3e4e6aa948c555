use diesel::{pg::Pg, prelude::*};
use serde::{Deserialize, Serialize};

use crate::db::schema;

/// A free-text note attached to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::notes)]
#[diesel(check_for_backend(Pg))]
pub struct Note {
    pub id: i64,
    pub owner_id: i64,
    pub contact_id: i64,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = schema::notes)]
pub struct NewNote {
    pub owner_id: i64,
    pub contact_id: i64,
    pub content: String,
}
