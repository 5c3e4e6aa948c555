//! Database enum types with Diesel serialization.

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use std::fmt;
use std::io::Write;

/// Contact gender.
///
/// Maps to the `contacts.gender` CHECK constraint and to the four vCard
/// `GENDER` sex codes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl ToSql<Text, Pg> for Gender {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Gender {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        std::str::from_utf8(bytes.as_bytes())
            .ok()
            .and_then(Self::from_db)
            .ok_or_else(|| "Unrecognized enum variant".into())
    }
}

impl Gender {
    /// Returns the database string representation of this gender.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
            Self::PreferNotToSay => "prefer_not_to_say",
        }
    }

    /// Parses the exact database representation.
    #[must_use]
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "other" => Some(Self::Other),
            "prefer_not_to_say" => Some(Self::PreferNotToSay),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_representation_round_trips() {
        for gender in [
            Gender::Male,
            Gender::Female,
            Gender::Other,
            Gender::PreferNotToSay,
        ] {
            assert_eq!(Gender::from_db(gender.as_str()), Some(gender));
        }
        assert_eq!(Gender::from_db("Male"), None);
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&Gender::PreferNotToSay).unwrap(),
            "\"prefer_not_to_say\""
        );
    }
}
