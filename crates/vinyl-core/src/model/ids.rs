use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[must_use]
            pub const fn from_raw(uid: i64) -> Self {
                Self(uid)
            }

            #[must_use]
            pub const fn raw(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

define_id!(ArtistId, "Surrogate key of an artist row.");
define_id!(AlbumId, "Surrogate key of an album row.");
define_id!(TrackId, "Surrogate key of a track row.");
define_id!(
    PlayId,
    "Surrogate key of a listening-history row. Orders plays by insertion."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_raw_round_trip() {
        let id = TrackId::from_raw(17);
        assert_eq!(id.raw(), 17);
        assert_eq!(i64::from(id), 17);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ArtistId::from_raw(3).to_string(), "3");
    }

    #[test]
    fn test_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&AlbumId::from_raw(9)).unwrap();
        assert_eq!(json, "9");
    }

    #[test]
    fn test_play_ids_order_by_insertion() {
        assert!(PlayId::from_raw(1) < PlayId::from_raw(2));
    }
}
