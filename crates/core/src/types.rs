//! Type-safe wrappers for domain identifiers.
//!
//! These newtypes prevent mixing different ID types at compile time -- you
//! cannot pass a `UserId` where an `EventId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                $name(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_type!(UserId);
id_type!(MessageId);
id_type!(EventId);
id_type!(CalendarId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_of_the_same_type_are_unique() {
        assert_ne!(UserId::new(), UserId::new());
        assert_ne!(MessageId::new(), MessageId::new());
        assert_ne!(EventId::new(), EventId::new());
        assert_ne!(CalendarId::new(), CalendarId::new());
    }

    #[test]
    fn roundtrips_through_uuid() {
        let uuid = Uuid::new_v4();
        let user_id = UserId::from(uuid);
        assert_eq!(Uuid::from(user_id), uuid);
    }

    #[test]
    fn display_matches_inner_uuid() {
        let uuid = Uuid::new_v4();
        let event_id = EventId::from(uuid);
        assert_eq!(event_id.to_string(), uuid.to_string());
    }
}
