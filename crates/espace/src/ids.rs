//! Opaque UUID identifiers.
//!
//! Every identifier arriving from a client is parsed with `parse`, which turns a
//! malformed value into a [`ValidationError`] naming the offending field.

use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                Uuid::parse_str(value.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidId {
                        field: $field,
                        value: value.to_string(),
                    })
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a finalized registration record.
    EntityId,
    "entity_id"
);
uuid_id!(
    /// Identifier of a pending application.
    DraftId,
    "draft_id"
);
uuid_id!(StatusId, "status_id");
uuid_id!(PropertyId, "property_id");
uuid_id!(GroupId, "group_id");
