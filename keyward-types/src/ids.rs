//! Identifier types used throughout keyward.
//!
//! Every persisted record is keyed by a SQLite row id. Each table gets its own
//! newtype so a license id can never be passed where an instance id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw row id.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw row id.
            #[must_use]
            pub const fn get(&self) -> i64 {
                self.0
            }

            /// Parses an id from its decimal string form.
            pub fn parse(s: &str) -> Result<Self, crate::Error> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|e| crate::Error::InvalidId(format!("{s:?}: {e}")))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

row_id!(
    /// Identifier of a row in the `license` table.
    LicenseId
);

row_id!(
    /// Identifier of a row in the `license_instance` table.
    InstanceId
);

row_id!(
    /// Identifier of a row in the `product_installed_on` table.
    InstalledOnId
);

row_id!(
    /// Identifier of the user (or system account) that performed a mutation.
    /// Recorded in the audit columns, never interpreted by the core.
    ActorId
);
