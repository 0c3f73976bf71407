//! Enum types for the harvest system.
//!
//! Each enum has:
//! - Custom Serialize (as its canonical string)
//! - Custom Deserialize and `FromStr` (case-insensitive, unknown values rejected)
//! - `as_str()`, `ALL`, `Display` impl

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?} (expected one of: {expected})")]
pub struct ParseEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Comma-separated list of accepted values.
    pub expected: String,
}

// ---------------------------------------------------------------------------
// Macro: defines a closed enum with a fixed set of string variants.
// ---------------------------------------------------------------------------
macro_rules! define_enum {
    (
        $(#[$meta:meta])*
        $name:ident, kind = $kind:expr,
        variants: [
            $( $(#[$vmeta:meta])* ($variant:ident, $str:expr) ),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[ $( Self::$variant, )+ ];

            /// Returns the string representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ParseEnumError {
                    kind: $kind,
                    value: s.to_owned(),
                    expected: [$( $str ),+].join(", "),
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_enum! {
    /// Outcome of a CI build.
    BuildStatus, kind = "build status",
    variants: [
        (Passed, "PASSED"),
        (Failed, "FAILED"),
        (Skipped, "SKIPPED"),
        (Aborted, "ABORTED"),
    ]
}

impl BuildStatus {
    /// Returns `true` for the status that makes a build a "good build".
    pub fn is_good(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

define_enum! {
    /// Source-control system a repository is hosted in.
    Scm, kind = "scm",
    variants: [
        (Git, "git"),
        (Perforce, "perforce"),
        (Tfs, "tfs"),
    ]
}

define_enum! {
    /// Issue tracker an [`Issue`](crate::issue::Issue) belongs to.
    TrackingSystem, kind = "tracking system",
    variants: [
        (Jira, "jira"),
        (Tfs, "tfs"),
    ]
}

define_enum! {
    /// Which merge edges an ancestry closure follows.
    ///
    /// `Directed` walks merges with their direction: ancestors follow
    /// merged-from, descendants follow merged-into. `Symmetric` treats a
    /// merge as an undirected link and follows it both ways in either
    /// closure. Both keep the two closures inverse to each other.
    MergeTraversal, kind = "merge traversal",
    variants: [
        (Directed, "directed"),
        (Symmetric, "symmetric"),
    ]
}

impl Default for MergeTraversal {
    fn default() -> Self {
        Self::Directed
    }
}
