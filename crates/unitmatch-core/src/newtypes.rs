/// Validated newtype wrappers for labels and identifiers.
///
/// Each newtype enforces its shape constraint at construction time via
/// `TryFrom`. Once constructed, the inner value is immutable. Serde
/// `Deserialize` impls re-run validation so invalid data cannot enter the
/// type system from an untrusted study document.
use std::fmt;
use std::ops::Deref;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced when constructing a validated newtype from invalid input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewtypeError {
    /// The value did not match the expected format.
    InvalidFormat {
        /// Name of the type that rejected the input.
        type_name: &'static str,
        /// A human-readable description of the expected format.
        expected: &'static str,
        /// The input that was rejected, rendered as a string.
        got: String,
    },
}

impl fmt::Display for NewtypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat {
                type_name,
                expected,
                got,
            } => write!(f, "invalid {type_name}: expected {expected}, got {got:?}"),
        }
    }
}

impl std::error::Error for NewtypeError {}

// ---------------------------------------------------------------------------
// Regex statics
// ---------------------------------------------------------------------------

/// Subject and session names: an alphanumeric first character followed by
/// alphanumerics, `.`, `_`, `-`, `:` or `/`.
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:/-]*$").unwrap_or_else(|_| {
        // Never reached: the pattern above is always valid.
        Regex::new("a^").unwrap_or_else(|_| unreachable!("regex engine broken"))
    })
});

// ---------------------------------------------------------------------------
// LocalLabel
// ---------------------------------------------------------------------------

/// A spike-sorting cluster label, meaningful only within one session.
///
/// Labels are strictly positive; `0` is the conventional noise cluster and is
/// never a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalLabel(u32);

impl TryFrom<u32> for LocalLabel {
    type Error = NewtypeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(NewtypeError::InvalidFormat {
                type_name: "LocalLabel",
                expected: "a positive integer",
                got: value.to_string(),
            })
        } else {
            Ok(Self(value))
        }
    }
}

impl LocalLabel {
    /// Returns the raw label value.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LocalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for LocalLabel {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for LocalLabel {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = u32::deserialize(d)?;
        LocalLabel::try_from(raw).map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// GlobalId
// ---------------------------------------------------------------------------

/// A resolved unit identity, stable across every session of one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalId(u32);

impl TryFrom<u32> for GlobalId {
    type Error = NewtypeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(NewtypeError::InvalidFormat {
                type_name: "GlobalId",
                expected: "a positive integer",
                got: value.to_string(),
            })
        } else {
            Ok(Self(value))
        }
    }
}

impl GlobalId {
    /// The first identity handed out for a subject.
    pub const FIRST: GlobalId = GlobalId(1);

    /// Returns the raw identity value.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Returns the identity `n` steps after this one, or `None` on overflow.
    pub fn offset(self, n: u32) -> Option<GlobalId> {
        self.0.checked_add(n).map(GlobalId)
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for GlobalId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for GlobalId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = u32::deserialize(d)?;
        GlobalId::try_from(raw).map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// SubjectId / SessionId
// ---------------------------------------------------------------------------

macro_rules! name_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl TryFrom<&str> for $name {
            type Error = NewtypeError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                if NAME_RE.is_match(s) {
                    Ok(Self(s.to_owned()))
                } else {
                    Err(NewtypeError::InvalidFormat {
                        type_name: stringify!($name),
                        expected: "an alphanumeric name (may contain . _ - : /)",
                        got: s.to_owned(),
                    })
                }
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                $name::try_from(s.as_str()).map_err(de::Error::custom)
            }
        }
    };
}

name_newtype!(
    /// Name of a subject (animal) whose sessions are resolved together.
    SubjectId
);

name_newtype!(
    /// Name of one recording session.
    SessionId
);
