//! Resource naming: `urn:iam::<type>/<name>`.
//!
//! Parsing never fails. Validity and the local name are queried on demand and
//! an empty local name means "not a usable identifier"; services turn that
//! into [`IamError::InvalidArgument`](crate::IamError::InvalidArgument).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Prefix shared by every IAM resource name.
pub const PREFIX: &str = "urn:iam::";

/// Resource type segment of a URN.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    User,
    Group,
    Policy,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Policy => "policy",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True iff `urn` carries the IAM prefix and exactly two `:`-delimited
/// segments follow `urn:iam`.
pub fn is_valid(urn: &str) -> bool {
    urn.starts_with(PREFIX) && urn.split(':').count() == 4
}

fn path(urn: &str) -> Option<(&str, &str)> {
    if !is_valid(urn) {
        return None;
    }
    let path = urn.split(':').nth(3)?;
    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(kind), Some(name), None) => Some((kind, name)),
        _ => None,
    }
}

/// Local name of `urn`, or `""` when it is invalid or its path does not have
/// exactly two `/` parts.
pub fn local_name(urn: &str) -> &str {
    path(urn).map(|(_, name)| name).unwrap_or("")
}

/// Type segment of `urn`, or `""` when it is invalid.
pub fn type_of(urn: &str) -> &str {
    if !is_valid(urn) {
        return "";
    }
    urn.split(':')
        .nth(3)
        .and_then(|p| p.split('/').next())
        .unwrap_or("")
}

/// Build `urn:iam::<kind>/<name>`. No validation of `name`.
pub fn build(kind: ResourceKind, name: &str) -> String {
    format!("{PREFIX}{kind}/{name}")
}

macro_rules! impl_urn_newtype {
    ($t:ident, $kind:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
        #[serde(transparent)]
        pub struct $t(String);

        impl $t {
            pub const KIND: ResourceKind = $kind;

            /// Build the URN for a local name.
            pub fn from_name(name: &str) -> Self {
                Self(build(Self::KIND, name))
            }

            /// Wrap an arbitrary string. Never fails.
            pub fn parse(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Valid URN whose type segment matches this kind.
            pub fn is_valid(&self) -> bool {
                is_valid(&self.0) && type_of(&self.0) == Self::KIND.as_str()
            }

            /// Local name, `""` when unusable.
            pub fn local_name(&self) -> &str {
                if !self.is_valid() {
                    return "";
                }
                local_name(&self.0)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_urn_newtype!(UserUrn, ResourceKind::User);
impl_urn_newtype!(GroupUrn, ResourceKind::Group);
impl_urn_newtype!(PolicyUrn, ResourceKind::Policy);

impl UserUrn {
    /// URN of the user backed by remote account `id`.
    pub fn from_account_id(id: i64) -> Self {
        Self::from_name(&id.to_string())
    }
}
