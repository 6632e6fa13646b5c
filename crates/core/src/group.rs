use serde::{Deserialize, Serialize};

use crate::urn::GroupUrn;

/// Named collection of users. Members are tracked by the membership
/// relation, never embedded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupUrn,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Group {
    pub fn new(name: impl Into<String>, comment: Option<String>) -> Self {
        let name = name.into();
        Self {
            id: GroupUrn::from_name(&name),
            name,
            comment,
        }
    }
}
