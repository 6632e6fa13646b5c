//! Access policy documents.
//!
//! Subjects, resources and actions are patterns: literal strings, or
//! templates whose `<...>` segments are regular expressions. Matching lives in
//! `iam-auth`; this module only defines the stored shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::urn::PolicyUrn;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Predicate over one attribute of the merged request context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options")]
pub enum Condition {
    /// Attribute is a string equal to `equals`.
    StringEqualCondition { equals: String },
    /// Attribute is a string fully matching the regular expression.
    StringMatchCondition { matches: String },
    /// Attribute equals the request subject.
    EqualsSubjectCondition {},
    BooleanCondition { value: bool },
    NumericCondition { operator: NumericOp, value: f64 },
    /// Attribute is an array containing `value`.
    ContainsCondition { value: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub id: PolicyUrn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conditions: BTreeMap<String, Condition>,
}

impl Policy {
    pub fn new(effect: Effect) -> Self {
        Self {
            id: PolicyUrn::default(),
            description: None,
            subjects: Vec::new(),
            resources: Vec::new(),
            actions: Vec::new(),
            effect,
            conditions: BTreeMap::new(),
        }
    }

    pub fn allow() -> Self {
        Self::new(Effect::Allow)
    }

    pub fn deny() -> Self {
        Self::new(Effect::Deny)
    }

    pub fn with_id(mut self, id: PolicyUrn) -> Self {
        self.id = id;
        self
    }

    pub fn subject(mut self, pattern: impl Into<String>) -> Self {
        self.subjects.push(pattern.into());
        self
    }

    pub fn resource(mut self, pattern: impl Into<String>) -> Self {
        self.resources.push(pattern.into());
        self
    }

    pub fn action(mut self, pattern: impl Into<String>) -> Self {
        self.actions.push(pattern.into());
        self
    }

    pub fn condition(mut self, key: impl Into<String>, condition: Condition) -> Self {
        self.conditions.insert(key.into(), condition);
        self
    }
}
