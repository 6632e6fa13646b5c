//! Request scope handed to the enforcement point.

use std::collections::BTreeMap;

use serde_json::Value;

/// Attribute map consulted by policy conditions.
pub type PolicyContext = BTreeMap<String, Value>;

/// Everything the pipeline knows about one request.
///
/// Fields are optional so that a transport can build the scope incrementally;
/// a missing field is a denial, never a default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestScope {
    pub subject: Option<String>,
    pub action: Option<String>,
    pub resource: Option<String>,
    pub context: PolicyContext,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}
