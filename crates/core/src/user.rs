//! User record stored by the IAM service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::urn::UserUrn;

/// Free-form user attributes.
pub type Attributes = HashMap<String, Value>;

/// Local user record.
///
/// `id` is always derived from `account_id`; credentials live in the remote
/// account store. `locked` is not persisted locally: it is filled from the
/// remote account whenever a user is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "accountID")]
    pub account_id: i64,
    pub username: String,
    pub id: UserUrn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(rename = "attrs", default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

impl User {
    pub fn new(account_id: i64, username: impl Into<String>, attributes: Option<Attributes>) -> Self {
        Self {
            account_id,
            username: username.into(),
            id: UserUrn::from_account_id(account_id),
            locked: None,
            attributes,
        }
    }

    /// Sets one attribute, creating the map when absent.
    pub fn set_attr(&mut self, key: impl Into<String>, value: Value) {
        self.attributes
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
    }

    /// Removes one attribute; a user without attributes is left untouched.
    pub fn delete_attr(&mut self, key: &str) {
        if let Some(attrs) = self.attributes.as_mut() {
            attrs.remove(key);
        }
    }
}
