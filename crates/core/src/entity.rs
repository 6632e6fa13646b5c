//! Entity trait: identity shared by every stored record.

use core::fmt::Debug;
use core::hash::Hash;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::group::Group;
use crate::policy::Policy;
use crate::urn::{GroupUrn, PolicyUrn, UserUrn};
use crate::user::User;

/// A record addressed by a URN.
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: Clone + Eq + Ord + Hash + Debug + AsRef<str> + From<String> + Send + Sync + 'static;

    /// Name used in `NotFound` / `Conflict` errors.
    const KIND: &'static str;

    fn id(&self) -> &Self::Id;

    /// Called for every record a listing returns, with the key it was
    /// stored under.
    fn assign_key(&mut self, _key: &Self::Id) {}
}

impl Entity for User {
    type Id = UserUrn;
    const KIND: &'static str = "user";

    fn id(&self) -> &UserUrn {
        &self.id
    }
}

impl Entity for Group {
    type Id = GroupUrn;
    const KIND: &'static str = "group";

    fn id(&self) -> &GroupUrn {
        &self.id
    }
}

impl Entity for Policy {
    type Id = PolicyUrn;
    const KIND: &'static str = "policy";

    fn id(&self) -> &PolicyUrn {
        &self.id
    }

    fn assign_key(&mut self, key: &PolicyUrn) {
        self.id = key.clone();
    }
}
