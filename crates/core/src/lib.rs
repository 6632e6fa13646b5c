//! `iam-core`: shared IAM building blocks.
//!
//! Error taxonomy, resource naming, entity models and the cancellation
//! context. No storage or transport concerns live here.

pub mod context;
pub mod entity;
pub mod error;
pub mod group;
pub mod policy;
pub mod urn;
pub mod user;

pub use context::Context;
pub use entity::Entity;
pub use error::{ErrorKind, IamError, IamResult};
pub use group::Group;
pub use policy::{Condition, Effect, NumericOp, Policy};
pub use urn::{GroupUrn, PolicyUrn, ResourceKind, UserUrn};
pub use user::{Attributes, User};
