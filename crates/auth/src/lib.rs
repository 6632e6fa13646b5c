//! `iam-auth`: policy enforcement pipeline.
//!
//! authenticate → contextualize → gather (info points) → decide → enforce.
//! The pipeline is fail-closed: anything other than an explicit allow is a
//! denial. This crate is decoupled from HTTP and storage.

pub mod authenticate;
pub mod condition;
pub mod decision;
pub mod enforcer;
pub mod info_point;
pub mod pattern;
pub mod scope;

pub use authenticate::{Authenticator, SubjectExtractor, extract_bearer};
pub use decision::{AccessRequest, Decision, DecisionPoint, PolicyEvaluator, PolicySource, StaticPolicies};
pub use enforcer::{EnforcementPoint, Enforcer, NoopEnforcer, PolicyEnforcer, merge_context};
pub use info_point::{InfoPoint, InfoPointRouter, ResourceMatcher};
pub use pattern::PatternMatcher;
pub use scope::{PolicyContext, RequestScope};
