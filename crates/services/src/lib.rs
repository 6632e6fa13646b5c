//! `iam-services`: user, group and policy services.
//!
//! Each service serializes its own operations through a [`ServiceGate`].
//! Group membership stays consistent with user deletion through a
//! reconciliation callback on the user service's deletion notices.

pub mod gate;
pub mod group;
pub mod info_point;
pub mod policy;
pub mod user;

pub use gate::ServiceGate;
pub use group::GroupService;
pub use info_point::UserInfoPoint;
pub use policy::PolicyService;
pub use user::UserService;
