//! In-process notices (publish/subscribe), used to propagate user deletion
//! to dependent services.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{BoxFuture, Callback, NoticeBus, SubscriberId, callback};
pub use in_memory_bus::InMemoryNoticeBus;
