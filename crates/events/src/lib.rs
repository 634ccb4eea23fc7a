//! Change feed: push-based notifications of committed document writes.
//!
//! Live listings subscribe here instead of polling the store. Dropping a
//! [`Subscription`] is the only way to cancel it.

pub mod bus;
pub mod change;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use change::{ChangeEvent, ChangeKind};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
