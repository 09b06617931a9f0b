//! Engine lifecycle, events and role switching.
//!
//! Both engines share the same lifecycle ([`RunState`]) and publish
//! [`ServiceEvent`]s on a broadcast channel. [`RoleController`] keeps the
//! two roles mutually exclusive.

mod controller;
mod error;
pub(crate) mod events;
mod state;

pub use controller::RoleController;
pub use error::StartError;
pub use events::{
    event_channel, ServiceEvent, ServiceEventKind, StopReason, DEFAULT_EVENT_CAPACITY,
};
pub use state::{Role, RunState};
