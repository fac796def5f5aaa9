//! Client half of the protocol: clock sync, mirrored state and change events.

pub mod connection;
pub mod events;
pub mod mirror;

pub use connection::run;
pub use events::{EventBinder, SubscriptionId};
pub use mirror::ClientMirror;
