//! Compact tagged-tuple messages exchanged over the WebSocket.
//!
//! Every frame is a JSON array whose first element is a one-letter tag. The
//! two directions use separate tag namespaces.

pub mod codec;
pub mod messages;
pub mod opcodes;

pub use codec::DecodeError;
pub use messages::{ClientMessage, ServerMessage};
