pub mod catalog;
pub mod client;
pub mod clock;
pub mod common;
pub mod configs;
pub mod playback;
pub mod protocol;
pub mod queue;
pub mod room;
pub mod server;
pub mod transport;
