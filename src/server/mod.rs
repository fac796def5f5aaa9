pub mod app_state;
pub mod hub;
pub mod ops;
pub mod session;

pub use app_state::{AppState, now_ms};
pub use hub::BroadcastHub;
pub use ops::{handle_client_message, request_item};
pub use session::Session;
