pub mod base;
pub mod fetcher;
pub mod logging;
pub mod playback;
pub mod server;
pub mod storage;

pub use base::*;
pub use fetcher::*;
pub use logging::*;
pub use playback::*;
pub use server::*;
pub use storage::*;
