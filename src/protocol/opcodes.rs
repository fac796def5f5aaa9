/// Tags of requests sent by clients.
pub mod client {
    pub const ENQUEUE: &str = "e";
    pub const SKIP: &str = "k";
    pub const ADVANCE: &str = "n";
    pub const PLAY_STATE: &str = "p";
    pub const VOLUME: &str = "v";
    pub const REPLACE_QUEUE: &str = "q";
    pub const SYNC: &str = "y";
    pub const PING: &str = "t";
}

/// Tags of events sent by the server.
pub mod server {
    pub const ITEM_CHANGED: &str = "c";
    pub const PLAY_STATE: &str = "p";
    pub const VOLUME: &str = "v";
    pub const QUEUE: &str = "q";
    pub const CATALOG_ENTRY: &str = "i";
    pub const PING_ECHO: &str = "t";
}
