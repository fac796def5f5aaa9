use crate::{catalog::CatalogEntry, common::types::ItemId, playback::PlayState};

/// Requests a client may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Enqueue(ItemId),
    /// Operator skip, ignores the discriminator.
    Skip,
    /// "The item with this discriminator finished, play the next one."
    Advance(u32),
    SetPlayState(PlayState),
    SetVolume(f64),
    ReplaceQueue(Vec<ItemId>),
    Sync,
    /// Client's local send time, echoed back by the server.
    Ping(f64),
}

/// Events the server pushes to every session (or to one, for sync and pings).
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    ItemChanged {
        id: Option<ItemId>,
        discriminator: u32,
    },
    PlayStateChanged(PlayState),
    VolumeChanged(f64),
    QueueChanged(Vec<ItemId>),
    CatalogEntryChanged {
        id: ItemId,
        entry: CatalogEntry,
    },
    PingEcho {
        sent: f64,
        server_time: f64,
    },
}
