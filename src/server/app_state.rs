use std::sync::Arc;

use parking_lot::Mutex;

use super::{BroadcastHub, Session};
use crate::{
    catalog::{CatalogPersistence, CatalogStore, MediaDir, MediaFetcher},
    configs::Config,
    room::{Outbox, Room},
};

/// Top-level application state.
pub struct AppState {
    pub config: Config,
    pub hub: BroadcastHub,
    /// Never held across an `.await`.
    pub room: Mutex<Room>,
    pub store: CatalogStore,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub media: MediaDir,
}

impl AppState {
    pub fn new(
        config: Config,
        persistence: Arc<dyn CatalogPersistence>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            hub: BroadcastHub::new(),
            room: Mutex::new(Room::new(config.playback.clone())),
            store: CatalogStore::new(persistence),
            media: MediaDir::new(config.storage.data_dir.clone()),
            fetcher,
            config,
        }
    }

    /// Runs `f` against the room and broadcasts what it emitted before the
    /// lock is released, so every session sees mutations in the same order.
    pub fn update<R>(&self, f: impl FnOnce(&mut Room) -> (R, Outbox)) -> R {
        let mut room = self.room.lock();
        let (result, out) = f(&mut *room);
        self.hub.broadcast(&out);
        result
    }

    pub fn apply(&self, f: impl FnOnce(&mut Room) -> Outbox) {
        self.update(|room| ((), f(room)));
    }

    /// Like [`AppState::apply`], then schedules a catalog save.
    pub fn apply_catalog(&self, f: impl FnOnce(&mut Room) -> Outbox) {
        self.update(|room| {
            let out = f(room);
            self.store.request_save(room.catalog().snapshot());
            ((), out)
        });
    }

    /// Registers a session and sends it the full state under one lock, so it
    /// cannot miss or double-apply a concurrent broadcast.
    pub fn attach(&self, session: Arc<Session>) {
        let room = self.room.lock();
        session.send_all(&room.sync_messages());
        self.hub.register(session);
    }

    pub fn send_sync(&self, session: &Session) {
        let room = self.room.lock();
        session.send_all(&room.sync_messages());
    }
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
