//! The single authoritative playback room.
//!
//! Every mutation is synchronous and returns the events it produced, in the
//! order they must reach sessions. Callers broadcast the outbox before
//! releasing the lock that guards the room.

use tracing::debug;

use crate::{
    catalog::{Catalog, CatalogEntry, ItemMetadata},
    common::types::{ItemId, MediaFormat},
    configs::PlaybackConfig,
    playback::{CurrentItem, PlayState},
    protocol::ServerMessage,
    queue::Queue,
};

pub type Outbox = Vec<ServerMessage>;

/// What a catalog request turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Media was already on disk and the id went straight into the queue.
    Enqueued,
    /// A placeholder was created; the caller must fetch and download.
    FetchStarted,
    /// Another request for the same id is still running.
    AlreadyInFlight,
}

pub struct Room {
    catalog: Catalog,
    queue: Queue,
    current: CurrentItem,
    play_state: PlayState,
    volume: f64,
    limits: PlaybackConfig,
}

fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() { 1.0 } else { volume.clamp(0.0, 1.0) }
}

impl Room {
    pub fn new(limits: PlaybackConfig) -> Self {
        Self {
            catalog: Catalog::new(),
            queue: Queue::new(),
            current: CurrentItem::default(),
            play_state: PlayState::default(),
            volume: clamp_volume(limits.initial_volume),
            limits,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn current(&self) -> &CurrentItem {
        &self.current
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    fn item_changed(&self) -> ServerMessage {
        ServerMessage::ItemChanged {
            id: self.current.id.clone(),
            discriminator: self.current.discriminator,
        }
    }

    fn queue_changed(&self) -> ServerMessage {
        ServerMessage::QueueChanged(self.queue.to_vec())
    }

    fn entry_changed(&self, id: &ItemId) -> Outbox {
        self.catalog
            .get(id)
            .map(|entry| ServerMessage::CatalogEntryChanged {
                id: id.clone(),
                entry: entry.clone(),
            })
            .into_iter()
            .collect()
    }

    /// Full state for a (re)connecting session: catalog, volume, queue,
    /// current item, play state.
    pub fn sync_messages(&self) -> Outbox {
        let mut out: Outbox = self
            .catalog
            .iter()
            .map(|(id, entry)| ServerMessage::CatalogEntryChanged {
                id: id.clone(),
                entry: entry.clone(),
            })
            .collect();
        out.push(ServerMessage::VolumeChanged(self.volume));
        out.push(self.queue_changed());
        out.push(self.item_changed());
        out.push(ServerMessage::PlayStateChanged(self.play_state));
        out
    }

    /// Stores a client play state with its rate clamped.
    ///
    /// A playing state whose rate gets clamped is re-anchored at `now` so
    /// the position sessions see does not jump.
    pub fn set_play_state(&mut self, state: PlayState, now: f64) -> Outbox {
        let sent = state.rate();
        let clamped = self.limits.clamp_rate(sent);
        self.play_state = if clamped == sent {
            state
        } else if state.is_playing() && sent > 0.0 {
            state.with_rate(clamped, now)
        } else {
            state.map_rate(|_| clamped)
        };
        vec![ServerMessage::PlayStateChanged(self.play_state)]
    }

    pub fn set_volume(&mut self, volume: f64) -> Outbox {
        self.volume = clamp_volume(volume);
        vec![ServerMessage::VolumeChanged(self.volume)]
    }

    /// Moves to the next queued item if `from` names the live item.
    pub fn advance(&mut self, from: u32) -> Outbox {
        if from != self.current.discriminator {
            debug!(
                "Ignoring stale advance: from={} current={}",
                from, self.current.discriminator
            );
            return Vec::new();
        }
        self.advance_unchecked()
    }

    /// Operator skip; always advances.
    pub fn skip(&mut self) -> Outbox {
        self.advance_unchecked()
    }

    fn advance_unchecked(&mut self) -> Outbox {
        let next = self.queue.pop_front();
        self.current.replace(next);
        self.play_state = self.play_state.reset();
        vec![
            self.item_changed(),
            self.queue_changed(),
            ServerMessage::PlayStateChanged(self.play_state),
        ]
    }

    /// Appends to the queue, starting it if nothing is current.
    pub fn enqueue(&mut self, id: ItemId) -> Outbox {
        self.queue.push(id);
        if self.current.is_idle() {
            self.advance_unchecked()
        } else {
            vec![self.queue_changed()]
        }
    }

    /// Replaces the queue, dropping ids that are not playable.
    pub fn replace_queue(&mut self, ids: Vec<ItemId>) -> Outbox {
        let catalog = &self.catalog;
        let dropped = self.queue.replace_filtered(ids, |id| catalog.is_playable(id));
        if dropped > 0 {
            debug!("Queue replace dropped {} unknown ids", dropped);
        }
        vec![self.queue_changed()]
    }

    /// First half of a catalog request.
    ///
    /// Loaded items are enqueued at once. Unknown, deleted and failed items get
    /// a fresh placeholder, which also blocks duplicate fetches until
    /// [`Room::finish_download`] runs.
    pub fn begin_request(&mut self, id: &ItemId) -> (RequestOutcome, Outbox) {
        let (playable, in_flight) = self
            .catalog
            .get(id)
            .map_or((false, false), |e| (e.is_playable(), e.is_in_flight()));

        if playable {
            (RequestOutcome::Enqueued, self.enqueue(id.clone()))
        } else if in_flight {
            (RequestOutcome::AlreadyInFlight, Vec::new())
        } else {
            self.catalog.insert(id.clone(), CatalogEntry::placeholder(id));
            (RequestOutcome::FetchStarted, self.entry_changed(id))
        }
    }

    /// Records fetched metadata, or stand-in text when the fetch failed.
    pub fn apply_metadata(&mut self, id: &ItemId, meta: Option<ItemMetadata>) -> Outbox {
        self.catalog
            .entry_or_placeholder(id)
            .apply_metadata(meta.unwrap_or_else(ItemMetadata::missing));
        self.entry_changed(id)
    }

    /// Records the download result and queues the item on success.
    pub fn finish_download(&mut self, id: &ItemId, format: Option<MediaFormat>) -> Outbox {
        let entry = self.catalog.entry_or_placeholder(id);
        match format {
            Some(format) => {
                entry.mark_loaded(format);
                let mut out = self.entry_changed(id);
                out.extend(self.enqueue(id.clone()));
                out
            }
            None => {
                entry.mark_failed();
                self.entry_changed(id)
            }
        }
    }

    /// Installs reconciled startup entries and announces the changed ones.
    pub fn load_catalog(&mut self, catalog: Catalog, changed: &[ItemId]) -> Outbox {
        self.catalog = catalog;
        changed.iter().flat_map(|id| self.entry_changed(id)).collect()
    }
}
