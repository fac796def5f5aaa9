use std::collections::BTreeMap;

use tracing::debug;

use super::events::EventBinder;
use crate::{
    catalog::CatalogEntry,
    clock::{ClockEstimator, ClockSample, PingSchedule},
    common::types::ItemId,
    playback::{CurrentItem, PlayState},
    protocol::{ClientMessage, ServerMessage},
};

/// Local copy of the room, kept current from server events.
#[derive(Default)]
pub struct ClientMirror {
    pub clock: ClockEstimator,
    schedule: PingSchedule,
    catalog: BTreeMap<ItemId, CatalogEntry>,
    queue: Vec<ItemId>,
    current: CurrentItem,
    play_state: PlayState,
    volume: f64,

    pub on_item: EventBinder<CurrentItem>,
    pub on_play_state: EventBinder<PlayState>,
    pub on_volume: EventBinder<f64>,
    pub on_queue: EventBinder<Vec<ItemId>>,
    pub on_catalog_entry: EventBinder<(ItemId, CatalogEntry)>,
}

impl ClientMirror {
    pub fn new() -> Self {
        Self::default()
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

    pub fn queue(&self) -> &[ItemId] {
        &self.queue
    }

    pub fn entry(&self, id: &ItemId) -> Option<&CatalogEntry> {
        self.catalog.get(id)
    }

    /// Applies one server event. `received_at` is the local clock on arrival.
    pub fn apply(&mut self, msg: ServerMessage, received_at: f64) {
        match msg {
            ServerMessage::ItemChanged { id, discriminator } => {
                self.current = CurrentItem { id, discriminator };
                self.on_item.dispatch(&self.current);
            }
            ServerMessage::PlayStateChanged(state) => {
                self.play_state = state;
                self.on_play_state.dispatch(&self.play_state);
            }
            ServerMessage::VolumeChanged(volume) => {
                self.volume = volume;
                self.on_volume.dispatch(&self.volume);
            }
            ServerMessage::QueueChanged(queue) => {
                self.queue = queue;
                self.on_queue.dispatch(&self.queue);
            }
            ServerMessage::CatalogEntryChanged { id, entry } => {
                self.catalog.insert(id.clone(), entry.clone());
                self.on_catalog_entry.dispatch(&(id, entry));
            }
            ServerMessage::PingEcho { sent, server_time } => {
                let sample = ClockSample::from_echo(sent, server_time, received_at);
                if !self.clock.record(sample) {
                    debug!("Discarding delayed ping echo, round trip {:.0}ms", sample.round_trip);
                }
            }
        }
    }

    /// Media position in milliseconds at local time `local_now`.
    pub fn position_at(&self, local_now: f64) -> f64 {
        self.play_state.position_at(self.clock.synchronized(local_now))
    }

    /// Ping to send on this interval tick, if any.
    pub fn ping_due(&mut self, local_now: f64) -> Option<ClientMessage> {
        self.schedule
            .tick(self.clock.recorded())
            .then_some(ClientMessage::Ping(local_now))
    }

    pub fn toggle_request(&self, local_now: f64) -> ClientMessage {
        ClientMessage::SetPlayState(self.play_state.toggled(self.clock.synchronized(local_now)))
    }

    pub fn seek_request(&self, position: f64, local_now: f64) -> ClientMessage {
        ClientMessage::SetPlayState(
            self.play_state
                .seeked(position, self.clock.synchronized(local_now)),
        )
    }

    pub fn rate_request(&self, rate: f64, local_now: f64) -> ClientMessage {
        ClientMessage::SetPlayState(
            self.play_state
                .with_rate(rate, self.clock.synchronized(local_now)),
        )
    }

    /// "Current item finished" for the item this client is showing.
    pub fn finished_request(&self) -> ClientMessage {
        ClientMessage::Advance(self.current.discriminator)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn applies_events_and_notifies() {
        let mut mirror = ClientMirror::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        mirror
            .on_item
            .subscribe(move |item| sink.lock().unwrap().push(item.discriminator));

        mirror.apply(
            ServerMessage::ItemChanged {
                id: Some("abc123".into()),
                discriminator: 1,
            },
            0.0,
        );
        mirror.apply(ServerMessage::QueueChanged(vec!["xyz789".into()]), 0.0);

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(mirror.queue(), &[ItemId::from("xyz789")]);
        assert_eq!(mirror.finished_request(), ClientMessage::Advance(1));
    }

    #[test]
    fn toggle_uses_synchronized_clock() {
        let mut mirror = ClientMirror::new();
        // server clock runs 400_000ms ahead
        mirror.apply(
            ServerMessage::PingEcho {
                sent: 599_950.0,
                server_time: 1_000_000.0,
            },
            600_050.0,
        );
        mirror.apply(
            ServerMessage::PlayStateChanged(PlayState::Paused {
                time_at: 30_000.0,
                rate: 1.0,
            }),
            600_050.0,
        );

        let request = mirror.toggle_request(600_000.0);
        assert_eq!(
            request,
            ClientMessage::SetPlayState(PlayState::Playing {
                time_start: 970_000.0,
                rate: 1.0
            })
        );
    }

    #[test]
    fn position_follows_play_state() {
        let mut mirror = ClientMirror::new();
        mirror.apply(
            ServerMessage::PlayStateChanged(PlayState::Playing {
                time_start: 1_000.0,
                rate: 2.0,
            }),
            0.0,
        );
        assert_eq!(mirror.position_at(2_000.0), 2_000.0);
        assert!(mirror.ping_due(0.0).is_some());
    }
}
