use tracing::{debug, info, warn};

use super::{AppState, Session};
use crate::{
    clock::local_now_ms,
    common::types::ItemId,
    protocol::{ClientMessage, ServerMessage},
    room::RequestOutcome,
};

/// Handles one decoded request from `session` to completion.
pub async fn handle_client_message(state: &AppState, session: &Session, msg: ClientMessage) {
    match msg {
        ClientMessage::Enqueue(id) => request_item(state, id).await,
        ClientMessage::Skip => {
            info!("Skip requested by {}", session.session_id);
            state.apply(|room| room.skip());
        }
        ClientMessage::Advance(from) => state.apply(|room| room.advance(from)),
        ClientMessage::SetPlayState(play_state) => {
            state.apply(|room| room.set_play_state(play_state, local_now_ms()))
        }
        ClientMessage::SetVolume(volume) => state.apply(|room| room.set_volume(volume)),
        ClientMessage::ReplaceQueue(ids) => state.apply(|room| room.replace_queue(ids)),
        ClientMessage::Sync => state.send_sync(session),
        ClientMessage::Ping(sent) => {
            session.send_message(&ServerMessage::PingEcho {
                sent,
                server_time: local_now_ms(),
            });
        }
    }
}

/// Makes `id` available and queues it, fetching and downloading if needed.
///
/// A placeholder entry is written before the first await, so a concurrent
/// request for the same id sees it in flight and returns immediately.
pub async fn request_item(state: &AppState, id: ItemId) {
    let outcome = state.update(|room| {
        let (outcome, out) = room.begin_request(&id);
        if outcome == RequestOutcome::FetchStarted {
            state.store.request_save(room.catalog().snapshot());
        }
        (outcome, out)
    });

    match outcome {
        RequestOutcome::Enqueued => {
            info!("Enqueued cached item {}", id);
            return;
        }
        RequestOutcome::AlreadyInFlight => {
            debug!("Request for {} is already in flight", id);
            return;
        }
        RequestOutcome::FetchStarted => info!("Fetching item {}", id),
    }

    let meta = state.fetcher.fetch_metadata(&id).await;
    if meta.is_none() {
        warn!("No metadata for {}, continuing with placeholder text", id);
    }
    state.apply_catalog(|room| room.apply_metadata(&id, meta));

    let format = state.fetcher.download(&id).await;
    match format {
        Some(format) => info!("Downloaded {} as {}", id, format.as_ext()),
        None => warn!("Download of {} failed", id),
    }
    state.apply_catalog(|room| room.finish_download(&id, format));
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        catalog::{ItemMetadata, MediaFetcher, MemoryStore},
        common::types::{MediaFormat, SessionId},
        configs::Config,
        playback::PlayState,
    };

    #[derive(Default)]
    struct CountingFetcher {
        metadata_calls: AtomicUsize,
        download_calls: AtomicUsize,
        fail_download: bool,
    }

    #[async_trait]
    impl MediaFetcher for CountingFetcher {
        async fn fetch_metadata(&self, _id: &ItemId) -> Option<ItemMetadata> {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Some(ItemMetadata {
                title: "Title".into(),
                uploader: "Uploader".into(),
                length_seconds: 180.0,
            })
        }

        async fn download(&self, _id: &ItemId) -> Option<MediaFormat> {
            self.download_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            (!self.fail_download).then_some(MediaFormat::Webm)
        }
    }

    struct Harness {
        state: AppState,
        store: Arc<MemoryStore>,
        fetcher: Arc<CountingFetcher>,
        session: Arc<Session>,
        rx: flume::Receiver<String>,
    }

    fn harness(fetcher: CountingFetcher) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(fetcher);
        let state = AppState::new(Config::default(), store.clone(), fetcher.clone());
        let (tx, rx) = flume::unbounded();
        let session = Arc::new(Session::new(SessionId::generate(), tx));
        state.attach(session.clone());
        Harness {
            state,
            store,
            fetcher,
            session,
            rx,
        }
    }

    fn drain(rx: &flume::Receiver<String>) -> Vec<ServerMessage> {
        rx.try_iter()
            .map(|frame| ServerMessage::decode(&frame).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn enqueue_fetches_downloads_and_starts() {
        let h = harness(CountingFetcher::default());
        drain(&h.rx);

        handle_client_message(&h.state, &h.session, ClientMessage::Enqueue("abc123".into())).await;

        let events = drain(&h.rx);
        assert!(events.contains(&ServerMessage::ItemChanged {
            id: Some("abc123".into()),
            discriminator: 1,
        }));
        assert_eq!(
            events.last(),
            Some(&ServerMessage::PlayStateChanged(PlayState::Paused {
                time_at: 0.0,
                rate: 1.0
            }))
        );

        let id = ItemId::from("abc123");
        {
            let room = h.state.room.lock();
            let entry = room.catalog().get(&id).unwrap();
            assert!(entry.loaded);
            assert_eq!(entry.title, "Title");
            assert_eq!(room.current().id, Some(id.clone()));
        }

        h.state.store.flush().await;
        assert_eq!(h.store.raw()["abc123"]["loaded"], true);
    }

    #[tokio::test]
    async fn concurrent_requests_fetch_once() {
        let h = harness(CountingFetcher::default());
        let id = ItemId::from("abc123");

        tokio::join!(
            request_item(&h.state, id.clone()),
            request_item(&h.state, id.clone())
        );

        assert_eq!(h.fetcher.metadata_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.fetcher.download_calls.load(Ordering::SeqCst), 1);
        assert!(h.state.room.lock().queue().is_empty());
    }

    #[tokio::test]
    async fn failed_download_never_queues() {
        let h = harness(CountingFetcher {
            fail_download: true,
            ..CountingFetcher::default()
        });
        request_item(&h.state, "abc123".into()).await;

        let room = h.state.room.lock();
        assert!(room.catalog().get(&ItemId::from("abc123")).unwrap().failed);
        assert!(room.current().is_idle());
        assert!(room.queue().is_empty());
    }

    #[tokio::test]
    async fn sync_and_ping_answer_only_the_sender() {
        let h = harness(CountingFetcher::default());
        let connect = drain(&h.rx);
        assert_eq!(connect.len(), 4);

        let (tx, rx) = flume::unbounded();
        let asker = Session::new(SessionId::generate(), tx);
        handle_client_message(&h.state, &asker, ClientMessage::Sync).await;
        handle_client_message(&h.state, &asker, ClientMessage::Ping(42.0)).await;

        let got = drain(&rx);
        assert_eq!(got.len(), 5);
        assert!(matches!(got[4], ServerMessage::PingEcho { sent, .. } if sent == 42.0));
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn queue_replace_reorders_around_invalid_ids() {
        let h = harness(CountingFetcher::default());
        for id in ["a", "b", "c"] {
            request_item(&h.state, id.into()).await;
        }
        assert_eq!(
            h.state.room.lock().queue().to_vec(),
            vec![ItemId::from("b"), ItemId::from("c")]
        );
        drain(&h.rx);

        let request = ClientMessage::decode(r#"["q", ["c", "not a valid id!", "b"]]"#).unwrap();
        handle_client_message(&h.state, &h.session, request).await;

        let order = vec![ItemId::from("c"), ItemId::from("b")];
        assert_eq!(h.state.room.lock().queue().to_vec(), order);
        assert_eq!(drain(&h.rx), vec![ServerMessage::QueueChanged(order)]);
    }

    #[tokio::test]
    async fn stale_advance_broadcasts_nothing() {
        let h = harness(CountingFetcher::default());
        request_item(&h.state, "abc123".into()).await;
        drain(&h.rx);

        handle_client_message(&h.state, &h.session, ClientMessage::Advance(1)).await;
        assert_eq!(drain(&h.rx).len(), 3);
        handle_client_message(&h.state, &h.session, ClientMessage::Advance(1)).await;
        assert!(drain(&h.rx).is_empty());
    }
}
