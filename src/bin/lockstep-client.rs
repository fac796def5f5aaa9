use lockstep::{
    client::{self, ClientMirror},
    common::{logger, types::AnyResult},
    configs::LoggingConfig,
};
use tracing::info;

#[tokio::main]
async fn main() -> AnyResult<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:3000/ws".to_string());

    logger::init(&LoggingConfig::default());

    let mut mirror = ClientMirror::new();
    mirror.on_item.subscribe(|item| {
        info!(
            "now playing {:?} (#{})",
            item.id.as_ref().map(|id| id.as_str()),
            item.discriminator
        )
    });
    mirror
        .on_play_state
        .subscribe(|state| info!("play state {:?}", state));
    mirror.on_volume.subscribe(|volume| info!("volume {:.2}", volume));
    mirror
        .on_queue
        .subscribe(|queue| info!("queue has {} items", queue.len()));
    mirror.on_catalog_entry.subscribe(|(id, entry)| {
        info!(
            "{}: {} by {} loaded={} failed={} deleted={}",
            id, entry.title, entry.uploader, entry.loaded, entry.failed, entry.deleted
        )
    });

    client::run(&url, mirror).await
}
