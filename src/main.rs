use std::sync::Arc;

use lockstep::{
    catalog::{JsonFileStore, YtDlpFetcher, reconcile},
    common::{
        banner::{BannerInfo, print_banner},
        logger,
        types::AnyResult,
    },
    configs::Config,
    server::AppState,
    transport,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    logger::init(&config.logging);

    let listen = config.listen_address();
    print_banner(&BannerInfo::default(), &listen);

    tokio::fs::create_dir_all(&config.storage.data_dir).await?;

    let persistence = Arc::new(JsonFileStore::new(config.storage.catalog_path()));
    let media = lockstep::catalog::MediaDir::new(config.storage.data_dir.clone());
    let fetcher = Arc::new(YtDlpFetcher::new(config.fetcher.clone(), media));
    let state = Arc::new(AppState::new(config, persistence, fetcher));

    let raw = match state.store.load().await {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to load catalog, starting empty: {}", e);
            Default::default()
        }
    };
    let reconciled = reconcile(raw, &state.media, state.fetcher.as_ref()).await;
    info!(
        "Loaded {} catalog entries ({} changed, {} dropped)",
        reconciled.catalog.len(),
        reconciled.changed.len(),
        reconciled.dropped
    );
    if reconciled.needs_save() {
        let changed = reconciled.changed;
        let catalog = reconciled.catalog;
        state.apply_catalog(|room| room.load_catalog(catalog, &changed));
    } else {
        state.apply(|room| room.load_catalog(reconciled.catalog, &[]));
    }

    let app = transport::http_server::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!("Listening on {}", listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.store.flush().await;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
