use std::{io::SeekFrom, sync::Arc};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

use crate::{
    common::{
        ApiError,
        types::{ItemId, MediaFormat},
    },
    server::AppState,
};

/// Outcome of interpreting a `Range` header against a file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range; send the whole file.
    Full,
    /// Inclusive byte span.
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        match *self {
            Self::Partial { start, end } => end - start + 1,
            _ => 0,
        }
    }
}

/// Parses a single `bytes=` range. Malformed or multi-range headers are
/// ignored and yield [`ByteRange::Full`].
pub fn parse_range(header: &str, size: u64) -> ByteRange {
    let Some(ranges) = header.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if ranges.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = ranges.trim().split_once('-') else {
        return ByteRange::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        let Ok(suffix) = last.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || size == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: size.saturating_sub(suffix),
            end: size - 1,
        };
    }

    let Ok(start) = first.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if last.is_empty() {
        None
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return ByteRange::Full,
        }
    };

    if start >= size {
        return ByteRange::Unsatisfiable;
    }
    ByteRange::Partial {
        start,
        end: end.map_or(size - 1, |e| e.min(size - 1)),
    }
}

fn not_found(message: impl Into<String>, path: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(ApiError::not_found(message, path))).into_response()
}

fn internal(message: impl Into<String>, path: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::internal(message, path)),
    )
        .into_response()
}

/// Splits `{id}` / `{id}.webm` / `{id}.mp4`.
fn parse_file_name(file: &str) -> Option<ItemId> {
    let stem = match file.rsplit_once('.') {
        Some((stem, ext)) => {
            MediaFormat::from_ext(ext)?;
            stem
        }
        None => file,
    };
    ItemId::parse(stem)
}

/// GET /media/{file}
pub async fn serve_media(
    Path(file): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let path = format!("/media/{}", file);

    let Some(id) = parse_file_name(&file) else {
        return not_found("Malformed media id", &path);
    };

    let format = {
        let room = state.room.lock();
        match room.catalog().get(&id) {
            None => None,
            Some(entry) if !entry.is_playable() => {
                let reason = if entry.deleted {
                    "Item was deleted"
                } else if entry.failed {
                    "Item failed to download"
                } else {
                    "Item is not loaded yet"
                };
                return not_found(reason, &path);
            }
            Some(entry) => entry.format,
        }
    };
    let Some(format) = format else {
        return not_found("Unknown item", &path);
    };

    let disk_path = state.media.path_for(&id, format);
    let mut file = match tokio::fs::File::open(&disk_path).await {
        Ok(f) => f,
        Err(e) => {
            debug!("Media file {} unavailable: {}", disk_path.display(), e);
            return not_found("Media file is missing", &path);
        }
    };
    let size = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(e) => return internal(format!("Failed to stat media: {}", e), &path),
    };

    let range = headers
        .get(header::RANGE)
        .and_then(|h| h.to_str().ok())
        .map_or(ByteRange::Full, |h| parse_range(h, size));

    let builder = Response::builder()
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_TYPE, format.mime_type());

    let built = match range {
        ByteRange::Unsatisfiable => {
            let body = ApiError::range_not_satisfiable(format!("File size is {}", size), &path);
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{}", size))],
                Json(body),
            )
                .into_response();
        }
        ByteRange::Full => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, size)
            .body(Body::from_stream(ReaderStream::new(file))),
        ByteRange::Partial { start, end } => {
            if let Err(e) = file.seek(SeekFrom::Start(start)).await {
                return internal(format!("Failed to seek media: {}", e), &path);
            }
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, size))
                .header(header::CONTENT_LENGTH, range.len())
                .body(Body::from_stream(ReaderStream::new(file.take(range.len()))))
        }
    };

    built.unwrap_or_else(|e| {
        error!("Failed to build media response: {}", e);
        internal("Failed to build response", &path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Catalog, CatalogEntry, ItemMetadata, MediaDir, MediaFetcher, MemoryStore},
        configs::Config,
    };

    #[test]
    fn parses_supported_range_forms() {
        assert_eq!(parse_range("bytes=0-99", 1000), ByteRange::Partial { start: 0, end: 99 });
        assert_eq!(parse_range("bytes=900-", 1000), ByteRange::Partial { start: 900, end: 999 });
        assert_eq!(parse_range("bytes=-100", 1000), ByteRange::Partial { start: 900, end: 999 });
        assert_eq!(parse_range("bytes=-5000", 1000), ByteRange::Partial { start: 0, end: 999 });
        assert_eq!(parse_range("bytes=500-5000", 1000), ByteRange::Partial { start: 500, end: 999 });
        assert_eq!(ByteRange::Partial { start: 0, end: 99 }.len(), 100);
    }

    #[test]
    fn unsatisfiable_ranges() {
        assert_eq!(parse_range("bytes=1000-", 1000), ByteRange::Unsatisfiable);
        assert_eq!(parse_range("bytes=1000-1200", 1000), ByteRange::Unsatisfiable);
        assert_eq!(parse_range("bytes=-0", 1000), ByteRange::Unsatisfiable);
        assert_eq!(parse_range("bytes=0-", 0), ByteRange::Unsatisfiable);
    }

    #[test]
    fn malformed_ranges_fall_back_to_full() {
        for header in ["items=0-1", "bytes=abc", "bytes=5-1", "bytes=0-1,5-6", "bytes=x-", "bytes=-y"] {
            assert_eq!(parse_range(header, 1000), ByteRange::Full, "{header}");
        }
    }

    #[test]
    fn file_names_map_to_ids() {
        assert_eq!(parse_file_name("abc123"), Some(ItemId::from("abc123")));
        assert_eq!(parse_file_name("abc123.webm"), Some(ItemId::from("abc123")));
        assert_eq!(parse_file_name("abc123.mp4"), Some(ItemId::from("abc123")));
        assert_eq!(parse_file_name("abc123.exe"), None);
        assert_eq!(parse_file_name("abc123.m4v"), None);
        assert_eq!(parse_file_name("a b.mp4"), None);
    }

    struct NoFetcher;

    #[async_trait::async_trait]
    impl MediaFetcher for NoFetcher {
        async fn fetch_metadata(&self, _id: &ItemId) -> Option<ItemMetadata> {
            None
        }

        async fn download(&self, _id: &ItemId) -> Option<MediaFormat> {
            None
        }
    }

    async fn state_with_file(contents: &[u8]) -> Arc<AppState> {
        let mut config = Config::default();
        config.storage.data_dir = std::env::temp_dir().join(format!(
            "lockstep-media-route-{}",
            crate::common::SessionId::generate()
        ));
        tokio::fs::create_dir_all(&config.storage.data_dir).await.unwrap();

        let media = MediaDir::new(config.storage.data_dir.clone());
        let id = ItemId::from("abc123");
        tokio::fs::write(media.path_for(&id, MediaFormat::Mp4), contents)
            .await
            .unwrap();

        let state = AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(NoFetcher));
        let mut entry = CatalogEntry::placeholder(&id);
        entry.mark_loaded(MediaFormat::Mp4);
        let mut catalog = Catalog::new();
        catalog.insert(id, entry);
        state.room.lock().load_catalog(catalog, &[]);
        Arc::new(state)
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn serves_partial_content() {
        let state = state_with_file(b"0123456789").await;
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, "bytes=2-5".parse().unwrap());

        let response = serve_media(Path("abc123.mp4".into()), headers, State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-5/10");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(body_bytes(response).await, b"2345");

        let _ = tokio::fs::remove_dir_all(&state.config.storage.data_dir).await;
    }

    #[tokio::test]
    async fn serves_whole_file_without_range() {
        let state = state_with_file(b"0123456789").await;
        let response = serve_media(Path("abc123".into()), HeaderMap::new(), State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(body_bytes(response).await, b"0123456789");

        let _ = tokio::fs::remove_dir_all(&state.config.storage.data_dir).await;
    }

    #[tokio::test]
    async fn rejects_bad_requests() {
        let state = state_with_file(b"0123456789").await;

        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, "bytes=50-".parse().unwrap());
        let response = serve_media(Path("abc123".into()), headers, State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);

        let response = serve_media(Path("unknown".into()), HeaderMap::new(), State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = serve_media(Path("..%2fetc".into()), HeaderMap::new(), State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let _ = tokio::fs::remove_dir_all(&state.config.storage.data_dir).await;
    }
}
