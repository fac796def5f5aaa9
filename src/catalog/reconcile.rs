use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{Catalog, CatalogEntry, MediaDir, MediaFetcher, entry::UNKNOWN_LENGTH};
use crate::common::types::{ItemId, MediaFormat};

const FAILED_TEXT: &str = "<failed>";

/// Outcome of checking persisted entries against the media directory.
#[derive(Debug, Default)]
pub struct Reconciled {
    pub catalog: Catalog,
    /// Ids whose entry differs from what was stored.
    pub changed: Vec<ItemId>,
    /// Stored keys that were not valid ids and were discarded.
    pub dropped: usize,
}

impl Reconciled {
    pub fn needs_save(&self) -> bool {
        !self.changed.is_empty() || self.dropped > 0
    }
}

/// Decodes one stored value field by field.
///
/// Returns the entry and whether any field had to fall back.
fn decode_entry(value: &Value) -> (CatalogEntry, bool) {
    let Some(obj) = value.as_object() else {
        return (
            CatalogEntry {
                title: FAILED_TEXT.to_string(),
                uploader: FAILED_TEXT.to_string(),
                length_seconds: UNKNOWN_LENGTH,
                loaded: false,
                failed: true,
                deleted: false,
                format: None,
            },
            true,
        );
    };

    let mut repaired = false;
    let mut text = |key: &str| match obj.get(key).and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => {
            repaired = true;
            FAILED_TEXT.to_string()
        }
    };
    let title = text("title");
    let uploader = text("uploader");

    let length_seconds = match obj.get("length").and_then(Value::as_f64) {
        Some(len) if len.is_finite() => len,
        _ => {
            repaired = true;
            UNKNOWN_LENGTH
        }
    };

    let mut flag = |key: &str| match obj.get(key).and_then(Value::as_bool) {
        Some(b) => b,
        None => {
            repaired = true;
            false
        }
    };
    let loaded = flag("loaded");
    let failed = flag("failed");
    let deleted = flag("deleted");

    let format = match obj.get("format") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let parsed = v.as_str().and_then(MediaFormat::from_ext);
            if parsed.is_none() {
                repaired = true;
            }
            parsed
        }
    };

    (
        CatalogEntry {
            title,
            uploader,
            length_seconds,
            loaded,
            failed,
            deleted,
            format,
        },
        repaired,
    )
}

/// Brings one decoded entry in line with the media directory.
///
/// Returns the entry and whether it differs from what was stored.
async fn check_entry(
    id: &ItemId,
    value: &Value,
    media: &MediaDir,
    fetcher: &dyn MediaFetcher,
) -> (CatalogEntry, bool) {
    let (mut entry, repaired) = decode_entry(value);
    let before = entry.clone();

    if repaired {
        warn!("Catalog entry {} is malformed, refetching metadata", id);
        entry.loaded = false;
        match fetcher.fetch_metadata(id).await {
            Some(meta) => {
                entry.apply_metadata(meta);
                entry.deleted = true;
            }
            None => entry.failed = true,
        }
    } else if entry.loaded {
        match media.find(id).await {
            Some(format) => entry.format = Some(format),
            None => {
                warn!("Media for {} is missing, marking deleted", id);
                entry.mark_deleted();
            }
        }
    } else if entry.is_in_flight() {
        info!("Catalog entry {} was interrupted mid-fetch, marking failed", id);
        entry.failed = true;
    }

    let changed = repaired || entry != before;
    (entry, changed)
}

/// Rebuilds the catalog from raw stored values.
///
/// Malformed entries get their metadata fetched again; entries that claim to
/// be loaded are checked against the media directory; entries left mid-fetch
/// by a previous run are marked failed so they can be requested again.
/// Entries are checked concurrently.
pub async fn reconcile(
    raw: Map<String, Value>,
    media: &MediaDir,
    fetcher: &dyn MediaFetcher,
) -> Reconciled {
    let mut out = Reconciled::default();
    let mut valid = Vec::with_capacity(raw.len());

    for (key, value) in raw {
        match ItemId::parse(&key) {
            Some(id) => valid.push((id, value)),
            None => {
                warn!("Dropping catalog entry with invalid id {:?}", key);
                out.dropped += 1;
            }
        }
    }

    let checked = join_all(
        valid
            .iter()
            .map(|(id, value)| check_entry(id, value, media, fetcher)),
    )
    .await;

    for ((id, _), (entry, changed)) in valid.into_iter().zip(checked) {
        if changed {
            out.changed.push(id.clone());
        }
        out.catalog.insert(id, entry);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemMetadata;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedFetcher(Option<ItemMetadata>);

    #[async_trait]
    impl MediaFetcher for FixedFetcher {
        async fn fetch_metadata(&self, _id: &ItemId) -> Option<ItemMetadata> {
            self.0.clone()
        }

        async fn download(&self, _id: &ItemId) -> Option<MediaFormat> {
            None
        }
    }

    fn temp_media() -> MediaDir {
        let root = std::env::temp_dir().join(format!(
            "lockstep-reconcile-{}",
            crate::common::SessionId::generate()
        ));
        std::fs::create_dir_all(&root).unwrap();
        MediaDir::new(root)
    }

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn good(loaded: bool, failed: bool, deleted: bool) -> Value {
        json!({
            "title": "Song",
            "uploader": "Band",
            "length": 200,
            "loaded": loaded,
            "failed": failed,
            "deleted": deleted,
            "format": "webm"
        })
    }

    #[tokio::test]
    async fn missing_media_is_marked_deleted() {
        let media = temp_media();
        std::fs::write(media.path_for(&ItemId::from("present"), MediaFormat::Webm), b"x").unwrap();

        let out = reconcile(
            raw(json!({ "present": good(true, false, false), "gone": good(true, false, false) })),
            &media,
            &FixedFetcher(None),
        )
        .await;

        assert_eq!(out.changed, vec![ItemId::from("gone")]);
        assert!(out.catalog.is_playable(&ItemId::from("present")));
        let gone = out.catalog.get(&ItemId::from("gone")).unwrap();
        assert!(gone.deleted);
        assert!(!gone.loaded);

        let _ = std::fs::remove_dir_all(media.root());
    }

    #[tokio::test]
    async fn malformed_entries_fall_back_per_field() {
        let media = temp_media();
        let out = reconcile(
            raw(json!({
                "partial": { "title": "Kept", "length": "long", "loaded": true },
                "junk": 42
            })),
            &media,
            &FixedFetcher(None),
        )
        .await;

        let partial = out.catalog.get(&ItemId::from("partial")).unwrap();
        assert_eq!(partial.title, "Kept");
        assert_eq!(partial.uploader, "<failed>");
        assert_eq!(partial.length_seconds, -1.0);
        assert!(partial.failed);
        assert!(!partial.loaded);

        let junk = out.catalog.get(&ItemId::from("junk")).unwrap();
        assert!(junk.failed);
        assert_eq!(junk.title, "<failed>");
        assert_eq!(out.changed.len(), 2);

        let _ = std::fs::remove_dir_all(media.root());
    }

    #[tokio::test]
    async fn repaired_entry_with_metadata_is_deleted() {
        let media = temp_media();
        let meta = ItemMetadata {
            title: "Fresh".into(),
            uploader: "Uploader".into(),
            length_seconds: 60.0,
        };
        let out = reconcile(
            raw(json!({ "abc": { "title": "Old", "format": "avi" } })),
            &media,
            &FixedFetcher(Some(meta)),
        )
        .await;

        let entry = out.catalog.get(&ItemId::from("abc")).unwrap();
        assert_eq!(entry.title, "Fresh");
        assert_eq!(entry.length_seconds, 60.0);
        assert!(entry.deleted);
        assert!(!entry.failed);
        assert_eq!(entry.format, None);

        let _ = std::fs::remove_dir_all(media.root());
    }

    #[tokio::test]
    async fn interrupted_fetch_becomes_failed() {
        let media = temp_media();
        let out = reconcile(
            raw(json!({
                "stale": good(false, false, false),
                "done": good(false, true, false),
                "../bad": good(true, false, false)
            })),
            &media,
            &FixedFetcher(None),
        )
        .await;

        assert!(out.catalog.get(&ItemId::from("stale")).unwrap().failed);
        assert_eq!(out.changed, vec![ItemId::from("stale")]);
        assert_eq!(out.dropped, 1);
        assert!(out.needs_save());
        assert_eq!(out.catalog.len(), 2);

        let _ = std::fs::remove_dir_all(media.root());
    }

    struct BarrierFetcher(tokio::sync::Barrier);

    #[async_trait]
    impl MediaFetcher for BarrierFetcher {
        async fn fetch_metadata(&self, _id: &ItemId) -> Option<ItemMetadata> {
            self.0.wait().await;
            None
        }

        async fn download(&self, _id: &ItemId) -> Option<MediaFormat> {
            None
        }
    }

    #[tokio::test]
    async fn repaired_entries_are_refetched_concurrently() {
        let media = temp_media();
        let fetcher = BarrierFetcher(tokio::sync::Barrier::new(2));
        let out = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            reconcile(raw(json!({ "one": 1, "two": 2 })), &media, &fetcher),
        )
        .await
        .unwrap();

        assert_eq!(out.changed, vec![ItemId::from("one"), ItemId::from("two")]);

        let _ = std::fs::remove_dir_all(media.root());
    }
}
