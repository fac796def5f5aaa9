use serde::{Deserialize, Serialize};

use crate::common::types::{ItemId, MediaFormat};

pub const UNKNOWN_LENGTH: f64 = -1.0;

/// Metadata reported by the external fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemMetadata {
    pub title: String,
    pub uploader: String,
    pub length_seconds: f64,
}

impl ItemMetadata {
    /// Stand-in used when the fetcher could not describe an item.
    pub fn missing() -> Self {
        Self {
            title: "<missing title>".to_string(),
            uploader: "<missing author>".to_string(),
            length_seconds: UNKNOWN_LENGTH,
        }
    }
}

/// Fetch/download lifecycle record for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub uploader: String,
    #[serde(rename = "length")]
    pub length_seconds: f64,
    pub loaded: bool,
    pub failed: bool,
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<MediaFormat>,
}

impl CatalogEntry {
    /// Entry created the moment an unknown id is first requested.
    pub fn placeholder(id: &ItemId) -> Self {
        Self {
            title: id.to_string(),
            uploader: "...".to_string(),
            length_seconds: UNKNOWN_LENGTH,
            loaded: false,
            failed: false,
            deleted: false,
            format: None,
        }
    }

    pub fn apply_metadata(&mut self, meta: ItemMetadata) {
        self.title = meta.title;
        self.uploader = meta.uploader;
        self.length_seconds = meta.length_seconds;
    }

    pub fn mark_loaded(&mut self, format: MediaFormat) {
        self.loaded = true;
        self.failed = false;
        self.format = Some(format);
    }

    pub fn mark_failed(&mut self) {
        self.loaded = false;
        self.failed = true;
    }

    pub fn mark_deleted(&mut self) {
        self.loaded = false;
        self.deleted = true;
    }

    /// A fetch or download for this entry has not finished yet.
    pub fn is_in_flight(&self) -> bool {
        !self.loaded && !self.failed && !self.deleted
    }

    /// Media is on disk and may be queued and served.
    pub fn is_playable(&self) -> bool {
        self.loaded && !self.failed && !self.deleted && self.format.is_some()
    }
}
