use std::collections::BTreeMap;

use crate::common::types::ItemId;

pub mod entry;
pub mod fetcher;
pub mod media;
pub mod reconcile;
pub mod store;

pub use entry::{CatalogEntry, ItemMetadata};
pub use fetcher::{FetchError, MediaFetcher, YtDlpFetcher};
pub use media::MediaDir;
pub use reconcile::{Reconciled, reconcile};
pub use store::{CatalogPersistence, CatalogStore, JsonFileStore, MemoryStore, StoreError};

/// What gets handed to persistence.
pub type CatalogSnapshot = BTreeMap<ItemId, CatalogEntry>;

/// Every item ever requested, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: CatalogSnapshot,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ItemId) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &ItemId) -> Option<&mut CatalogEntry> {
        self.entries.get_mut(id)
    }

    pub fn insert(&mut self, id: ItemId, entry: CatalogEntry) -> Option<CatalogEntry> {
        self.entries.insert(id, entry)
    }

    /// Entry for `id`, inserting a placeholder if it is unknown.
    pub fn entry_or_placeholder(&mut self, id: &ItemId) -> &mut CatalogEntry {
        self.entries
            .entry(id.clone())
            .or_insert_with(|| CatalogEntry::placeholder(id))
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.contains_key(id)
    }

    /// Present, downloaded and not removed out-of-band.
    pub fn is_playable(&self, id: &ItemId) -> bool {
        self.entries.get(id).is_some_and(CatalogEntry::is_playable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &CatalogEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.entries.clone()
    }
}

impl From<CatalogSnapshot> for Catalog {
    fn from(entries: CatalogSnapshot) -> Self {
        Self { entries }
    }
}
