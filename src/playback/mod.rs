pub mod state;

pub use state::PlayState;

use crate::common::types::ItemId;

/// The item currently loaded into the player, tagged with its epoch.
///
/// `discriminator` changes (wrapping) on every item change, so a
/// "finished, play next" signal that refers to an older epoch is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentItem {
    pub id: Option<ItemId>,
    pub discriminator: u32,
}

impl CurrentItem {
    pub fn is_idle(&self) -> bool {
        self.id.is_none()
    }

    /// Moves to `next`, starting a new epoch.
    pub fn replace(&mut self, next: Option<ItemId>) {
        self.id = next;
        self.discriminator = self.discriminator.wrapping_add(1);
    }
}
