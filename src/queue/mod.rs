use std::collections::VecDeque;

use crate::common::types::ItemId;

/// Pending items in play order. The same id may appear more than once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queue {
    items: VecDeque<ItemId>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: ItemId) {
        self.items.push_back(id);
    }

    pub fn pop_front(&mut self) -> Option<ItemId> {
        self.items.pop_front()
    }

    /// Replaces the queue with `ids`, keeping only those `keep` accepts.
    ///
    /// Submitted order is preserved. Returns how many ids were dropped.
    pub fn replace_filtered(
        &mut self,
        ids: impl IntoIterator<Item = ItemId>,
        keep: impl Fn(&ItemId) -> bool,
    ) -> usize {
        let mut dropped = 0;
        self.items = ids
            .into_iter()
            .filter(|id| {
                let ok = keep(id);
                if !ok {
                    dropped += 1;
                }
                ok
            })
            .collect();
        dropped
    }

    pub fn to_vec(&self) -> Vec<ItemId> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<ItemId> {
        raw.iter().map(|s| ItemId::from(*s)).collect()
    }

    #[test]
    fn fifo_with_duplicates() {
        let mut queue = Queue::new();
        queue.push("a".into());
        queue.push("b".into());
        queue.push("a".into());
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop_front(), Some(ItemId::from("a")));
        assert_eq!(queue.to_vec(), ids(&["b", "a"]));
    }

    #[test]
    fn replace_drops_only_rejected_ids() {
        let mut queue = Queue::new();
        queue.push("old".into());
        let dropped = queue.replace_filtered(ids(&["c", "ghost", "a", "c"]), |id| id.as_str() != "ghost");
        assert_eq!(dropped, 1);
        assert_eq!(queue.to_vec(), ids(&["c", "a", "c"]));
    }
}
