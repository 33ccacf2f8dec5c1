//! Per-virtual-user record of texts known to exist on the server.

use rand::Rng;
use std::collections::HashMap;

use crate::selection::pick_index;

/// Identifier → text cache with O(1) uniform random selection.
///
/// An entry is present only between a confirmed create and a confirmed
/// delete. The cache is never shared between virtual users.
#[derive(Debug, Clone, Default)]
pub struct RecordCache {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.positions
            .get(id)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    /// Insert a record, returning the previous text if the id was known.
    pub fn insert(&mut self, id: String, text: String) -> Option<String> {
        if let Some(&pos) = self.positions.get(&id) {
            return Some(std::mem::replace(&mut self.entries[pos].1, text));
        }
        self.positions.insert(id.clone(), self.entries.len());
        self.entries.push((id, text));
        None
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        let pos = self.positions.remove(id)?;
        let (_, text) = self.entries.swap_remove(pos);
        if let Some((moved_id, _)) = self.entries.get(pos) {
            self.positions.insert(moved_id.clone(), pos);
        }
        Some(text)
    }

    /// Uniformly random `(id, text)` pair.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(&str, &str)> {
        pick_index(self.entries.len(), rng).map(|pos| {
            let (id, text) = &self.entries[pos];
            (id.as_str(), text.as_str())
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(id, text)| (id.as_str(), text.as_str()))
    }
}
