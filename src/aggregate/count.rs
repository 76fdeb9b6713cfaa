use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// String-keyed counter that remembers first-insertion order.
///
/// Distribution output sorts by count descending with ties broken by the
/// order keys first appeared in the stream, so the container has to keep
/// that order alongside O(1) increments.
#[derive(Debug, Clone, Default)]
pub struct CountMap {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl CountMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to the counter for `key`, appending it on first use.
    pub fn increment(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&i) => {
                if let Some(entry) = self.entries.get_mut(i) {
                    entry.1 = entry.1.saturating_add(1);
                }
            }
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    /// Current count for `key` (0 when never seen).
    pub fn get(&self, key: &str) -> u64 {
        self.index
            .get(key)
            .and_then(|&i| self.entries.get(i))
            .map_or(0, |entry| entry.1)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Iterate `(key, count)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(key, count)| (key.as_str(), *count))
    }

    /// `(key, count)` pairs sorted by count descending; the stable sort
    /// keeps insertion order for equal counts.
    pub fn sorted_desc(&self) -> Vec<(&str, u64)> {
        let mut pairs: Vec<(&str, u64)> = self.iter().collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1));
        pairs
    }
}

impl Serialize for CountMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}
