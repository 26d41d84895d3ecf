//! Exact-match vertex lookup used for deduplicating insertion

use nalgebra::Point3;
use std::collections::HashMap;

/// Maps vertex positions to the index they were first inserted at
///
/// Keys are the IEEE-754 bit patterns of the three coordinates, so two
/// positions match only when they are bit-identical. There is no tolerance.
/// Note that `0.0` and `-0.0` are distinct keys.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    entries: HashMap<[u64; 3], u32>,
}

impl SpatialIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with room for `capacity` positions
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Look up the index stored for an exact position
    pub fn find(&self, position: &Point3<f64>) -> Option<u32> {
        self.entries.get(&key(position)).copied()
    }

    /// Record `index` for `position`
    ///
    /// An existing entry for the same position is kept, so the first
    /// insertion wins.
    pub fn insert(&mut self, position: &Point3<f64>, index: u32) {
        self.entries.entry(key(position)).or_insert(index);
    }

    /// Number of distinct positions stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key(position: &Point3<f64>) -> [u64; 3] {
    [position.x.to_bits(), position.y.to_bits(), position.z.to_bits()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_after_insert() {
        let mut index = SpatialIndex::new();
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(index.find(&p), None);

        index.insert(&p, 7);
        assert_eq!(index.find(&p), Some(7));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_first_insertion_wins() {
        let mut index = SpatialIndex::new();
        let p = Point3::new(0.5, 0.5, 0.5);
        index.insert(&p, 1);
        index.insert(&p, 2);
        assert_eq!(index.find(&p), Some(1));
    }

    #[test]
    fn test_no_tolerance() {
        let mut index = SpatialIndex::new();
        index.insert(&Point3::new(1.0, 1.0, 1.0), 0);
        assert_eq!(index.find(&Point3::new(1.0 + f64::EPSILON, 1.0, 1.0)), None);
        assert_eq!(index.find(&Point3::new(1.0, 1.0, -1.0)), None);
    }
}
