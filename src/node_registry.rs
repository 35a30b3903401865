//! A compact registry of lattice coordinates.
//!
//! Dense storage is used for every per-node field of the reconstruction. When only a
//! sparse subset of lattice locations is active (e.g. the grid edges crossed by an
//! isosurface), this registry assigns them consecutive indices instead.

use fnv::FnvHasher;
use na::Point3;
use std::collections::HashMap;
use std::hash::BuildHasher;

/// Number of bits used by each coordinate of a packed key.
pub const COORD_BITS: u32 = 21;
const COORD_MASK: u64 = (1 << COORD_BITS) - 1;

/// Fixed-key FNV hasher, so iteration orders are reproducible across runs.
#[derive(Copy, Clone, Debug, Default)]
pub struct DeterministicState;

impl BuildHasher for DeterministicState {
    type Hasher = FnvHasher;

    fn build_hasher(&self) -> FnvHasher {
        FnvHasher::with_key(1820)
    }
}

/// Packs three lattice coordinates into a single integer key.
///
/// Each coordinate must be smaller than `2^COORD_BITS`.
pub fn pack_key(coord: &Point3<u32>) -> u64 {
    debug_assert!(coord.iter().all(|e| u64::from(*e) <= COORD_MASK));
    (u64::from(coord.x) << (2 * COORD_BITS))
        | (u64::from(coord.y) << COORD_BITS)
        | u64::from(coord.z)
}

/// Inverse of [`pack_key`].
pub fn unpack_key(key: u64) -> Point3<u32> {
    Point3::new(
        ((key >> (2 * COORD_BITS)) & COORD_MASK) as u32,
        ((key >> COORD_BITS) & COORD_MASK) as u32,
        (key & COORD_MASK) as u32,
    )
}

/// Maps lattice coordinates to compact indices, in insertion order.
#[derive(Clone, Debug, Default)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NodeRegistry {
    indices: HashMap<u64, usize, DeterministicState>,
    ordered_keys: Vec<u64>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered coordinates.
    pub fn len(&self) -> usize {
        self.ordered_keys.len()
    }

    /// Is this registry empty?
    pub fn is_empty(&self) -> bool {
        self.ordered_keys.is_empty()
    }

    /// The compact index of `coord`, if it was registered.
    pub fn get(&self, coord: &Point3<u32>) -> Option<usize> {
        self.indices.get(&pack_key(coord)).copied()
    }

    /// Returns the compact index of `coord`, registering it first if needed.
    ///
    /// The returned flag is `true` if `coord` was not registered before.
    pub fn insert_or_get(&mut self, coord: &Point3<u32>) -> (usize, bool) {
        let key = pack_key(coord);
        let next_id = self.ordered_keys.len();
        let id = *self.indices.entry(key).or_insert(next_id);

        if id == next_id {
            self.ordered_keys.push(key);
            (id, true)
        } else {
            (id, false)
        }
    }

    /// The registered coordinates, ordered by compact index.
    pub fn ordered_coords(&self) -> impl Iterator<Item = Point3<u32>> + '_ {
        self.ordered_keys.iter().map(|key| unpack_key(*key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack() {
        for coord in [
            Point3::new(0, 0, 0),
            Point3::new(1, 2, 3),
            Point3::new(513, 0, 77),
            Point3::new((1 << COORD_BITS) - 1, 5, (1 << COORD_BITS) - 1),
        ] {
            assert_eq!(unpack_key(pack_key(&coord)), coord);
        }

        assert_ne!(
            pack_key(&Point3::new(1, 0, 0)),
            pack_key(&Point3::new(0, 1, 0))
        );
    }

    #[test]
    fn compact_indices_in_insertion_order() {
        let mut registry = NodeRegistry::new();
        let a = Point3::new(4, 1, 9);
        let b = Point3::new(0, 0, 0);

        assert!(registry.is_empty());
        assert_eq!(registry.insert_or_get(&a), (0, true));
        assert_eq!(registry.insert_or_get(&b), (1, true));
        assert_eq!(registry.insert_or_get(&a), (0, false));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&b), Some(1));
        assert_eq!(registry.get(&Point3::new(1, 1, 1)), None);
        assert_eq!(registry.ordered_coords().collect::<Vec<_>>(), vec![a, b]);
    }
}
