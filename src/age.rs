use linked_hash_map::LinkedHashMap;

/// `AgeList` tracks the recency of a fixed set of slot indices `0..len` for least-recently-used
/// victimization. The list is seeded with every index at construction and never gains or loses
/// one, so it is always a permutation of the slots it covers and a victim always exists.
///
/// Internally the front of the map is the least recently used slot and the back the most recent.
/// Seeding inserts indices in ascending order, which makes slot 0 the first victim.
#[derive(Debug, Clone)]
pub struct AgeList(LinkedHashMap<usize, ()>);

impl AgeList {
    /// Create a list covering `0..len`.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero, since an empty list can never produce a victim.
    pub fn seeded(len: usize) -> Self {
        assert!(len > 0, "an age list must cover at least one slot");
        let mut map = LinkedHashMap::with_capacity(len);
        (0..len).for_each(|index| {
            map.insert(index, ());
        });
        Self(map)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The least recently used slot, i.e. the next eviction victim. The slot keeps its position
    /// until it is touched.
    pub fn least_recent(&self) -> usize {
        *self
            .0
            .front()
            .expect("age list always covers every slot")
            .0
    }

    /// Promote a slot to most recently used.
    pub fn touch(&mut self, index: usize) {
        let found = self.0.get_refresh(&index).is_some();
        debug_assert!(found, "slot {index} is not covered by this age list");
    }

    /// Demote a slot to least recently used so that it becomes the next victim.
    pub fn demote(&mut self, index: usize) {
        if self.0.remove(&index).is_none() {
            return;
        }
        let rest: Vec<usize> = self.0.keys().copied().collect();
        self.0.clear();
        self.0.insert(index, ());
        rest.into_iter().for_each(|slot| {
            self.0.insert(slot, ());
        });
    }

    /// Iterate from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.keys().copied()
    }
}
