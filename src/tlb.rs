use crate::age::AgeList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    page: usize,
    frame: usize,
}

/// The `TLB` struct is a simple virtualization of the translation look aside buffer commonly found
/// in CPUs: a handful of slots mapping a logical page number to the physical frame holding it.
///
/// Slots are replaced in least-recently-recorded order using an `AgeList` independent of the frame
/// table's. Nothing here checks frame residency; keeping entries in step with the frame table is
/// the translator's business (see `TlbPolicy`).
#[derive(Debug)]
pub struct TLB {
    slots: Vec<Option<Entry>>,
    ages: AgeList,
}

impl TLB {
    /// Create and return a new `TLB` instance with `capacity` empty slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn build(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            ages: AgeList::seeded(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Search the buffer for the requested page. A `None` value implies a TLB miss. Lookups do not
    /// affect replacement order.
    pub fn lookup(&self, page: usize) -> Option<usize> {
        self.slots
            .iter()
            .flatten()
            .find(|entry| entry.page == page)
            .map(|entry| entry.frame)
    }

    /// Cache a page to frame mapping in the least recently used slot, replacing whatever it held,
    /// and make that slot the most recently used.
    pub fn record(&mut self, page: usize, frame: usize) {
        let slot = self.ages.least_recent();
        if let Some(old) = self.slots[slot].replace(Entry { page, frame }) {
            log::trace!("tlb slot {slot}: replacing page {} with page {page}", old.page);
        }
        self.ages.touch(slot);
    }

    /// Ensure no mapping for `page` remains in the buffer. The emptied slot becomes the next one
    /// to be replaced. Returns whether a mapping was removed.
    pub fn invalidate(&mut self, page: usize) -> bool {
        let found = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Some(entry) if entry.page == page));
        match found {
            Some(slot) => {
                self.slots[slot] = None;
                self.ages.demote(slot);
                true
            }
            None => false,
        }
    }
}
