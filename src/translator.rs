use crate::address::{AddressCodec, LogicalAddress};
use crate::config::Geometry;
use crate::error::{Error, Result};
use crate::storage::BackingStore;
use crate::table::FrameTable;
use crate::tlb::TLB;
use crate::tracker::Tracker;

/// What happens to a TLB entry whose page has just been evicted from physical memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlbPolicy {
    /// Flush the entry as part of the eviction. Every TLB hit then names the frame that really
    /// holds the page.
    #[default]
    InvalidateOnEvict,
    /// Leave the entry in place. A later hit on it returns the frame the page used to occupy, even
    /// if that frame now holds another page.
    PreserveStale,
}

/// A resolved location in the simulated physical memory, expressed as a frame index and a byte
/// offset into that frame rather than as a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalLocation {
    pub frame: usize,
    pub offset: usize,
}

impl PhysicalLocation {
    /// Flat address of this location within a pool of `frame_size`-byte frames.
    pub fn relative(&self, frame_size: usize) -> u64 {
        (self.frame * frame_size + self.offset) as u64
    }
}

/// The `AccessResult` encodes the result of an attempted memory access for later use in tracking
/// the accuracy across the simulation. Properties include the virtual address provided to an
/// operation, the corresponding physical address, and the value read from that address.
#[derive(Debug, Clone, Copy)]
pub struct AccessResult {
    pub virtual_address: LogicalAddress,
    pub physical_address: u64,
    pub value: i8,
}

/// Physical addresses depend on the frame pool size and victimization history, so two results
/// are considered equal when they agree on the address asked for and the value found there.
impl PartialEq for AccessResult {
    fn eq(&self, other: &Self) -> bool {
        self.virtual_address == other.virtual_address && self.value == other.value
    }
}

/// The `Translator` struct is the culmination of all other structures in this crate. It resolves
/// logical addresses to physical locations by consulting the TLB first and falling back to the
/// frame table, which pages data in from the backing store on demand. Statistics are recorded
/// along the way.
///
/// The translator exclusively owns its frame table, TLB and counters. The backing store is owned
/// too, but since `BackingStore` is implemented for `&mut S` a caller can lend one instead.
pub struct Translator<S> {
    geometry: Geometry,
    codec: AddressCodec,
    tlb: TLB,
    frames: FrameTable,
    storage: S,
    policy: TlbPolicy,
    tracker: Tracker,
}

impl<S: BackingStore> Translator<S> {
    pub fn build(geometry: Geometry, storage: S, policy: TlbPolicy) -> Self {
        Self {
            geometry,
            codec: geometry.codec(),
            tlb: TLB::build(geometry.tlb_size()),
            frames: FrameTable::build(&geometry),
            storage,
            policy,
            tracker: Tracker::new(),
        }
    }

    /// Resolve a logical address to its physical location, paging the data in if needed.
    ///
    /// # Errors
    ///
    /// * `Error::OutOfRangeAddress` if the page number is not below the configured page count.
    /// * `Error::BackingStore` if a page fault could not read the page. Nothing is left bound to
    ///   the failed page, so translating the address again retries the fault from scratch.
    pub fn translate(&mut self, address: LogicalAddress) -> Result<PhysicalLocation> {
        self.tracker.attempted_memory_accesses += 1;
        let (page, offset) = self.split(address)?;

        if let Some(frame) = self.tlb.lookup(page) {
            self.tracker.tlb_hits += 1;
            log::trace!("tlb hit: page {page} -> frame {frame}");
            return Ok(PhysicalLocation { frame, offset });
        }

        let policy = self.policy;
        let tlb = &mut self.tlb;
        let flushes = &mut self.tracker.tlb_flushes;
        let resolution = self.frames.resolve(page, &mut self.storage, |evicted| {
            if policy == TlbPolicy::InvalidateOnEvict && tlb.invalidate(evicted) {
                *flushes += 1;
            }
        })?;

        match resolution.faulted {
            true => self.tracker.page_faults += 1,
            false => self.tracker.page_hits += 1,
        }
        self.tlb.record(page, resolution.frame);

        Ok(PhysicalLocation {
            frame: resolution.frame,
            offset,
        })
    }

    /// The byte stored at a physical location.
    ///
    /// # Panics
    ///
    /// Panics if the location lies outside the frame pool.
    pub fn read(&self, location: PhysicalLocation) -> u8 {
        self.frames.physical_base(location.frame)[location.offset]
    }

    /// Translate an address and read the byte it refers to.
    pub fn access(&mut self, address: LogicalAddress) -> Result<AccessResult> {
        let location = self.translate(address)?;
        Ok(AccessResult {
            virtual_address: address,
            physical_address: location.relative(self.geometry.frame_size()),
            value: self.read(location) as i8,
        })
    }

    /// Flat physical address of a logical address whose page is already resident. This is a pure
    /// query: it neither consults the TLB nor touches the frame table, and never pages anything in.
    ///
    /// # Errors
    ///
    /// * `Error::NotResident` if the page is not currently loaded; call `translate` first.
    /// * `Error::OutOfRangeAddress` if the page number is not below the configured page count.
    pub fn calc_relative_address(&self, address: LogicalAddress) -> Result<u64> {
        let (page, offset) = self.split(address)?;
        let frame = self
            .frames
            .frame_of(page)
            .ok_or(Error::NotResident { page })?;
        Ok(PhysicalLocation { frame, offset }.relative(self.geometry.frame_size()))
    }

    fn split(&self, address: LogicalAddress) -> Result<(usize, usize)> {
        let parts = self.codec.decompose(address);
        let page = parts.page as usize;
        if page >= self.geometry.max_page() {
            return Err(Error::OutOfRangeAddress {
                page,
                max_page: self.geometry.max_page(),
            });
        }
        Ok((page, parts.offset as usize))
    }
}

impl<S> Translator<S> {
    pub fn request_count(&self) -> usize {
        self.tracker.attempted_memory_accesses
    }

    pub fn page_fault_count(&self) -> usize {
        self.tracker.page_faults
    }

    pub fn tlb_hit_count(&self) -> usize {
        self.tracker.tlb_hits
    }

    pub fn tlb_flush_count(&self) -> usize {
        self.tracker.tlb_flushes
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn policy(&self) -> TlbPolicy {
        self.policy
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn tlb(&self) -> &TLB {
        &self.tlb
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::address::AddressParts;
    use crate::storage::MemoryStorage;
    use proptest::prelude::*;

    /// A store where every byte of page `p` holds `p`, except byte `o` of each page which holds
    /// `p + o` so that offsets are observable too.
    fn patterned_store(geometry: &Geometry, pages: usize) -> MemoryStorage {
        let frame_size = geometry.frame_size();
        MemoryStorage::new(
            (0..pages * frame_size)
                .map(|i| ((i / frame_size) + (i % frame_size)) as u8)
                .collect(),
        )
    }

    fn address(geometry: &Geometry, page: u32, offset: u32) -> LogicalAddress {
        geometry.codec().compose(AddressParts::new(page, offset))
    }

    fn scenario_translator(policy: TlbPolicy) -> Translator<MemoryStorage> {
        let geometry = Geometry::new(256, 2, 4, 1).unwrap();
        let store = patterned_store(&geometry, 4);
        Translator::build(geometry, store, policy)
    }

    #[cfg(test)]
    mod translate_tests {

        use super::*;

        #[test]
        fn four_call_scenario() {
            let mut translator = scenario_translator(TlbPolicy::default());
            let geometry = *translator.geometry();

            let first = translator.translate(address(&geometry, 0, 0)).unwrap();
            assert_eq!(first.frame, 0);
            let second = translator.translate(address(&geometry, 1, 0)).unwrap();
            assert_eq!(second.frame, 1);

            // page 0's frame is the stalest and gets reused
            let third = translator.translate(address(&geometry, 2, 0)).unwrap();
            assert_eq!(third.frame, 0);
            assert!(!translator.frames().is_resident(0));
            assert!(translator.frames().is_resident(1));
            assert!(translator.frames().is_resident(2));

            translator.translate(address(&geometry, 0, 0)).unwrap();
            assert_eq!(translator.page_fault_count(), 4);
            assert_eq!(translator.tlb_hit_count(), 0);
            assert_eq!(translator.request_count(), 4);
        }

        #[test]
        fn repeated_translation_is_idempotent() {
            let geometry = Geometry::new(256, 2, 4, 2).unwrap();
            let store = patterned_store(&geometry, 4);
            let mut translator = Translator::build(geometry, store, TlbPolicy::default());
            let target = address(&geometry, 3, 17);

            let first = translator.translate(target).unwrap();
            let before = *translator.tracker();
            let second = translator.translate(target).unwrap();
            let after = *translator.tracker();

            assert_eq!(first, second);
            assert_eq!(after.attempted_memory_accesses, before.attempted_memory_accesses + 1);
            assert_eq!(after.page_faults, before.page_faults);
            assert_eq!(after.tlb_hits, before.tlb_hits + 1);
            assert_eq!(after.tlb_flushes, before.tlb_flushes);
        }

        #[test]
        fn resident_page_missing_from_tlb() {
            let mut translator = scenario_translator(TlbPolicy::default());
            let geometry = *translator.geometry();
            translator.translate(address(&geometry, 0, 0)).unwrap();
            // capacity 1: recording page 1 pushes page 0 out of the TLB
            translator.translate(address(&geometry, 1, 0)).unwrap();
            translator.translate(address(&geometry, 0, 9)).unwrap();

            assert_eq!(translator.page_fault_count(), 2);
            assert_eq!(translator.tracker().page_hits, 1);
            assert_eq!(translator.tlb_hit_count(), 0);
        }

        #[test]
        fn read_returns_backing_bytes() {
            let mut translator = scenario_translator(TlbPolicy::default());
            let geometry = *translator.geometry();
            let location = translator.translate(address(&geometry, 2, 5)).unwrap();
            assert_eq!(translator.read(location), 7);

            let result = translator.access(address(&geometry, 3, 1)).unwrap();
            assert_eq!(result.value, 4);
            assert_eq!(result.physical_address, 256 + 1);
        }

        #[test]
        fn out_of_range_page() {
            let mut translator = scenario_translator(TlbPolicy::default());
            let geometry = *translator.geometry();
            let err = translator.translate(address(&geometry, 4, 0)).unwrap_err();
            assert!(matches!(
                err,
                Error::OutOfRangeAddress {
                    page: 4,
                    max_page: 4
                }
            ));
            assert_eq!(translator.request_count(), 1);
            assert_eq!(translator.page_fault_count(), 0);
        }

        #[test]
        fn backing_store_failure_is_retryable() {
            let geometry = Geometry::new(256, 2, 4, 1).unwrap();
            let store = patterned_store(&geometry, 2);
            let mut translator = Translator::build(geometry, store, TlbPolicy::default());

            let err = translator.translate(address(&geometry, 3, 0)).unwrap_err();
            assert!(matches!(err, Error::BackingStore { page: 3, .. }));
            assert!(!translator.frames().is_resident(3));
            assert_eq!(translator.tlb().lookup(3), None);
            assert_eq!(translator.page_fault_count(), 0);

            let err = translator.translate(address(&geometry, 3, 0)).unwrap_err();
            assert!(matches!(err, Error::BackingStore { .. }));
            assert!(translator.translate(address(&geometry, 1, 0)).is_ok());
            assert_eq!(translator.page_fault_count(), 1);
        }

        #[test]
        fn borrowed_storage() {
            let geometry = Geometry::new(256, 2, 4, 1).unwrap();
            let mut store = patterned_store(&geometry, 4);
            {
                let mut translator =
                    Translator::build(geometry, &mut store, TlbPolicy::default());
                assert!(translator.translate(address(&geometry, 1, 0)).is_ok());
            }
            assert_eq!(store.len(), 1024);
        }
    }

    #[cfg(test)]
    mod tlb_policy_tests {

        use super::*;

        fn thrashing_translator(policy: TlbPolicy) -> Translator<MemoryStorage> {
            let geometry = Geometry::new(256, 1, 4, 2).unwrap();
            let store = patterned_store(&geometry, 4);
            Translator::build(geometry, store, policy)
        }

        #[test]
        fn invalidate_on_evict() {
            let mut translator = thrashing_translator(TlbPolicy::InvalidateOnEvict);
            let geometry = *translator.geometry();
            translator.translate(address(&geometry, 0, 0)).unwrap();
            translator.translate(address(&geometry, 1, 0)).unwrap();
            assert_eq!(translator.tlb_flush_count(), 1);
            assert_eq!(translator.tlb().lookup(0), None);

            // page 0 was evicted: the lookup misses and faults the page back in
            let result = translator.access(address(&geometry, 0, 3)).unwrap();
            assert_eq!(result.value, 3);
            assert_eq!(translator.tlb_hit_count(), 0);
            assert_eq!(translator.page_fault_count(), 3);
            assert_eq!(translator.tlb_flush_count(), 2);
        }

        #[test]
        fn preserve_stale() {
            let mut translator = thrashing_translator(TlbPolicy::PreserveStale);
            let geometry = *translator.geometry();
            translator.translate(address(&geometry, 0, 0)).unwrap();
            translator.translate(address(&geometry, 1, 0)).unwrap();
            assert_eq!(translator.tlb_flush_count(), 0);
            assert_eq!(translator.tlb().lookup(0), Some(0));

            // the stale entry hits and yields page 1's data from the rebound frame
            let result = translator.access(address(&geometry, 0, 3)).unwrap();
            assert_eq!(result.value, 1 + 3);
            assert_eq!(translator.tlb_hit_count(), 1);
            assert_eq!(translator.page_fault_count(), 2);
            assert!(!translator.frames().is_resident(0));
        }

        #[test]
        fn hits_without_eviction_pressure_match() {
            for policy in [TlbPolicy::InvalidateOnEvict, TlbPolicy::PreserveStale] {
                let geometry = Geometry::new(256, 4, 4, 2).unwrap();
                let store = patterned_store(&geometry, 4);
                let mut translator = Translator::build(geometry, store, policy);
                for _ in 0..3 {
                    translator.translate(address(&geometry, 2, 0)).unwrap();
                }
                assert_eq!(translator.tlb_hit_count(), 2);
                assert_eq!(translator.page_fault_count(), 1);
            }
        }
    }

    #[cfg(test)]
    mod calc_relative_address_tests {

        use super::*;

        #[test]
        fn requires_residency() {
            let translator = scenario_translator(TlbPolicy::default());
            let geometry = *translator.geometry();
            let err = translator
                .calc_relative_address(address(&geometry, 1, 4))
                .unwrap_err();
            assert!(matches!(err, Error::NotResident { page: 1 }));
            assert!(!translator.frames().is_resident(1));
            assert_eq!(translator.request_count(), 0);
        }

        #[test]
        fn resident() {
            let mut translator = scenario_translator(TlbPolicy::default());
            let geometry = *translator.geometry();
            translator.translate(address(&geometry, 3, 0)).unwrap();
            translator.translate(address(&geometry, 1, 0)).unwrap();

            assert_eq!(
                translator
                    .calc_relative_address(address(&geometry, 1, 4))
                    .unwrap(),
                256 + 4
            );
            assert_eq!(
                translator
                    .calc_relative_address(address(&geometry, 3, 255))
                    .unwrap(),
                255
            );
        }

        #[test]
        fn does_not_touch_lru() {
            let mut translator = scenario_translator(TlbPolicy::default());
            let geometry = *translator.geometry();
            translator.translate(address(&geometry, 0, 0)).unwrap();
            translator.translate(address(&geometry, 1, 0)).unwrap();
            translator
                .calc_relative_address(address(&geometry, 0, 0))
                .unwrap();
            assert_eq!(translator.frames().next_victim(), 0);
        }

        #[test]
        fn out_of_range() {
            let translator = scenario_translator(TlbPolicy::default());
            let geometry = *translator.geometry();
            assert!(matches!(
                translator.calc_relative_address(address(&geometry, 200, 0)),
                Err(Error::OutOfRangeAddress { .. })
            ));
        }
    }

    #[cfg(test)]
    mod property_tests {

        use super::*;

        proptest! {
            #[test]
            fn faults_counted_once_per_load(
                pages in proptest::collection::vec(0u32..8, 1..200),
            ) {
                let geometry = Geometry::new(16, 3, 8, 2).unwrap();
                let store = patterned_store(&geometry, 8);
                let mut translator = Translator::build(geometry, store, TlbPolicy::default());
                for page in pages {
                    let resident = translator.frames().is_resident(page as usize);
                    let faults = translator.page_fault_count();
                    translator.translate(address(&geometry, page, 0)).unwrap();
                    prop_assert_eq!(translator.page_fault_count(), faults + usize::from(!resident));
                }
            }

            #[test]
            fn tlb_hits_only_on_cached_pages(
                pages in proptest::collection::vec(0u32..8, 1..200),
            ) {
                let geometry = Geometry::new(16, 3, 8, 2).unwrap();
                let store = patterned_store(&geometry, 8);
                let mut translator = Translator::build(geometry, store, TlbPolicy::default());
                for page in pages {
                    let cached = translator.tlb().lookup(page as usize).is_some();
                    let hits = translator.tlb_hit_count();
                    translator.translate(address(&geometry, page, 0)).unwrap();
                    prop_assert_eq!(translator.tlb_hit_count(), hits + usize::from(cached));
                }
            }

            #[test]
            fn invalidating_translator_always_reads_correct_bytes(
                requests in proptest::collection::vec((0u32..8, 0u32..16), 1..200),
            ) {
                let geometry = Geometry::new(16, 3, 8, 2).unwrap();
                let store = patterned_store(&geometry, 8);
                let mut translator = Translator::build(geometry, store, TlbPolicy::InvalidateOnEvict);
                for (page, offset) in requests {
                    let target = address(&geometry, page, offset);
                    let result = translator.access(target).unwrap();
                    prop_assert_eq!(result.value, (page + offset) as i8);
                    prop_assert_eq!(
                        translator.calc_relative_address(target).unwrap(),
                        result.physical_address
                    );
                }
            }
        }
    }
}
