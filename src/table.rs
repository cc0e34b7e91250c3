use crate::age::AgeList;
use crate::config::Geometry;
use crate::error::{Error, Result};
use crate::storage::BackingStore;

/// The `Frame` struct contains a buffer with a length defined as the frame size in bytes. It is
/// intended to be the simplest element of the `FrameTable` and represents memory that can be
/// swapped in and out via demand paging. The bound page is kept to minimize the effort required to
/// invalidate the corresponding page table entry when a frame is victimized (paged-out).
#[derive(Debug)]
pub struct Frame {
    buffer: Vec<u8>,
    page: Option<usize>,
}

impl Frame {
    fn new(frame_size: usize) -> Self {
        Self {
            buffer: vec![0u8; frame_size],
            page: None,
        }
    }

    pub fn page(&self) -> Option<usize> {
        self.page
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }
}

/// Outcome of a successful `FrameTable::resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub frame: usize,
    pub faulted: bool,
}

/// The `FrameTable` struct simulates physical memory: a finite pool of frames serving a larger
/// logical page space. It owns the frames, the page-to-frame map and the least-recently-used
/// ordering used to pick a victim when a page has to be brought in.
///
/// Residency is granted only by a page fault and revoked only when the frame holding the page is
/// victimized, so the page-to-frame map and the frames' bound pages always describe the same
/// partial bijection.
#[derive(Debug)]
pub struct FrameTable {
    frame_size: usize,
    entries: Vec<Frame>,
    pages: Vec<Option<usize>>,
    victimizer: AgeList,
}

impl FrameTable {
    /// Allocate every frame of the pool up front, all of them free.
    pub fn build(geometry: &Geometry) -> Self {
        Self {
            frame_size: geometry.frame_size(),
            entries: (0..geometry.max_frame())
                .map(|_| Frame::new(geometry.frame_size()))
                .collect(),
            pages: vec![None; geometry.max_page()],
            victimizer: AgeList::seeded(geometry.max_frame()),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the frame holding `page`, paging it in from `store` if it is not resident.
    ///
    /// On a hit the frame is promoted to most recently used and no I/O occurs. On a fault the least
    /// recently used frame is victimized: its previous page (if any) loses residency and is
    /// reported through `on_evict`, then the requested page is read into it.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfRangeAddress` if `page` is outside the configured page space, before
    /// any frame is touched.
    ///
    /// Returns `Error::BackingStore` if the page could not be read. The victim frame is then left
    /// unbound and remains the next victim, so a retry performs a clean fault.
    pub fn resolve<S, F>(&mut self, page: usize, store: &mut S, mut on_evict: F) -> Result<Resolution>
    where
        S: BackingStore + ?Sized,
        F: FnMut(usize),
    {
        let max_page = self.pages.len();
        let resident = *self
            .pages
            .get(page)
            .ok_or(Error::OutOfRangeAddress { page, max_page })?;

        if let Some(frame) = resident {
            self.victimizer.touch(frame);
            log::trace!("page {page} resident in frame {frame}");
            return Ok(Resolution {
                frame,
                faulted: false,
            });
        }

        let frame = self.victimizer.least_recent();
        if let Some(evicted) = self.entries[frame].page.take() {
            self.pages[evicted] = None;
            log::debug!("evicting page {evicted} from frame {frame}");
            on_evict(evicted);
        }

        store
            .read_page(page, &mut self.entries[frame].buffer)
            .map_err(|source| Error::BackingStore { page, source })?;

        self.entries[frame].page = Some(page);
        self.pages[page] = Some(frame);
        self.victimizer.touch(frame);
        log::debug!("page fault: loaded page {page} into frame {frame}");
        Ok(Resolution {
            frame,
            faulted: true,
        })
    }

    /// The bytes of a frame.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not a valid frame index.
    pub fn physical_base(&self, frame: usize) -> &[u8] {
        self.entries[frame].bytes()
    }

    pub fn is_resident(&self, page: usize) -> bool {
        self.frame_of(page).is_some()
    }

    pub fn frame_of(&self, page: usize) -> Option<usize> {
        self.pages.get(page).copied().flatten()
    }

    pub fn page_of(&self, frame: usize) -> Option<usize> {
        self.entries.get(frame).and_then(Frame::page)
    }

    /// The frame a fault would victimize next.
    #[cfg(test)]
    pub(crate) fn next_victim(&self) -> usize {
        self.victimizer.least_recent()
    }
}
