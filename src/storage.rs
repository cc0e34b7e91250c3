use crate::error::Result;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// The `BackingStore` trait describes the one capability the translator needs from wherever page
/// contents live: fill a frame-sized buffer with the bytes of a given page. Conceptually, this can
/// be anything along the lines of actual file data, swap space, or program instructions that have
/// yet to be paged in.
///
/// Page `p` occupies bytes `[p * len, (p + 1) * len)` of the underlying resource, where `len` is
/// the length of the buffer passed in.
pub trait BackingStore {
    /// Read the page at `page_index` into `buffer`.
    ///
    /// # Errors
    ///
    /// Implementations must fail rather than short-read when the page lies (even partially)
    /// outside the bounds of the resource.
    fn read_page(&mut self, page_index: usize, buffer: &mut [u8]) -> io::Result<()>;
}

impl<S: BackingStore + ?Sized> BackingStore for &mut S {
    fn read_page(&mut self, page_index: usize, buffer: &mut [u8]) -> io::Result<()> {
        (**self).read_page(page_index, buffer)
    }
}

impl<S: BackingStore + ?Sized> BackingStore for Box<S> {
    fn read_page(&mut self, page_index: usize, buffer: &mut [u8]) -> io::Result<()> {
        (**self).read_page(page_index, buffer)
    }
}

/// The `FileStorage` struct is a simple utility wrapper around the Rust standard library's
/// `BufReader` API. Instances of the structure are used to perform random reads on a backing store
/// binary file.
pub struct FileStorage {
    reader: BufReader<File>,
    size_bytes: u64,
}

impl FileStorage {
    /// Open the backing store file at the provided path.
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist or its metadata cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let size_bytes = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            size_bytes,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

impl BackingStore for FileStorage {
    /// Seeks to `page_index * buffer.len()` and reads exactly `buffer.len()` bytes. Reading past
    /// the end of the file surfaces as `io::ErrorKind::UnexpectedEof`.
    fn read_page(&mut self, page_index: usize, buffer: &mut [u8]) -> io::Result<()> {
        let start = (buffer.len() as u64)
            .checked_mul(page_index as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "page offset overflow"))?;
        self.reader.seek(SeekFrom::Start(start))?;
        self.reader.read_exact(buffer)
    }
}

/// An in-memory backing store holding the full page image as one owned blob.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage(Vec<u8>);

impl MemoryStorage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for MemoryStorage {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl BackingStore for MemoryStorage {
    fn read_page(&mut self, page_index: usize, buffer: &mut [u8]) -> io::Result<()> {
        let range = page_index
            .checked_mul(buffer.len())
            .and_then(|start| Some(start..start.checked_add(buffer.len())?))
            .filter(|range| range.end <= self.0.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("page {page_index} lies outside the backing store"),
                )
            })?;
        buffer.copy_from_slice(&self.0[range]);
        Ok(())
    }
}
