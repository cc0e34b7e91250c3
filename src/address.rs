use crate::error::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Width of the page-number field in a logical address. The offset field below it is sized by the
/// configured frame size.
pub const PAGE_BITS: u32 = 8;

/// `LogicalAddress` is the process-facing (virtual) address handed to the translator. It is a plain
/// 32-bit value; splitting it into components is the job of an `AddressCodec`, since the width of
/// the offset field depends on the configured frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalAddress(u32);

impl LogicalAddress {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for LogicalAddress {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<LogicalAddress> for u32 {
    fn from(value: LogicalAddress) -> Self {
        value.0
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The components of a logical address. `extra` holds every bit above the page field so that no
/// information is lost by decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressParts {
    pub page: u32,
    pub offset: u32,
    pub extra: u32,
}

impl AddressParts {
    pub const fn new(page: u32, offset: u32) -> Self {
        Self {
            page,
            offset,
            extra: 0,
        }
    }
}

/// `AddressCodec` performs the pure bit manipulation between raw logical addresses and their
/// (page, offset) components. The reference layout uses an 8-bit offset in bits 0-8 and an 8-bit
/// page number in bits 8-16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressCodec {
    offset_bits: u32,
    page_bits: u32,
}

impl Default for AddressCodec {
    fn default() -> Self {
        Self::new(8, PAGE_BITS)
    }
}

impl AddressCodec {
    /// Create a codec for the provided field widths.
    ///
    /// # Panics
    ///
    /// Panics if the two fields together are wider than a 32-bit address.
    pub const fn new(offset_bits: u32, page_bits: u32) -> Self {
        assert!(offset_bits + page_bits <= u32::BITS);
        Self {
            offset_bits,
            page_bits,
        }
    }

    pub const fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    pub const fn page_bits(&self) -> u32 {
        self.page_bits
    }

    /// Split a logical address into its components. This never fails: every 32-bit value is a
    /// well-formed address, though its page may still lie outside a smaller configured space.
    ///
    /// # Examples
    ///
    /// ```
    /// use virtual_memory_sim::address::{AddressCodec, LogicalAddress};
    /// let parts = AddressCodec::default().decompose(LogicalAddress::from(0x00000f0f));
    /// assert_eq!(parts.page, 15);
    /// assert_eq!(parts.offset, 15);
    /// ```
    pub fn decompose(&self, address: LogicalAddress) -> AddressParts {
        let raw = address.raw();
        AddressParts {
            offset: raw & mask(self.offset_bits),
            page: raw.checked_shr(self.offset_bits).unwrap_or(0) & mask(self.page_bits),
            extra: raw
                .checked_shr(self.offset_bits + self.page_bits)
                .unwrap_or(0),
        }
    }

    /// Inverse of `decompose`. Components wider than their field are truncated to it.
    pub fn compose(&self, parts: AddressParts) -> LogicalAddress {
        let offset = parts.offset & mask(self.offset_bits);
        let page = (parts.page & mask(self.page_bits))
            .checked_shl(self.offset_bits)
            .unwrap_or(0);
        let extra = parts
            .extra
            .checked_shl(self.offset_bits + self.page_bits)
            .unwrap_or(0);
        LogicalAddress(extra | page | offset)
    }
}

const fn mask(bits: u32) -> u32 {
    if bits >= u32::BITS {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

/// `AddressReader` is a utility type responsible for sequentially obtaining raw address numbers
/// from a text source. Each non-blank line must contain exactly one decimal address.
pub struct AddressReader<R = BufReader<File>> {
    reader: R,
    pub line_number: u64,
}

impl AddressReader {
    /// Open the address file at the provided path.
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist or cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> AddressReader<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for AddressReader<R> {
    type Item = Result<LogicalAddress>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = String::new();
        loop {
            buffer.clear();
            match self.reader.read_line(&mut buffer) {
                Err(err) => return Some(Err(err.into())),
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    let line = buffer.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return Some(line.parse::<u32>().map(LogicalAddress::from).map_err(|e| {
                        Error::Parse {
                            line: self.line_number,
                            reason: format!("expected an unsigned address, found {line:?}: {e}"),
                        }
                    }));
                }
            }
        }
    }
}
