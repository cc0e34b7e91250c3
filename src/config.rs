use crate::address::{AddressCodec, PAGE_BITS};
use crate::error::{Error, Result};
use crate::translator::TlbPolicy;
use clap::Parser;
use log::LevelFilter;

/// Upper bound on the frame size; larger offsets would no longer leave room for the page field
/// in the low half of a logical address.
pub const MAX_FRAME_SIZE: usize = 1 << 16;

/// `Geometry` gathers the four numbers that fully determine the memory layout of a simulation:
/// the size of a frame in bytes, the number of physical frames, the number of logical pages and
/// the capacity of the TLB. Instances can only be obtained through `Geometry::new`, so holding one
/// means the values were validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    frame_size: usize,
    max_frame: usize,
    max_page: usize,
    tlb_size: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            frame_size: 256,
            max_frame: 128,
            max_page: 256,
            tlb_size: 16,
        }
    }
}

impl Geometry {
    /// Validate and build a new geometry.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGeometry` if any value is zero, if `frame_size` is not a power of
    /// two no larger than `MAX_FRAME_SIZE`, if `max_page` exceeds what the page field of a
    /// logical address can express, or if there are more frames than pages to bind them to.
    pub fn new(frame_size: usize, max_frame: usize, max_page: usize, tlb_size: usize) -> Result<Self> {
        if frame_size == 0 || !frame_size.is_power_of_two() || frame_size > MAX_FRAME_SIZE {
            return Err(Error::InvalidGeometry(format!(
                "'size_frame' must be a non-zero power of 2 no larger than {MAX_FRAME_SIZE}, got {frame_size}"
            )));
        }
        if max_frame == 0 {
            return Err(Error::InvalidGeometry("'size_table' must be non-zero".into()));
        }
        if max_page == 0 || max_page > 1 << PAGE_BITS {
            return Err(Error::InvalidGeometry(format!(
                "'size_pages' must be between 1 and {}, got {max_page}",
                1 << PAGE_BITS
            )));
        }
        if tlb_size == 0 {
            return Err(Error::InvalidGeometry("'size_tlb' must be non-zero".into()));
        }
        if max_frame > max_page {
            return Err(Error::InvalidGeometry(format!(
                "'size_table' ({max_frame}) must not exceed 'size_pages' ({max_page})"
            )));
        }

        Ok(Self {
            frame_size,
            max_frame,
            max_page,
            tlb_size,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn max_frame(&self) -> usize {
        self.max_frame
    }

    pub fn max_page(&self) -> usize {
        self.max_page
    }

    pub fn tlb_size(&self) -> usize {
        self.tlb_size
    }

    /// Total number of bytes in the physical frame pool.
    pub fn pool_bytes(&self) -> usize {
        self.frame_size * self.max_frame
    }

    /// The address codec matching this layout: the offset field is exactly wide enough to index a
    /// frame.
    pub fn codec(&self) -> AddressCodec {
        AddressCodec::new(self.frame_size.trailing_zeros(), PAGE_BITS)
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, env = "SIM_FILE_STORAGE", default_value = "BACKING_STORE.bin")]
    pub file_storage: String,

    #[arg(long, env = "SIM_FILE_VALIDATION", default_value = "correct.txt")]
    pub file_validation: String,

    #[arg(long, env = "SIM_FILE_ADDRESS", default_value = "addresses.txt")]
    pub file_address: String,

    /// Number of physical frames.
    #[arg(long, env = "SIM_SIZE_TABLE", default_value_t = 128)]
    pub size_table: usize,

    /// Number of logical pages.
    #[arg(long, env = "SIM_SIZE_PAGES", default_value_t = 256)]
    pub size_pages: usize,

    #[arg(long, env = "SIM_SIZE_TLB", default_value_t = 16)]
    pub size_tlb: usize,

    #[arg(long, env = "SIM_SIZE_FRAME", default_value_t = 256)]
    pub size_frame: usize,

    /// Keep TLB entries for evicted pages instead of flushing them.
    #[arg(long)]
    pub stale_tlb: bool,

    /// Replay at most this many addresses.
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, default_value = "warn", value_parser = parse_level)]
    pub log_level: LevelFilter,

    /// Hide the progress bar.
    #[arg(long, short)]
    pub quiet: bool,
}

impl Config {
    /// Validate the sizing values and return them as a `Geometry`.
    pub fn geometry(&self) -> Result<Geometry> {
        Geometry::new(
            self.size_frame,
            self.size_table,
            self.size_pages,
            self.size_tlb,
        )
    }

    pub fn policy(&self) -> TlbPolicy {
        match self.stale_tlb {
            true => TlbPolicy::PreserveStale,
            false => TlbPolicy::InvalidateOnEvict,
        }
    }

    pub fn display(&self) {
        println!("simulation configuration values: ");
        println!("{:#?}", self);
    }
}

fn parse_level(value: &str) -> std::result::Result<LevelFilter, String> {
    value
        .parse()
        .map_err(|_| format!("unknown log level '{value}'"))
}
