pub mod address;
pub mod age;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod table;
pub mod tlb;
pub mod tracker;
pub mod translator;
pub mod validator;

pub use address::{AddressCodec, AddressParts, LogicalAddress};
pub use config::{Config, Geometry};
pub use error::{Error, Result};
pub use storage::{BackingStore, FileStorage, MemoryStorage};
pub use tracker::Tracker;
pub use translator::{AccessResult, PhysicalLocation, TlbPolicy, Translator};

use address::AddressReader;
use indicatif::{ProgressBar, ProgressStyle};
use validator::ValidationReader;

/// A structure which contains the core elements required to run a simulation: a translator and
/// paired streams of logical addresses and the results expected for them.
pub struct Simulation<S, A, V> {
    translator: Translator<S>,
    addresses: A,
    expected: V,
}

impl<S, A, V> Simulation<S, A, V>
where
    S: BackingStore,
    A: Iterator<Item = Result<LogicalAddress>>,
    V: Iterator<Item = Result<AccessResult>>,
{
    pub fn build(translator: Translator<S>, addresses: A, expected: V) -> Self {
        Self {
            translator,
            addresses,
            expected,
        }
    }

    /// Replay at most `limit` addresses, comparing every access against its expected result.
    /// Returns the translator's statistics with the number of correct accesses filled in.
    ///
    /// The progress bar is cleared when the run ends, whether or not it succeeded.
    ///
    /// # Errors
    ///
    /// Stops at the first unreadable input line or failed translation.
    pub fn run(mut self, limit: Option<usize>, progress: &ProgressBar) -> Result<Tracker> {
        let replayed = self.replay(limit, progress);
        progress.finish_and_clear();

        let mut stats = *self.translator.tracker();
        stats.correct_memory_accesses = replayed?;
        Ok(stats)
    }

    fn replay(&mut self, limit: Option<usize>, progress: &ProgressBar) -> Result<usize> {
        let Simulation {
            translator,
            addresses,
            expected,
        } = self;

        let mut correct = 0;
        for (address, expected) in addresses.zip(expected).take(limit.unwrap_or(usize::MAX)) {
            let (address, expected) = (address?, expected?);
            let access_result = translator.access(address)?;

            match translator.calc_relative_address(address) {
                Ok(relative) if relative == access_result.physical_address => {}
                Ok(relative) => log::warn!(
                    "{address}: translated to {} but the page table maps it to {relative}",
                    access_result.physical_address
                ),
                Err(err) => log::warn!("{address}: {err} after translation"),
            }

            match access_result == expected {
                true => correct += 1,
                false => log::warn!("expected: {:?} received: {:?}", expected, access_result),
            }
            progress.inc(1);
        }
        Ok(correct)
    }
}

fn progress_bar(len: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(len).with_style(style)
}

/// Build a simulation from the files named in `config`, run it and return its statistics.
///
/// # Errors
///
/// Fails on invalid sizing, on files that cannot be opened or parsed, and on failed translations.
pub fn run_simulation(config: &Config) -> Result<Tracker> {
    let geometry = config.geometry()?;
    let storage = FileStorage::open(&config.file_storage)?;
    log::info!(
        "backing store '{}': {} bytes, {} pages of {} bytes",
        config.file_storage,
        storage.size_bytes(),
        storage.size_bytes() / geometry.frame_size() as u64,
        geometry.frame_size()
    );
    log::info!(
        "physical memory: {} frames, {} bytes",
        geometry.max_frame(),
        geometry.pool_bytes()
    );

    let total = AddressReader::open(&config.file_address)?.count();
    let total = config.limit.map_or(total, |limit| total.min(limit));
    let progress = progress_bar(total as u64, config.quiet);

    let simulation = Simulation::build(
        Translator::build(geometry, storage, config.policy()),
        AddressReader::open(&config.file_address)?,
        ValidationReader::open(&config.file_validation)?,
    );
    log::info!("replaying {total} addresses with {:?}", config.policy());
    simulation.run(config.limit, &progress)
}
