use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

/// Minimal `log` backend writing `[LEVEL target] message` lines to stderr, so that diagnostics
/// never interleave with the report printed on stdout.
pub struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let mut stderr = std::io::stderr().lock();
            // a closed stderr leaves nowhere to report the failure
            let _ = writeln!(
                stderr,
                "[{level:<5} {target}] {args}",
                level = record.level(),
                target = record.target(),
                args = record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the stderr logger with the given maximum level.
///
/// # Errors
///
/// Fails if another logger was already installed.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
