//! Console logging
//!
//! Backend for the `log` facade writing level-coloured lines through the
//! global console. Installing it before console bring-up is fine: the
//! first message promotes the failsafe device via the console's lazy
//! setup path.

use core::fmt::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::console::ConsoleWriter;

/// Logger writing `[LEVEL] target: message` lines to the console.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let level_str = match record.level() {
                Level::Error => "\x1b[31mERROR\x1b[0m",
                Level::Warn => "\x1b[33m WARN\x1b[0m",
                Level::Info => "\x1b[32m INFO\x1b[0m",
                Level::Debug => "\x1b[34mDEBUG\x1b[0m",
                Level::Trace => "\x1b[35mTRACE\x1b[0m",
            };
            let _ = writeln!(
                ConsoleWriter,
                "{} {}: {}",
                level_str,
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Global logger instance.
static LOGGER: ConsoleLogger = ConsoleLogger;

/// Initialise logging at the given maximum level.
///
/// Safe to call more than once; only the first installation takes effect.
pub fn init(max_level: LevelFilter) {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(max_level))
        .ok();
}
