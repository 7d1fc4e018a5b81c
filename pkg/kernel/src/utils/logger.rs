use crate::drivers::serial::get_serial;
use core::fmt::Write;
use log::{Level, LevelFilter, Metadata, Record};

pub fn init(level: LevelFilter) {
    static LOGGER: Logger = Logger;
    // a second call keeps the first logger and only moves the level
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);

    info!("Logger Initialized ({})", level);
}

struct Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // records raised while the port is held are dropped
        let Some(mut serial) = get_serial() else {
            return;
        };

        let (symbol, level_name) = level_prefix(record.level());

        let _ = serial.write_fmt(format_args!(
            "{} \x1b[1m{}\x1b[0m - {}:{} - {}\n",
            symbol,
            level_name,
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        ));
    }

    fn flush(&self) {}
}

fn level_prefix(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::Error => ("\x1b[31m[X]\x1b[0m", "ERROR"),
        Level::Warn => ("\x1b[33m[!]\x1b[0m", "WARN"),
        Level::Info => ("\x1b[34m[+]\x1b[0m", "INFO"),
        Level::Debug => ("\x1b[36m[#]\x1b[0m", "DEBUG"),
        Level::Trace => ("\x1b[32m[%]\x1b[0m", "TRACE"),
    }
}
