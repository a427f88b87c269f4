use colored::Colorize;
use log::{Level, LevelFilter, Metadata, Record};

/// Prints `LEVEL message` lines; errors and warnings go to stderr.
pub struct MinimalLogger;

static MINIMAL_LOGGER: MinimalLogger = MinimalLogger;

impl MinimalLogger {
    /// Install as the global logger. Repeated calls only adjust the level.
    pub fn init(max_level: LevelFilter) {
        let _ = log::set_logger(&MINIMAL_LOGGER);
        log::set_max_level(max_level);
    }
}

impl log::Log for MinimalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_string = match record.level() {
            Level::Error => record.level().to_string().red(),
            Level::Warn => record.level().to_string().yellow(),
            Level::Info => record.level().to_string().cyan(),
            Level::Debug => record.level().to_string().purple(),
            Level::Trace => record.level().to_string().normal(),
        };

        if record.level() > LevelFilter::Warn {
            println!("{:<5} {}", level_string, record.args())
        } else {
            eprintln!("{:<5} {}", level_string, record.args())
        }
    }

    fn flush(&self) {}
}
