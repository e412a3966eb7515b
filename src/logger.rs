//! A module to initialize and customize the logger object used for (most) stdout/stderr output.

use colored::{control::set_override, Colorize};
use log::{Level, LevelFilter, Metadata, Record};

#[derive(Default)]
struct SimpleLogger;

impl SimpleLogger {
    fn level_color(level: &Level) -> String {
        let name = format!("{:>5}", level.as_str().to_uppercase());
        match level {
            Level::Error => name.red().bold().to_string(),
            Level::Warn => name.yellow().bold().to_string(),
            Level::Info => name.green().bold().to_string(),
            Level::Debug => name.blue().bold().to_string(),
            Level::Trace => name.magenta().bold().to_string(),
        }
    }
}

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let stream = match record.level() {
                Level::Error | Level::Warn => {
                    eprintln!("[{}]: {}", Self::level_color(&record.level()), record.args());
                    return;
                }
                _ => (),
            };
            let _ = stream;
            println!("[{}]: {}", Self::level_color(&record.level()), record.args());
        }
    }

    fn flush(&self) {}
}

/// Initializes the process-wide logger.
///
/// The logging level defaults to [`LevelFilter::Info`]; callers raise it to
/// [`LevelFilter::Debug`] (via [`set_level`]) once `CTCACHE_DEBUG` has been read from
/// the environment, so that the logger itself stays free of environment lookups.
pub fn init() -> Result<(), log::SetLoggerError> {
    if std::env::var("CTCACHE_COLOR").is_ok_and(|v| ["on", "1", "true"].contains(&v.as_str())) {
        set_override(true);
    }
    log::set_boxed_logger(Box::new(SimpleLogger)).map(|()| log::set_max_level(LevelFilter::Info))
}

/// Raises (or lowers) the global log level after the logger has been initialized.
pub fn set_level(debug: bool) {
    log::set_max_level(if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
}

#[cfg(test)]
mod test {
    use super::{init, SimpleLogger};

    #[test]
    fn debug_log() {
        init().unwrap_or(());
        assert!(SimpleLogger::level_color(&log::Level::Debug).contains("DEBUG"));
        log::set_max_level(log::LevelFilter::Debug);
        log::debug!("a dummy log statement for coverage");
    }
}
